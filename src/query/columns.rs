//! Column list conversion.
//!
//! This module provides the `IntoColumns` trait which allows both a comma-separated
//! string and any sequence of names to be used as the projected column list.

use crate::error::QueryError;
use serde_json::Value;

/// Trait for types that can be converted to a projected column list.
///
/// # Example
///
/// ```rust
/// use genquery_rs::query::IntoColumns;
///
/// let from_str = "COLL_NAME, DATA_NAME".into_columns().unwrap();
/// let from_vec = vec!["COLL_NAME", "DATA_NAME"].into_columns().unwrap();
/// assert_eq!(from_str, from_vec);
/// ```
pub trait IntoColumns {
    /// Convert into a non-empty list of trimmed, non-blank column names.
    fn into_columns(self) -> Result<Vec<String>, QueryError>;
}

/// Trim every name and drop the blank ones, keeping input order.
pub fn normalize_columns<I, S>(names: I) -> Result<Vec<String>, QueryError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let columns: Vec<String> = names
        .into_iter()
        .map(|name| name.as_ref().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    if columns.is_empty() {
        return Err(QueryError::ColumnsType(
            "'columns' should name at least one column".to_string(),
        ));
    }

    Ok(columns)
}

/// Columns from a JSON value: either a comma-separated string or an array of strings.
pub(crate) fn columns_from_value(value: &Value) -> Result<Vec<String>, QueryError> {
    match value {
        Value::String(s) => s.as_str().into_columns(),
        Value::Array(items) => {
            let names = items
                .iter()
                .map(|item| {
                    item.as_str().ok_or_else(|| {
                        QueryError::ColumnsType(format!(
                            "'columns' could not be coerced to a list of names: {item}"
                        ))
                    })
                })
                .collect::<Result<Vec<&str>, QueryError>>()?;
            normalize_columns(names)
        }
        other => Err(QueryError::ColumnsType(format!(
            "'columns' should be a comma-separated string or sequence, got {other}"
        ))),
    }
}

impl IntoColumns for &str {
    fn into_columns(self) -> Result<Vec<String>, QueryError> {
        normalize_columns(self.split(','))
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Result<Vec<String>, QueryError> {
        self.as_str().into_columns()
    }
}

impl IntoColumns for &String {
    fn into_columns(self) -> Result<Vec<String>, QueryError> {
        self.as_str().into_columns()
    }
}

impl IntoColumns for Vec<String> {
    fn into_columns(self) -> Result<Vec<String>, QueryError> {
        normalize_columns(self)
    }
}

impl IntoColumns for Vec<&str> {
    fn into_columns(self) -> Result<Vec<String>, QueryError> {
        normalize_columns(self)
    }
}

impl IntoColumns for &[String] {
    fn into_columns(self) -> Result<Vec<String>, QueryError> {
        normalize_columns(self)
    }
}

impl IntoColumns for &[&str] {
    fn into_columns(self) -> Result<Vec<String>, QueryError> {
        normalize_columns(self.iter().copied())
    }
}

impl<const N: usize> IntoColumns for [&str; N] {
    fn into_columns(self) -> Result<Vec<String>, QueryError> {
        normalize_columns(self)
    }
}

impl<const N: usize> IntoColumns for &[&str; N] {
    fn into_columns(self) -> Result<Vec<String>, QueryError> {
        normalize_columns(self.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_string_is_split_and_trimmed() {
        let columns = " COLL_NAME ,DATA_NAME,  , DATA_SIZE".into_columns().unwrap();
        assert_eq!(columns, vec!["COLL_NAME", "DATA_NAME", "DATA_SIZE"]);
    }

    #[test]
    fn test_sequence_keeps_order() {
        let columns = vec!["DATA_SIZE", "DATA_NAME"].into_columns().unwrap();
        assert_eq!(columns, vec!["DATA_SIZE", "DATA_NAME"]);
    }

    #[test]
    fn test_array_input() {
        let columns = ["ORDER_DESC(DATA_NAME)", " DATA_OWNER_NAME"]
            .into_columns()
            .unwrap();
        assert_eq!(columns, vec!["ORDER_DESC(DATA_NAME)", "DATA_OWNER_NAME"]);
    }

    #[test]
    fn test_blank_input_is_rejected() {
        let err = " , ,".into_columns().unwrap_err();
        assert!(matches!(err, QueryError::ColumnsType(_)));

        let err = Vec::<String>::new().into_columns().unwrap_err();
        assert!(matches!(err, QueryError::ColumnsType(_)));
    }

    #[test]
    fn test_columns_from_json_value() {
        assert_eq!(
            columns_from_value(&json!("A, B")).unwrap(),
            vec!["A", "B"]
        );
        assert_eq!(
            columns_from_value(&json!(["A", " B "])).unwrap(),
            vec!["A", "B"]
        );
        assert!(matches!(
            columns_from_value(&json!(42)),
            Err(QueryError::ColumnsType(_))
        ));
        assert!(matches!(
            columns_from_value(&json!(["A", 1])),
            Err(QueryError::ColumnsType(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_normalization_preserves_order_and_drops_blanks(
            names in prop::collection::vec("[ ]{0,2}[A-Z_]{0,6}[ ]{0,2}", 1..8)
        ) {
            let expected: Vec<String> = names
                .iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect();

            let from_seq = names.clone().into_columns();
            let from_str = names.join(",").into_columns();

            if expected.is_empty() {
                prop_assert!(from_seq.is_err());
                prop_assert!(from_str.is_err());
            } else {
                prop_assert_eq!(from_seq.unwrap(), expected.clone());
                prop_assert_eq!(from_str.unwrap(), expected);
            }
        }
    }
}
