//! Field checking for parsed YAML elements.
//!
//! Every element of a part-library description (naming, parameters, table,
//! class, collection, base) is a mapping with a fixed set of mandatory and
//! optional keys. [`check_schema`] fails closed on anything else.
//!
//! # Examples
//!
//! ```
//! use bolts_core::{SchemaError, check_schema};
//!
//! let naming: serde_yaml::Mapping =
//!     serde_yaml::from_str("template: M%g\nsubstitute: [d]").unwrap();
//! assert!(check_schema(&naming, "naming", &["template"], &["substitute"]).is_ok());
//!
//! let bad: serde_yaml::Mapping = serde_yaml::from_str("template: M%g\nsubst: [d]").unwrap();
//! assert!(matches!(
//!     check_schema(&bad, "naming", &["template"], &["substitute"]),
//!     Err(SchemaError::UnknownField { .. })
//! ));
//! ```

use serde_yaml::{Mapping, Value as Yaml};

use crate::error::{ParsingError, SchemaError};

/// Checks that `map` has every `mandatory` key and nothing outside
/// `mandatory` and `optional`.
///
/// The first unknown key (in document order) is reported; missing keys are
/// reported together.
pub fn check_schema(
    map: &Mapping,
    element: &str,
    mandatory: &[&str],
    optional: &[&str],
) -> Result<(), SchemaError> {
    let mut remaining: Vec<&str> = mandatory.to_vec();

    for key in map.keys() {
        let key = scalar_to_string(key);
        if let Some(pos) = remaining.iter().position(|m| *m == key) {
            remaining.remove(pos);
        } else if !mandatory.contains(&key.as_str()) && !optional.contains(&key.as_str()) {
            return Err(SchemaError::UnknownField {
                element: element.to_string(),
                field: key,
            });
        }
    }

    if !remaining.is_empty() {
        return Err(SchemaError::MissingField {
            element: element.to_string(),
            fields: remaining.into_iter().map(String::from).collect(),
        });
    }

    Ok(())
}

/// Renders a YAML scalar the way it was written, e.g. keys like `8` or `M2.5`.
pub fn scalar_to_string(value: &Yaml) -> String {
    match value {
        Yaml::String(s) => s.clone(),
        Yaml::Number(n) => n.to_string(),
        Yaml::Bool(true) => "True".to_string(),
        Yaml::Bool(false) => "False".to_string(),
        Yaml::Null => "None".to_string(),
        Yaml::Tagged(tagged) => scalar_to_string(&tagged.value),
        other => format!("{other:?}"),
    }
}

pub(crate) fn expect_mapping<'a>(
    value: &'a Yaml,
    element: &str,
) -> Result<&'a Mapping, ParsingError> {
    value
        .as_mapping()
        .ok_or_else(|| ParsingError::malformed(element, "expected a mapping"))
}

pub(crate) fn expect_str(value: &Yaml, element: &str, field: &str) -> Result<String, ParsingError> {
    match value {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(_) => Ok(scalar_to_string(value)),
        _ => Err(ParsingError::malformed(
            element,
            format!("field {field} must be a string"),
        )),
    }
}

pub(crate) fn expect_str_list(
    value: &Yaml,
    element: &str,
    field: &str,
) -> Result<Vec<String>, ParsingError> {
    let seq = value.as_sequence().ok_or_else(|| {
        ParsingError::malformed(element, format!("field {field} must be a list"))
    })?;
    seq.iter().map(|v| expect_str(v, element, field)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(src: &str) -> Mapping {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn test_accepts_mandatory_and_optional() {
        let map = mapping("index: key\ncolumns: [a]\ndata: {}");
        assert!(check_schema(&map, "table", &["index", "columns", "data"], &[]).is_ok());
    }

    #[test]
    fn test_rejects_unknown_field() {
        let map = mapping("index: key\ncolumns: [a]\ndata: {}\nextra: 1");
        let err = check_schema(&map, "table", &["index", "columns", "data"], &[]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownField {
                element: "table".to_string(),
                field: "extra".to_string()
            }
        );
    }

    #[test]
    fn test_reports_all_missing_fields() {
        let map = mapping("index: key");
        let err = check_schema(&map, "table", &["index", "columns", "data"], &[]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                element: "table".to_string(),
                fields: vec!["columns".to_string(), "data".to_string()]
            }
        );
    }

    #[test]
    fn test_empty_mapping_with_only_optional_fields() {
        let map = Mapping::new();
        assert!(check_schema(&map, "parameters", &[], &["literal", "free"]).is_ok());
    }

    #[test]
    fn test_scalar_to_string_keeps_numeric_keys() {
        assert_eq!(scalar_to_string(&Yaml::from(8)), "8");
        assert_eq!(scalar_to_string(&Yaml::from("M2.5")), "M2.5");
        assert_eq!(scalar_to_string(&Yaml::Null), "None");
    }
}
