//! Part classes.
//!
//! A class element in a collection file describes one kind of part. If it
//! lists several standards (e.g. `[DIN931, ISO4014]`), it is split into one
//! [`Class`] per standard name sharing everything else.

use bolts_core::{Naming, ParameterSet, check_schema};
use serde::Serialize;
use serde_yaml::{Mapping, Value as Yaml};

use crate::error::{RepositoryError, Result, ResultExt, TraceKey};

const MANDATORY: &[&str] = &["naming", "source", "id"];
const OPTIONAL: &[&str] = &[
    "drawing",
    "description",
    "standard",
    "status",
    "replaces",
    "parameters",
    "url",
    "notes",
];

/// Whether a standard is still in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Withdrawn,
}

impl Status {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Status::Active),
            "withdrawn" => Some(Status::Withdrawn),
            _ => None,
        }
    }
}

/// One part class under one name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Class {
    pub id: String,
    /// Standard designation, or the id for non-standard parts.
    pub name: String,
    /// Name usable as an OpenSCAD identifier.
    pub openscad_name: String,
    pub naming: Naming,
    pub drawing: Option<String>,
    pub description: String,
    /// Every standard name of the class element this class was split from.
    pub standard: Option<Vec<String>>,
    pub status: Status,
    pub replaces: Option<String>,
    /// Set by the repository from other classes' `replaces`.
    pub replaced_by: Option<String>,
    /// Set by the repository from the standard name prefix.
    pub standard_body: Option<String>,
    pub parameters: ParameterSet,
    pub url: String,
    pub notes: String,
    pub source: String,
}

impl Class {
    /// Parses a class element into one class per standard name.
    pub fn parse_all(value: &Yaml) -> Result<Vec<Class>> {
        let map = value
            .as_mapping()
            .ok_or_else(|| RepositoryError::MalformedClass("expected a mapping".into()))?;

        let names = match map.get("standard").or_else(|| map.get("id")) {
            Some(Yaml::Sequence(items)) => items.iter().map(string_field).collect(),
            Some(name) => vec![string_field(name)],
            None => Vec::new(),
        };
        if names.is_empty() {
            // let the schema check report what is missing
            return Class::parse(map, "").map(|class| vec![class]);
        }

        names.iter().map(|name| Class::parse(map, name)).collect()
    }

    /// Parses a class element under a single name.
    pub fn parse(map: &Mapping, name: &str) -> Result<Class> {
        let id = map.get("id").map(string_field).unwrap_or_default();
        Self::parse_inner(map, name).trace(TraceKey::Class, &id)
    }

    fn parse_inner(map: &Mapping, name: &str) -> Result<Class> {
        check_schema(map, "class", MANDATORY, OPTIONAL).map_err(bolts_core::ParsingError::from)?;

        let naming = Naming::parse(&map["naming"])?;

        let mut standard = None;
        let mut status = Status::Active;
        let mut replaces = None;
        if let Some(value) = map.get("standard") {
            standard = Some(match value {
                Yaml::Sequence(items) => items.iter().map(string_field).collect(),
                single => vec![string_field(single)],
            });
            if let Some(value) = map.get("status") {
                let raw = string_field(value);
                status = Status::parse(&raw).ok_or_else(|| {
                    RepositoryError::MalformedClass(format!("unknown status {raw}"))
                })?;
            }
            replaces = map.get("replaces").map(string_field);
        }

        let parameters = match map.get("parameters") {
            Some(params) => ParameterSet::parse(params)?,
            None => ParameterSet::default(),
        };

        Ok(Class {
            id: string_field(&map["id"]),
            name: name.to_string(),
            openscad_name: name.replace(['-', ' ', '.'], "_"),
            naming,
            drawing: map.get("drawing").map(string_field),
            description: map.get("description").map(string_field).unwrap_or_default(),
            standard,
            status,
            replaces,
            replaced_by: None,
            standard_body: None,
            parameters,
            url: map.get("url").map(string_field).unwrap_or_default(),
            notes: map.get("notes").map(string_field).unwrap_or_default(),
            source: string_field(&map["source"]),
        })
    }
}

fn string_field(value: &Yaml) -> String {
    bolts_core::scalar_to_string(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolts_core::{ParsingError, SchemaError};

    fn classes(src: &str) -> Result<Vec<Class>> {
        Class::parse_all(&serde_yaml::from_str(src).unwrap())
    }

    #[test]
    fn test_minimal_class() {
        let parsed =
            classes("id: part\nnaming: {template: Partname}\nsource: Invented for testpurposes")
                .unwrap();
        assert_eq!(parsed.len(), 1);
        let class = &parsed[0];
        assert_eq!(class.name, "part");
        assert_eq!(class.naming.template, "Partname");
        assert_eq!(class.source, "Invented for testpurposes");
        assert!(class.parameters.free().is_empty());
        assert_eq!(class.status, Status::Active);
    }

    #[test]
    fn test_split_by_standard() {
        let parsed = classes(
            r#"
id: hexscrew1
naming: {template: Hex screw}
source: x
standard: [DIN931-1, ISO 4014]
status: withdrawn
"#,
        )
        .unwrap();
        let names: Vec<&str> = parsed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["DIN931-1", "ISO 4014"]);
        assert_eq!(parsed[1].openscad_name, "ISO_4014");
        assert_eq!(parsed[0].openscad_name, "DIN931_1");
        assert!(parsed.iter().all(|c| c.status == Status::Withdrawn));
        assert!(parsed.iter().all(|c| c.id == "hexscrew1"));
    }

    #[test]
    fn test_status_ignored_without_standard() {
        let parsed =
            classes("id: part\nnaming: {template: P}\nsource: x\nstatus: withdrawn").unwrap();
        assert_eq!(parsed[0].status, Status::Active);
    }

    #[test]
    fn test_unknown_status() {
        let src = "id: part\nnaming: {template: P}\nsource: x\nstandard: DIN1\nstatus: retired";
        let err = classes(src).unwrap_err();
        assert!(matches!(err.root(), RepositoryError::MalformedClass(_)));
    }

    #[test]
    fn test_naming_error_is_traced_with_class() {
        let err = classes("id: part\nnaming: {template: P, subst: [d]}\nsource: x").unwrap_err();
        assert!(matches!(err.root(), RepositoryError::Parsing(_)));
        assert_eq!(err.trace_info().unwrap().get(TraceKey::Class), Some("part"));
    }

    #[test]
    fn test_missing_source() {
        let err = classes("id: part\nnaming: {template: P}").unwrap_err();
        assert!(matches!(
            err.root(),
            RepositoryError::Parsing(ParsingError::Schema(SchemaError::MissingField { .. }))
        ));
    }
}
