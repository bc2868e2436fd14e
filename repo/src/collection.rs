//! Collection files.
//!
//! A collection is one `data/<id>.blt` document: a header with authorship and
//! licensing information followed by a list of class elements.

use std::sync::LazyLock;

use bolts_core::{ParsingError, check_schema, scalar_to_string};
use regex::Regex;
use serde::Serialize;
use serde_yaml::{Mapping, Value as Yaml};
use tracing::debug;

use crate::class::Class;
use crate::error::{RepositoryError, Result, ResultExt, TraceKey};

/// The `blt-version` this crate understands.
pub const CURRENT_BLT_VERSION: f64 = 0.2;

const HEADER_MANDATORY: &[&str] = &["id", "author", "license", "blt-version"];
const HEADER_OPTIONAL: &[&str] = &["name", "description"];

static ANGLED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^<]*)<([^>]*)").expect("static regex must compile"));

/// A `Name <address>` pair, used for authors and licenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub name: String,
    /// Mail address for authors, URL for licenses.
    pub address: String,
}

impl Contact {
    /// Splits `Name <address>`.
    pub fn parse(raw: &str) -> Option<Contact> {
        let caps = ANGLED.captures(raw)?;
        Some(Contact {
            name: caps[1].trim().to_string(),
            address: caps[2].trim().to_string(),
        })
    }
}

/// A parsed collection file.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub authors: Vec<Contact>,
    pub license: Contact,
    pub classes: Vec<Class>,
}

impl Collection {
    /// Parses a `{collection, classes}` document.
    ///
    /// # Errors
    ///
    /// Fails with [`RepositoryError::Version`] for any `blt-version` other
    /// than [`CURRENT_BLT_VERSION`], with
    /// [`RepositoryError::MalformedCollection`] for a bad header or an empty
    /// class list, and with the class's own error (traced with the class
    /// name) if a class element is invalid.
    pub fn parse(doc: &Yaml) -> Result<Collection> {
        let root = doc
            .as_mapping()
            .ok_or_else(|| RepositoryError::MalformedCollection("expected a mapping".into()))?;
        check_schema(root, "collection file", &["collection", "classes"], &[])
            .map_err(ParsingError::from)?;

        let header = root["collection"].as_mapping().ok_or_else(|| {
            RepositoryError::MalformedCollection("collection header must be a mapping".into())
        })?;
        check_schema(header, "collection", HEADER_MANDATORY, HEADER_OPTIONAL)
            .map_err(ParsingError::from)?;

        check_version(&header["blt-version"])?;

        let id = scalar_to_string(&header["id"]);
        let authors = parse_authors(header)?;
        let license_raw = scalar_to_string(&header["license"]);
        let license = Contact::parse(&license_raw).ok_or_else(|| {
            RepositoryError::MalformedCollection(format!(
                "license not of the form 'Name <url>': {license_raw}"
            ))
        })?;

        let elements = match &root["classes"] {
            Yaml::Sequence(items) if !items.is_empty() => items,
            _ => {
                return Err(RepositoryError::MalformedCollection(format!(
                    "no class in collection {id}"
                )));
            }
        };

        let mut classes = Vec::new();
        for element in elements {
            let name = class_element_name(element);
            classes.extend(Class::parse_all(element).trace(TraceKey::Class, &name)?);
        }
        debug!(collection = %id, classes = classes.len(), "parsed collection");

        Ok(Collection {
            id,
            name: header.get("name").map(scalar_to_string).unwrap_or_default(),
            description: header.get("description").map(scalar_to_string).unwrap_or_default(),
            authors,
            license,
            classes,
        })
    }
}

fn check_version(raw: &Yaml) -> Result<()> {
    match raw.as_f64() {
        Some(version) if version == CURRENT_BLT_VERSION => Ok(()),
        _ => Err(RepositoryError::Version(scalar_to_string(raw))),
    }
}

fn parse_authors(header: &Mapping) -> Result<Vec<Contact>> {
    let raw: Vec<String> = match &header["author"] {
        Yaml::Sequence(items) => items.iter().map(scalar_to_string).collect(),
        single => vec![scalar_to_string(single)],
    };
    raw.iter()
        .map(|author| {
            Contact::parse(author).ok_or_else(|| {
                RepositoryError::MalformedCollection(format!(
                    "author not of the form 'Name <mail>': {author}"
                ))
            })
        })
        .collect()
}

/// Name used in error traces for a class element: its first standard name,
/// or its id.
fn class_element_name(element: &Yaml) -> String {
    let name = element.get("standard").or_else(|| element.get("id"));
    match name {
        Some(Yaml::Sequence(items)) => items.first().map(scalar_to_string).unwrap_or_default(),
        Some(single) => scalar_to_string(single),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"
collection:
  id: test
  author: Johannes Reinhardt <jreinhardt@ist-dein-freund.de>
  license: LGPL 2.1+ <http://www.gnu.org/licenses/old-licenses/lgpl-2.1>
  blt-version: 0.2
"#;

    fn collection(classes: &str) -> Result<Collection> {
        let src = format!("{HEADER}classes:\n{classes}");
        Collection::parse(&serde_yaml::from_str(&src).unwrap())
    }

    #[test]
    fn test_header_fields() {
        let coll =
            collection("  - id: part\n    naming: {template: Partname}\n    source: x\n").unwrap();
        assert_eq!(coll.id, "test");
        assert_eq!(coll.authors[0].name, "Johannes Reinhardt");
        assert_eq!(coll.authors[0].address, "jreinhardt@ist-dein-freund.de");
        assert_eq!(coll.license.name, "LGPL 2.1+");
        assert_eq!(coll.license.address, "http://www.gnu.org/licenses/old-licenses/lgpl-2.1");
        assert_eq!(coll.classes.len(), 1);
        assert!(coll.name.is_empty());
    }

    #[test]
    fn test_empty_class_list() {
        let err = collection("  []\n").unwrap_err();
        assert!(matches!(err, RepositoryError::MalformedCollection(_)));
    }

    #[test]
    fn test_wrong_version() {
        let src = HEADER.replace("0.2", "0.1") + "classes: []\n";
        let err = Collection::parse(&serde_yaml::from_str(&src).unwrap()).unwrap_err();
        assert!(matches!(err, RepositoryError::Version(v) if v == "0.1"));
    }

    #[test]
    fn test_several_authors() {
        let src = HEADER.replace(
            "author: Johannes Reinhardt <jreinhardt@ist-dein-freund.de>",
            "author: [A <a@example.org>, B <b@example.org>]",
        ) + "classes:\n  - id: part\n    naming: {template: P}\n    source: x\n";
        let coll = Collection::parse(&serde_yaml::from_str(&src).unwrap()).unwrap();
        let names: Vec<&str> = coll.authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_class_error_traced_with_name() {
        let src = "  - id: part\n    standard: DIN1\n    naming: {template: P}\n";
        let err = collection(src).unwrap_err();
        let trace = err.trace_info().unwrap();
        assert_eq!(trace.get(TraceKey::Class), Some("part"));
        assert!(err.to_string().contains("Class: DIN1"));
    }

    #[test]
    fn test_contact_without_brackets() {
        assert_eq!(Contact::parse("nobody"), None);
    }
}
