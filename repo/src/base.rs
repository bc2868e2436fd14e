//! OpenSCAD backend bases.
//!
//! The OpenSCAD backend lives under `openscad/` in a repository. Each
//! collection with OpenSCAD geometry has a directory `openscad/<coll>/`
//! holding `<coll>.base`, a list of base-file entries. A base file either
//! defines OpenSCAD modules (`type: module`) or is an STL mesh
//! (`type: stl`). Every class id is served by at most one base.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use bolts_core::{
    CollectError, ParameterSet, ParsingError, Value, check_schema, scalar_to_string,
};
use serde::Serialize;
use serde_yaml::{Mapping, Value as Yaml};
use tracing::debug;

use crate::collection::Contact;
use crate::error::{RepositoryError, Result, ResultExt, TraceKey};
use crate::loader::single_document;

/// What a base provides.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BaseKind {
    /// An OpenSCAD module called with `arguments` in order.
    Module { name: String, arguments: Vec<String> },
    /// A mesh imported as is.
    Stl,
}

/// One base serving a list of class ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Base {
    pub collection: String,
    pub filename: String,
    pub authors: Vec<Contact>,
    pub license: Contact,
    pub source: String,
    pub classids: Vec<String>,
    pub kind: BaseKind,
    parameters: ParameterSet,
}

impl Base {
    /// Parameters declared by the base itself.
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// The OpenSCAD statement producing the geometry for `values`.
    ///
    /// Module arguments are taken from `values` in declaration order and
    /// rendered as OpenSCAD literals.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use bolts_core::Value;
    /// use bolts_repo::OpenScadBases;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// std::fs::create_dir_all(dir.path().join("nut")).unwrap();
    /// std::fs::write(dir.path().join("nut/nut.base"), r#"
    /// - filename: nut.scad
    ///   author: A <a@example.org>
    ///   license: MIT <http://opensource.org/licenses/MIT>
    ///   type: module
    ///   modules:
    ///     - name: hex_nut
    ///       arguments: [key, s]
    ///       classids: [hexnut]
    /// "#).unwrap();
    ///
    /// let bases = OpenScadBases::load(dir.path()).unwrap();
    /// let mut values = BTreeMap::new();
    /// values.insert("key".to_string(), Value::from("M3"));
    /// values.insert("s".to_string(), Value::Number(5.5));
    /// let base = bases.base_for("hexnut").unwrap();
    /// assert_eq!(base.incantation(&values).unwrap(), r#"hex_nut("M3", 5.5)"#);
    /// ```
    pub fn incantation(
        &self,
        values: &BTreeMap<String, Value>,
    ) -> std::result::Result<String, CollectError> {
        match &self.kind {
            BaseKind::Module { name, arguments } => {
                let args = arguments
                    .iter()
                    .map(|arg| {
                        values
                            .get(arg)
                            .map(openscad_literal)
                            .ok_or_else(|| CollectError::Uncollected(arg.clone()))
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(format!("{name}({})", args.join(", ")))
            }
            BaseKind::Stl => Ok(format!("import(\"base/{}\")", self.filename)),
        }
    }
}

fn openscad_literal(value: &Value) -> String {
    match value {
        Value::None => "undef".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Str(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    c => out.push(c),
                }
            }
            out.push('"');
            out
        }
    }
}

/// All OpenSCAD bases of a repository, indexed by class id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OpenScadBases {
    bases: Vec<Base>,
    #[serde(skip)]
    by_class: HashMap<String, usize>,
}

impl OpenScadBases {
    /// Reads every `<coll>/<coll>.base` below `backend_root`.
    ///
    /// Directories without a base file are skipped.
    ///
    /// # Errors
    ///
    /// Fails on unreadable files, malformed base entries (traced with the
    /// base filename), or a class id claimed by two bases
    /// ([`RepositoryError::NonUniqueBase`]).
    pub fn load(backend_root: impl AsRef<Path>) -> Result<Self> {
        let backend_root = backend_root.as_ref();
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(backend_root)? {
            let entry = entry?;
            if entry.path().is_dir() {
                dirs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        dirs.sort();

        let mut bases = OpenScadBases::default();
        for coll in dirs {
            let path = backend_root.join(&coll).join(format!("{coll}.base"));
            if !path.exists() {
                debug!(collection = %coll, "no base file, skipping");
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let doc = single_document(&content).trace(TraceKey::Collection, &coll)?;
            for base in parse_base_file(&doc, &coll).trace(TraceKey::Collection, &coll)? {
                bases.insert(base)?;
            }
        }
        debug!(
            bases = bases.bases.len(),
            classes = bases.by_class.len(),
            "loaded OpenSCAD bases"
        );
        Ok(bases)
    }

    fn insert(&mut self, base: Base) -> Result<()> {
        let idx = self.bases.len();
        for id in &base.classids {
            if self.by_class.insert(id.clone(), idx).is_some() {
                return Err(RepositoryError::NonUniqueBase(id.clone())
                    .trace(TraceKey::Base, base.filename.clone()));
            }
        }
        self.bases.push(base);
        Ok(())
    }

    /// The base serving `classid`, if any.
    pub fn base_for(&self, classid: &str) -> Option<&Base> {
        self.by_class.get(classid).map(|&idx| &self.bases[idx])
    }

    pub fn bases(&self) -> &[Base] {
        &self.bases
    }
}

fn parse_base_file(doc: &Yaml, coll: &str) -> Result<Vec<Base>> {
    let entries = doc
        .as_sequence()
        .ok_or_else(|| RepositoryError::MalformedBase("base file must be a list".into()))?;

    let mut bases = Vec::new();
    for entry in entries {
        let map = entry
            .as_mapping()
            .ok_or_else(|| RepositoryError::MalformedBase("base entry must be a mapping".into()))?;
        let filename = map.get("filename").map(scalar_to_string).unwrap_or_default();
        parse_entry(map, coll, &mut bases).trace(TraceKey::Base, &filename)?;
    }
    Ok(bases)
}

fn parse_entry(map: &Mapping, coll: &str, bases: &mut Vec<Base>) -> Result<()> {
    let kind = map.get("type").map(scalar_to_string).unwrap_or_default();
    match kind.as_str() {
        "module" => {
            check_schema(
                map,
                "base module",
                &["filename", "author", "license", "type", "modules"],
                &["source"],
            )
            .map_err(ParsingError::from)?;
            let modules = map["modules"]
                .as_sequence()
                .ok_or_else(|| RepositoryError::MalformedBase("modules must be a list".into()))?;
            for module in modules {
                let module = module.as_mapping().ok_or_else(|| {
                    RepositoryError::MalformedBase("module must be a mapping".into())
                })?;
                check_schema(
                    module,
                    "module",
                    &["name", "arguments", "classids"],
                    &["parameters"],
                )
                .map_err(ParsingError::from)?;
                let kind = BaseKind::Module {
                    name: scalar_to_string(&module["name"]),
                    arguments: string_list(&module["arguments"], "arguments")?,
                };
                let classids = string_list(&module["classids"], "classids")?;
                bases.push(header(map, coll, kind, classids, module.get("parameters"))?);
            }
        }
        "stl" => {
            check_schema(
                map,
                "base stl",
                &["filename", "author", "license", "type", "classids"],
                &["source", "parameters"],
            )
            .map_err(ParsingError::from)?;
            let classids = string_list(&map["classids"], "classids")?;
            bases.push(header(map, coll, BaseKind::Stl, classids, map.get("parameters"))?);
        }
        other => {
            return Err(RepositoryError::MalformedBase(format!("unknown base type '{other}'")));
        }
    }
    Ok(())
}

fn header(
    map: &Mapping,
    coll: &str,
    kind: BaseKind,
    classids: Vec<String>,
    parameters: Option<&Yaml>,
) -> Result<Base> {
    let raw_authors: Vec<String> = match &map["author"] {
        Yaml::Sequence(items) => items.iter().map(scalar_to_string).collect(),
        single => vec![scalar_to_string(single)],
    };
    let authors = raw_authors
        .iter()
        .map(|raw| contact(raw, "author"))
        .collect::<Result<Vec<_>>>()?;
    let license = contact(&scalar_to_string(&map["license"]), "license")?;

    let parameters = match parameters {
        Some(params) => ParameterSet::parse(params)?,
        None => ParameterSet::default(),
    };

    Ok(Base {
        collection: coll.to_string(),
        filename: scalar_to_string(&map["filename"]),
        authors,
        license,
        source: map.get("source").map(scalar_to_string).unwrap_or_default(),
        classids,
        kind,
        parameters,
    })
}

fn contact(raw: &str, field: &str) -> Result<Contact> {
    Contact::parse(raw).ok_or_else(|| {
        RepositoryError::MalformedBase(format!("{field} not of the form 'Name <address>': {raw}"))
    })
}

fn string_list(value: &Yaml, field: &str) -> Result<Vec<String>> {
    match value {
        Yaml::Sequence(items) => Ok(items.iter().map(scalar_to_string).collect()),
        _ => Err(RepositoryError::MalformedBase(format!("{field} must be a list"))),
    }
}
