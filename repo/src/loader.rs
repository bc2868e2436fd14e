//! Repository loading.
//!
//! A repository is a directory with a `data/` subdirectory holding one
//! `<id>.blt` collection file per collection and, optionally, backend
//! directories such as `openscad/`.
//!
//! ```no_run
//! use bolts_repo::{LoadOptions, Repository};
//!
//! let repo = Repository::load("BOLTS", &LoadOptions::default()).unwrap();
//! for class in repo.standardized("ISO") {
//!     println!("{} ({})", class.name, class.id);
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use bolts_core::ParameterSet;
use rayon::prelude::*;
use serde::Deserialize;
use serde_yaml::Value as Yaml;
use tracing::{debug, info};

use crate::base::{Base, OpenScadBases};
use crate::class::Class;
use crate::collection::Collection;
use crate::config::LoadOptions;
use crate::error::{RepositoryError, Result, ResultExt, TraceKey};

/// Standard bodies in matching order. A class belongs to the first body its
/// name starts with, so combined bodies precede their parts.
pub const STANDARD_BODIES: [&str; 8] = [
    "DINENISO", "DINEN", "DINISO", "DIN", "EN", "ISO", "ANSI", "ASME",
];

/// Collection ids reserved for other uses.
pub const FORBIDDEN_IDS: [&str; 3] = ["common", "gui", "template"];

/// A loaded repository.
#[derive(Debug)]
pub struct Repository {
    path: PathBuf,
    collections: Vec<Collection>,
    /// Class name to (collection, class) position.
    by_name: HashMap<String, (usize, usize)>,
    standardized: BTreeMap<&'static str, Vec<(usize, usize)>>,
    openscad: Option<OpenScadBases>,
}

impl Repository {
    /// Loads every collection under `path/data` and, if enabled, the
    /// OpenSCAD bases under `path/openscad`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::MalformedRepository`] if `path` or its
    /// `data` directory is missing, [`RepositoryError::MalformedCollection`]
    /// for a collection file that does not hold exactly one document, whose
    /// id differs from the file name, or whose id is reserved, and
    /// [`RepositoryError::UnknownReplacedClass`] if a class replaces a class
    /// that is not in the repository. Errors from within a file carry the
    /// repository path and collection file name in their trace.
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        if !path.is_dir() {
            return Err(RepositoryError::MalformedRepository(
                "repository directory does not exist".into(),
            )
            .trace(TraceKey::RepositoryPath, path_str));
        }
        let data = path.join("data");
        if !data.is_dir() {
            return Err(RepositoryError::MalformedRepository("no data directory found".into())
                .trace(TraceKey::RepositoryPath, path_str));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&data)
            .and_then(|entries| {
                entries
                    .map(|entry| entry.map(|entry| entry.path()))
                    .collect::<std::io::Result<Vec<_>>>()
            })
            .trace(TraceKey::RepositoryPath, &path_str)?;
        files.retain(|p| p.extension().and_then(|e| e.to_str()) == Some("blt"));
        files.sort();
        debug!(files = files.len(), parallel = options.parallel, "reading collection files");

        let mut collections = if options.parallel {
            files
                .par_iter()
                .map(|file| load_collection(file))
                .collect::<Result<Vec<_>>>()
        } else {
            files
                .iter()
                .map(|file| load_collection(file))
                .collect::<Result<Vec<_>>>()
        }
        .trace(TraceKey::RepositoryPath, &path_str)?;
        collections.sort_by(|a, b| a.id.cmp(&b.id));

        let mut repo = Repository {
            path: path.to_path_buf(),
            collections,
            by_name: HashMap::new(),
            standardized: STANDARD_BODIES.iter().map(|body| (*body, Vec::new())).collect(),
            openscad: None,
        };
        repo.index_classes();
        repo.fill_obsolescence().trace(TraceKey::RepositoryPath, &path_str)?;

        let backend = path.join("openscad");
        if options.openscad && backend.is_dir() {
            let bases =
                OpenScadBases::load(&backend).trace(TraceKey::RepositoryPath, &path_str)?;
            repo.openscad = Some(bases);
        }

        info!(
            path = %path_str,
            collections = repo.collections.len(),
            classes = repo.by_name.len(),
            openscad = repo.openscad.is_some(),
            "loaded repository"
        );
        Ok(repo)
    }

    fn index_classes(&mut self) {
        for (ci, coll) in self.collections.iter_mut().enumerate() {
            for (ki, class) in coll.classes.iter_mut().enumerate() {
                self.by_name.entry(class.name.clone()).or_insert((ci, ki));
                let body = STANDARD_BODIES
                    .iter()
                    .find(|body| class.name.starts_with(*body));
                if let Some(body) = body {
                    class.standard_body = Some(body.to_string());
                    if let Some(list) = self.standardized.get_mut(body) {
                        list.push((ci, ki));
                    }
                }
            }
        }
    }

    fn fill_obsolescence(&mut self) -> Result<()> {
        let mut updates = Vec::new();
        for class in self.classes() {
            let Some(replaced) = &class.replaces else {
                continue;
            };
            let target = STANDARD_BODIES
                .iter()
                .find(|body| replaced.starts_with(*body))
                .and_then(|body| self.standardized.get(body))
                .and_then(|list| {
                    list.iter()
                        .find(|&&(ci, ki)| &self.collections[ci].classes[ki].name == replaced)
                })
                .ok_or_else(|| RepositoryError::UnknownReplacedClass {
                    class: class.name.clone(),
                    replaced: replaced.clone(),
                })?;
            updates.push((*target, class.name.clone()));
        }

        for ((ci, ki), replacement) in updates {
            let replaced = &self.collections[ci].classes[ki].name;
            debug!(replaced = %replaced, by = %replacement, "obsolete class");
            self.collections[ci].classes[ki].replaced_by = Some(replacement);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collections sorted by id.
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Every class of every collection.
    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.collections.iter().flat_map(|coll| coll.classes.iter())
    }

    pub fn class_by_name(&self, name: &str) -> Option<&Class> {
        self.by_name.get(name).map(|&(ci, ki)| &self.collections[ci].classes[ki])
    }

    /// The collection a class belongs to.
    pub fn collection_of(&self, name: &str) -> Option<&Collection> {
        self.by_name.get(name).map(|&(ci, _)| &self.collections[ci])
    }

    /// Classes whose name starts with the given standard body.
    pub fn standardized(&self, body: &str) -> Vec<&Class> {
        self.standardized
            .get(body)
            .map(|list| {
                list.iter()
                    .map(|&(ci, ki)| &self.collections[ci].classes[ki])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// OpenSCAD bases, if they were loaded.
    pub fn openscad(&self) -> Option<&OpenScadBases> {
        self.openscad.as_ref()
    }

    /// The OpenSCAD base registered for the class's id.
    pub fn base_for(&self, class: &Class) -> Option<&Base> {
        self.openscad.as_ref().and_then(|bases| bases.base_for(&class.id))
    }

    /// The class's parameters combined with those of its OpenSCAD base.
    ///
    /// Without a base this is a copy of the class's own parameters.
    pub fn full_parameters(&self, class: &Class) -> Result<ParameterSet> {
        match self.base_for(class) {
            Some(base) => class
                .parameters
                .union(base.parameters())
                .trace(TraceKey::Base, &base.filename)
                .trace(TraceKey::Class, &class.name),
            None => Ok(class.parameters.clone()),
        }
    }
}

fn load_collection(file: &Path) -> Result<Collection> {
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_collection_file(file).trace(TraceKey::Collection, &filename)
}

fn parse_collection_file(file: &Path) -> Result<Collection> {
    let content = std::fs::read_to_string(file)?;
    let coll = Collection::parse(&single_document(&content)?)?;

    let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if coll.id != stem {
        return Err(RepositoryError::MalformedCollection(format!(
            "collection id {} is not identical with file name",
            coll.id
        )));
    }
    if FORBIDDEN_IDS.contains(&coll.id.as_str()) {
        return Err(RepositoryError::MalformedCollection(format!(
            "forbidden collection id: {}",
            coll.id
        )));
    }
    debug!(collection = %coll.id, classes = coll.classes.len(), "loaded collection");
    Ok(coll)
}

/// Parses a YAML file that must contain exactly one document.
pub(crate) fn single_document(content: &str) -> Result<Yaml> {
    let mut docs = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(content) {
        docs.push(Yaml::deserialize(doc)?);
    }
    match docs.len() {
        1 => Ok(docs.remove(0)),
        0 => Err(RepositoryError::MalformedCollection("no YAML document found".into())),
        n => Err(RepositoryError::MalformedCollection(format!(
            "more than one YAML document found ({n})"
        ))),
    }
}
