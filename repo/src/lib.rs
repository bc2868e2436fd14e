//! Loading of part-library repositories.
//!
//! A repository bundles collection files (`data/<id>.blt`), each describing
//! a list of part classes, with optional backend data such as OpenSCAD
//! modules. This crate reads and cross-checks all of it on top of the
//! parameter model in `bolts_core`.
//!
//! # Quick start
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use bolts_repo::{LoadOptions, Repository};
//!
//! let repo = Repository::load("BOLTS", &LoadOptions::default()).unwrap();
//! let class = repo.class_by_name("ISO4017").unwrap();
//! if let Some(successor) = &class.replaced_by {
//!     println!("{} is replaced by {successor}", class.name);
//! }
//!
//! // Class parameters plus those the OpenSCAD module adds
//! let params = repo.full_parameters(class).unwrap();
//! let values = params.collect(params.defaults()).unwrap();
//! if let Some(base) = repo.base_for(class) {
//!     println!("{}", base.incantation(&values).unwrap());
//! }
//! ```
//!
//! # Repository layout
//!
//! ```text
//! repo/
//!   data/hex.blt            collection "hex"
//!   openscad/hex/hex.base   OpenSCAD bases for "hex"
//!   openscad/hex/hex.scad
//! ```

mod base;
mod class;
mod collection;
mod config;
mod error;
mod loader;

pub use base::{Base, BaseKind, OpenScadBases};
pub use class::{Class, Status};
pub use collection::{CURRENT_BLT_VERSION, Collection, Contact};
pub use config::LoadOptions;
pub use error::{RepositoryError, Result, Trace, TraceKey};
pub use loader::{FORBIDDEN_IDS, Repository, STANDARD_BODIES};
