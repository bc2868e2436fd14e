//! Parameter model for declarative part-library descriptions.
//!
//! Part classes (bolts, nuts, bearings) are described in YAML. This crate
//! parses and validates the parts of a description that every backend needs:
//!
//! - [`ParameterSet`] — literal and free parameters, lookup tables, types,
//!   defaults, choices and common combinations, with
//!   [`collect`](ParameterSet::collect) and [`union`](ParameterSet::union).
//! - [`ParameterType`] and [`Value`] — the six parameter types and the
//!   normalization of raw table cells.
//! - [`Table`] and [`Table2D`] — 1-D and 2-D lookups keyed by Table Index
//!   parameters.
//! - [`sort_choices`] — ordering of discrete choices by the first applicable
//!   [`SortStrategy`].
//! - [`check_schema`] — mandatory/optional key checking used by every element.
//! - [`Naming`] — name templates filled from collected values.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use bolts_core::*;
//!
//! let class: serde_yaml::Value = serde_yaml::from_str(r#"
//! free: [key, flag]
//! types: {key: Table Index, flag: Bool}
//! tables:
//!   index: key
//!   columns: [d]
//!   data: {M3: [3], M4: [4]}
//! "#).unwrap();
//! let base: serde_yaml::Value = serde_yaml::from_str("literal: {thread: metric}").unwrap();
//!
//! let class = ParameterSet::parse(&class).unwrap();
//! assert_eq!(class.common().unwrap().len(), 4);
//!
//! let full = class.union(&ParameterSet::parse(&base).unwrap()).unwrap();
//! let mut free = BTreeMap::new();
//! free.insert("key".to_string(), Value::from("M4"));
//! free.insert("flag".to_string(), Value::Bool(true));
//! let values = full.collect(&free).unwrap();
//! assert_eq!(values["d"], Value::Number(4.0));
//! assert_eq!(values["thread"], Value::from("metric"));
//! ```

mod common;
mod error;
mod naming;
mod params;
mod schema;
mod sort;
mod table;
mod types;

pub use common::Combinations;
pub use error::{CollectError, ParsingError, Result, SchemaError, ValueError};
pub use naming::Naming;
pub use params::{FULL_DOMAIN, ParameterSet};
pub use schema::{check_schema, scalar_to_string};
pub use sort::{Alphabetical, Numerical, SORT_STRATEGIES, SortStrategy, sort_choices};
pub use table::{RawTable, RawTable2D, Table, Table2D, TypeMap};
pub use types::{ParameterType, Value};
