//! Parameter sets: literal values, free parameters, tables and their types.
//!
//! A [`ParameterSet`] is parsed once from the `parameters` element of a class
//! or base and is immutable afterwards. [`ParameterSet::collect`] resolves the
//! value of every parameter for one choice of free values;
//! [`ParameterSet::union`] combines two independently declared sets (a class
//! and its backend base) into a new one.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use bolts_core::{ParameterSet, Value};
//!
//! let yaml: serde_yaml::Value = serde_yaml::from_str(r#"
//! free: [key, l]
//! types:
//!   key: Table Index
//! tables:
//!   index: key
//!   columns: [d, s]
//!   data:
//!     M2.5: ["2.5", "12.0"]
//!     M3: ["3", "15"]
//! "#).unwrap();
//! let params = ParameterSet::parse(&yaml).unwrap();
//! assert_eq!(params.choices()["key"], vec!["M2.5", "M3"]);
//!
//! let mut free = BTreeMap::new();
//! free.insert("key".to_string(), Value::from("M2.5"));
//! free.insert("l".to_string(), Value::Number(37.4));
//! let values = params.collect(&free).unwrap();
//! assert_eq!(values["s"], Value::Number(12.0));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_yaml::Value as Yaml;
use tracing::debug;

use crate::common::Combinations;
use crate::error::{CollectError, ParsingError, Result};
use crate::schema::{check_schema, expect_mapping, expect_str, expect_str_list, scalar_to_string};
use crate::sort::sort_choices;
use crate::table::{RawTable, RawTable2D, Table, Table2D, TypeMap};
use crate::{ParameterType, Value};

const MANDATORY: &[&str] = &[];
const OPTIONAL: &[&str] = &[
    "literal",
    "free",
    "tables",
    "tables2d",
    "types",
    "defaults",
    "common",
    "description",
];

/// Token standing for "every value of this parameter" in a common spec.
pub const FULL_DOMAIN: &str = ":";

/// The parameters of a part class or base.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    literal: BTreeMap<String, Value>,
    free: Vec<String>,
    tables: Vec<Table>,
    tables2d: Vec<Table2D>,
    types: TypeMap,
    description: BTreeMap<String, String>,
    defaults: BTreeMap<String, Value>,
    choices: BTreeMap<String, Vec<String>>,
    common: Option<Vec<Vec<Value>>>,
    parameters: BTreeSet<String>,
}

impl Default for ParameterSet {
    /// The set parsed from an empty `parameters` element.
    fn default() -> Self {
        Self {
            literal: BTreeMap::new(),
            free: Vec::new(),
            tables: Vec::new(),
            tables2d: Vec::new(),
            types: TypeMap::new(),
            description: BTreeMap::new(),
            defaults: BTreeMap::new(),
            choices: BTreeMap::new(),
            common: Some(vec![Vec::new()]),
            parameters: BTreeSet::new(),
        }
    }
}

impl ParameterSet {
    /// Parses and validates a `parameters` element.
    ///
    /// # Errors
    ///
    /// Any schema violation, unknown parameter or type, table normalization
    /// failure, default for a non-free parameter, or unenumerable common
    /// spec aborts construction.
    pub fn parse(value: &Yaml) -> Result<Self> {
        let map = expect_mapping(value, "parameters")?;
        check_schema(map, "parameters", MANDATORY, OPTIONAL)?;

        let literal = match map.get("literal") {
            Some(lit) => expect_mapping(lit, "literal")?
                .iter()
                .map(|(k, v)| (scalar_to_string(k), Value::from_yaml(v)))
                .collect(),
            None => BTreeMap::new(),
        };

        let free = match map.get("free") {
            Some(free) => expect_str_list(free, "parameters", "free")?,
            None => Vec::new(),
        };

        let raw_tables = one_or_many(map.get("tables"), RawTable::parse)?;
        let raw_tables2d = one_or_many(map.get("tables2d"), RawTable2D::parse)?;

        let mut parameters: BTreeSet<String> = literal.keys().cloned().collect();
        parameters.extend(free.iter().cloned());
        for table in &raw_tables {
            parameters.insert(table.index.clone());
            parameters.extend(table.columns.iter().cloned());
        }
        for table in &raw_tables2d {
            parameters.insert(table.rowindex.clone());
            parameters.insert(table.colindex.clone());
            parameters.insert(table.result.clone());
        }

        let mut types = TypeMap::new();
        if let Some(declared) = map.get("types") {
            for (name, label) in expect_mapping(declared, "types")? {
                let name = scalar_to_string(name);
                if !parameters.contains(&name) {
                    return Err(ParsingError::UnknownParameter {
                        section: "types".to_string(),
                        name,
                    });
                }
                let label = expect_str(label, "types", &name)?;
                types.insert(name, label.parse::<ParameterType>()?);
            }
        }
        for name in &parameters {
            types.entry(name.clone()).or_default();
        }

        let mut description = BTreeMap::new();
        if let Some(declared) = map.get("description") {
            for (name, text) in expect_mapping(declared, "description")? {
                let name = scalar_to_string(name);
                if !parameters.contains(&name) {
                    return Err(ParsingError::UnknownParameter {
                        section: "description".to_string(),
                        name,
                    });
                }
                description.insert(name, scalar_to_string(text));
            }
        }

        let tables = raw_tables
            .iter()
            .map(|t| t.normalize(&types))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let tables2d = raw_tables2d
            .iter()
            .map(|t| t.normalize(&types))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut defaults: BTreeMap<String, Value> = free
            .iter()
            .map(|p| (p.clone(), types[p].default_value()))
            .collect();
        if let Some(declared) = map.get("defaults") {
            for (name, value) in expect_mapping(declared, "defaults")? {
                let name = scalar_to_string(name);
                if !free.contains(&name) {
                    return Err(ParsingError::NonFreeDefault(name));
                }
                let value = types[&name].normalize(&name, value)?;
                defaults.insert(name, value);
            }
        }

        let choices = compute_choices(&free, &types, &tables, &tables2d);

        let mut params = Self {
            literal,
            free,
            tables,
            tables2d,
            types,
            description,
            defaults,
            choices,
            common: None,
            parameters,
        };

        params.common = match map.get("common") {
            Some(spec) => Some(params.expand_common(spec)?),
            None => params.auto_common(),
        };

        debug!(
            parameters = params.parameters.len(),
            free = params.free.len(),
            tables = params.tables.len(),
            tables2d = params.tables2d.len(),
            "parsed parameter set"
        );
        Ok(params)
    }

    /// Fixed values that callers cannot set.
    pub fn literal(&self) -> &BTreeMap<String, Value> {
        &self.literal
    }

    /// Names a caller must supply to [`collect`](Self::collect), in declaration order.
    pub fn free(&self) -> &[String] {
        &self.free
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn tables2d(&self) -> &[Table2D] {
        &self.tables2d
    }

    /// Type of every parameter; undeclared parameters are `Length (mm)`.
    pub fn types(&self) -> &TypeMap {
        &self.types
    }

    pub fn type_of(&self, name: &str) -> Option<ParameterType> {
        self.types.get(name).copied()
    }

    pub fn description(&self) -> &BTreeMap<String, String> {
        &self.description
    }

    /// Default value of every free parameter.
    pub fn defaults(&self) -> &BTreeMap<String, Value> {
        &self.defaults
    }

    /// Legal values of every free Table Index parameter used by a table.
    pub fn choices(&self) -> &BTreeMap<String, Vec<String>> {
        &self.choices
    }

    /// Interesting combinations of free values, ordered like [`free`](Self::free).
    ///
    /// `None` when not declared and not every free parameter is discrete.
    pub fn common(&self) -> Option<&[Vec<Value>]> {
        self.common.as_deref()
    }

    /// Every parameter name: literal, free and table-derived.
    pub fn parameters(&self) -> &BTreeSet<String> {
        &self.parameters
    }

    /// Resolves every parameter from a value for each free parameter.
    ///
    /// Literal values come first, then `free`, then each table's row for the
    /// chosen index and each 2-D table's cell. Values are not coerced.
    ///
    /// # Errors
    ///
    /// Fails if a table key is absent or any parameter is left without a
    /// value.
    pub fn collect(
        &self,
        free: &BTreeMap<String, Value>,
    ) -> std::result::Result<BTreeMap<String, Value>, CollectError> {
        let mut res = self.literal.clone();
        res.extend(free.iter().map(|(k, v)| (k.clone(), v.clone())));

        for table in &self.tables {
            let key = index_key(&res, &table.index)?;
            let row = table.row(&key).ok_or_else(|| CollectError::MissingRow {
                index: table.index.clone(),
                key: key.clone(),
            })?;
            for (column, value) in table.columns.iter().zip(row) {
                res.insert(column.clone(), value.clone());
            }
        }

        for table in &self.tables2d {
            let row_key = index_key(&res, &table.rowindex)?;
            let col_key = index_key(&res, &table.colindex)?;
            let row = table.data.get(&row_key).ok_or_else(|| CollectError::MissingRow {
                index: table.rowindex.clone(),
                key: row_key.clone(),
            })?;
            let value = table
                .columns
                .iter()
                .position(|c| *c == col_key)
                .and_then(|pos| row.get(pos))
                .ok_or_else(|| CollectError::MissingColumn {
                    index: table.colindex.clone(),
                    key: col_key.clone(),
                })?;
            res.insert(table.result.clone(), value.clone());
        }

        if let Some(missing) = self.parameters.iter().find(|p| !res.contains_key(*p)) {
            return Err(CollectError::Uncollected(missing.clone()));
        }

        Ok(res)
    }

    /// Combines this set with `other` into a new set.
    ///
    /// Literals of `other` win on collision; free lists and tables are
    /// concatenated as they are. Types, defaults and descriptions declared in
    /// both must agree. Choices of a shared index are intersected.
    ///
    /// # Examples
    ///
    /// ```
    /// use bolts_core::{ParameterSet, ParsingError};
    ///
    /// let parse = |src: &str| ParameterSet::parse(&serde_yaml::from_str(src).unwrap()).unwrap();
    /// let a = parse("free: [x]\ntypes: {x: Number}");
    /// let b = parse("free: [x]\ntypes: {x: Bool}");
    /// assert!(matches!(a.union(&b), Err(ParsingError::IncompatibleType { .. })));
    /// assert!(a.union(&a).is_ok());
    /// ```
    pub fn union(&self, other: &ParameterSet) -> Result<ParameterSet> {
        let mut literal = self.literal.clone();
        literal.extend(other.literal.iter().map(|(k, v)| (k.clone(), v.clone())));

        let free: Vec<String> = self.free.iter().chain(&other.free).cloned().collect();
        let tables = self.tables.iter().chain(&other.tables).cloned().collect();
        let tables2d = self.tables2d.iter().chain(&other.tables2d).cloned().collect();
        let parameters = self.parameters.union(&other.parameters).cloned().collect();

        let types = merge_checked(&self.types, &other.types, |name, left, right| {
            ParsingError::IncompatibleType {
                name: name.to_string(),
                left: *left,
                right: *right,
            }
        })?;
        let defaults = merge_checked(&self.defaults, &other.defaults, |name, left, right| {
            ParsingError::IncompatibleDefault {
                name: name.to_string(),
                left: left.to_string(),
                right: right.to_string(),
            }
        })?;
        let description =
            merge_checked(&self.description, &other.description, |name, left, right| {
                ParsingError::IncompatibleDescription {
                    name: name.to_string(),
                    left: left.clone(),
                    right: right.clone(),
                }
            })?;

        let mut choices = self.choices.clone();
        for (name, theirs) in &other.choices {
            let merged = match choices.get(name) {
                Some(ours) => {
                    let theirs: BTreeSet<&String> = theirs.iter().collect();
                    ours.iter().filter(|c| theirs.contains(c)).cloned().collect()
                }
                None => theirs.clone(),
            };
            choices.insert(name.clone(), sort_choices(merged));
        }

        debug!(
            free = free.len(),
            parameters = self.parameters.len() + other.parameters.len(),
            "merged parameter sets"
        );

        Ok(ParameterSet {
            literal,
            free,
            tables,
            tables2d,
            types,
            description,
            defaults,
            choices,
            common: None,
            parameters,
        })
    }

    /// Every value of a discrete free parameter.
    fn full_domain(&self, name: &str) -> Result<Vec<Value>> {
        match self.types.get(name).copied().unwrap_or_default() {
            ParameterType::Bool => Ok(vec![Value::Bool(true), Value::Bool(false)]),
            ParameterType::TableIndex => self
                .choices
                .get(name)
                .map(|c| c.iter().cloned().map(Value::Str).collect())
                .ok_or_else(|| {
                    ParsingError::Common(format!("no table provides choices for {name}"))
                }),
            other => Err(ParsingError::Common(format!(
                "cannot enumerate parameter {name} of type {other}"
            ))),
        }
    }

    /// Without free parameters this is the single empty combination.
    fn auto_common(&self) -> Option<Vec<Vec<Value>>> {
        let domains = self
            .free
            .iter()
            .map(|name| self.full_domain(name).ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Combinations::new(domains).collect())
    }

    fn expand_common(&self, spec: &Yaml) -> Result<Vec<Vec<Value>>> {
        let seq = spec
            .as_sequence()
            .ok_or_else(|| ParsingError::malformed("common", "expected a list"))?;

        let nested = !seq.is_empty()
            && seq.iter().all(|combo| {
                combo
                    .as_sequence()
                    .is_some_and(|positions| positions.iter().all(is_position_spec))
            });

        let mut common = Vec::new();
        if nested {
            for combo in seq {
                if let Some(positions) = combo.as_sequence() {
                    common.extend(self.expand_combination(positions)?);
                }
            }
        } else {
            common.extend(self.expand_combination(seq)?);
        }
        Ok(common)
    }

    fn expand_combination(&self, positions: &[Yaml]) -> Result<Combinations> {
        if positions.len() != self.free.len() {
            return Err(ParsingError::Common(format!(
                "expected {} positions, found {}",
                self.free.len(),
                positions.len()
            )));
        }

        let domains = self
            .free
            .iter()
            .zip(positions)
            .map(|(name, position)| match position {
                Yaml::String(token) if token == FULL_DOMAIN => self.full_domain(name),
                Yaml::Sequence(values) => {
                    let ty = self.types.get(name).copied().unwrap_or_default();
                    values
                        .iter()
                        .map(|v| ty.normalize(name, v).map_err(ParsingError::from))
                        .collect()
                }
                _ => Err(ParsingError::Common(format!(
                    "position for {name} must be '{FULL_DOMAIN}' or a list of values"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Combinations::new(domains))
    }
}

fn is_position_spec(value: &Yaml) -> bool {
    matches!(value, Yaml::Sequence(_)) || value.as_str() == Some(FULL_DOMAIN)
}

fn one_or_many<T>(value: Option<&Yaml>, parse: impl Fn(&Yaml) -> Result<T>) -> Result<Vec<T>> {
    match value {
        None => Ok(Vec::new()),
        Some(Yaml::Sequence(items)) => items.iter().map(parse).collect(),
        Some(single) => Ok(vec![parse(single)?]),
    }
}

fn index_key(
    res: &BTreeMap<String, Value>,
    index: &str,
) -> std::result::Result<String, CollectError> {
    res.get(index)
        .map(Value::to_string)
        .ok_or_else(|| CollectError::MissingValue(index.to_string()))
}

/// Free Table Index parameters mapped to the keys every table indexed by them
/// has in common.
fn compute_choices(
    free: &[String],
    types: &TypeMap,
    tables: &[Table],
    tables2d: &[Table2D],
) -> BTreeMap<String, Vec<String>> {
    let mut choices = BTreeMap::new();

    for name in free {
        if types.get(name) != Some(&ParameterType::TableIndex) {
            continue;
        }

        let candidates = tables
            .iter()
            .filter(|t| t.index == *name)
            .map(|t| t.keys().map(String::from).collect::<BTreeSet<_>>())
            .chain(
                tables2d
                    .iter()
                    .filter(|t| t.rowindex == *name)
                    .map(|t| t.row_keys().map(String::from).collect()),
            )
            .chain(
                tables2d
                    .iter()
                    .filter(|t| t.colindex == *name)
                    .map(|t| t.columns.iter().cloned().collect()),
            )
            .reduce(|acc, keys| acc.intersection(&keys).cloned().collect());

        if let Some(candidates) = candidates {
            choices.insert(name.clone(), sort_choices(candidates.into_iter().collect()));
        }
    }

    choices
}

fn merge_checked<V: Clone + PartialEq>(
    left: &BTreeMap<String, V>,
    right: &BTreeMap<String, V>,
    conflict: impl Fn(&str, &V, &V) -> ParsingError,
) -> Result<BTreeMap<String, V>> {
    let mut merged = left.clone();
    for (name, value) in right {
        match merged.get(name) {
            Some(existing) if existing != value => {
                return Err(conflict(name, existing, value));
            }
            _ => {
                merged.insert(name.clone(), value.clone());
            }
        }
    }
    Ok(merged)
}
