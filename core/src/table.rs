//! One- and two-dimensional lookup tables.
//!
//! Tables are built in two steps. Parsing yields a [`RawTable`] or
//! [`RawTable2D`] holding the YAML cells as written; once the owning parameter
//! set has resolved the type of every parameter, `normalize` produces the
//! typed [`Table`] or [`Table2D`]. Only normalized tables are ever looked up.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_yaml::{Mapping, Value as Yaml};
use tracing::debug;

use crate::error::{ParsingError, Result, ValueError};
use crate::schema::{check_schema, expect_mapping, expect_str, expect_str_list, scalar_to_string};
use crate::{ParameterType, Value};

/// Resolved type of every parameter of a parameter set.
pub type TypeMap = BTreeMap<String, ParameterType>;

fn type_of(types: &TypeMap, name: &str) -> ParameterType {
    types.get(name).copied().unwrap_or_default()
}

fn require_table_index(types: &TypeMap, name: &str) -> std::result::Result<(), ValueError> {
    match type_of(types, name) {
        ParameterType::TableIndex => Ok(()),
        found => Err(ValueError::IndexNotTableIndex {
            param: name.to_string(),
            found,
        }),
    }
}

fn parse_data(value: &Yaml, element: &str) -> Result<BTreeMap<String, Vec<Yaml>>> {
    let map = expect_mapping(value, element)?;
    let mut data = BTreeMap::new();
    for (key, row) in map {
        let row = row.as_sequence().ok_or_else(|| {
            ParsingError::malformed(element, format!("row {} is not a list", scalar_to_string(key)))
        })?;
        data.insert(scalar_to_string(key), row.clone());
    }
    Ok(data)
}

fn check_row_length(
    key: &str,
    row: &[Yaml],
    expected: usize,
) -> std::result::Result<(), ValueError> {
    if row.len() != expected {
        return Err(ValueError::RowLength {
            key: key.to_string(),
            expected,
            found: row.len(),
        });
    }
    Ok(())
}

/// A table as parsed, cells not yet typed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub index: String,
    pub columns: Vec<String>,
    pub data: BTreeMap<String, Vec<Yaml>>,
}

impl RawTable {
    /// Parses `{index, columns, data}`.
    pub fn parse(value: &Yaml) -> Result<Self> {
        let map: &Mapping = expect_mapping(value, "table")?;
        check_schema(map, "table", &["index", "columns", "data"], &[])?;

        Ok(Self {
            index: expect_str(&map["index"], "table", "index")?,
            columns: expect_str_list(&map["columns"], "table", "columns")?,
            data: parse_data(&map["data"], "table")?,
        })
    }

    /// Types every cell by its column's type.
    ///
    /// Fails if the index is not a Table Index, a row has the wrong number
    /// of cells, or a cell does not fit its column type.
    pub fn normalize(&self, types: &TypeMap) -> std::result::Result<Table, ValueError> {
        require_table_index(types, &self.index)?;

        let col_types: Vec<ParameterType> =
            self.columns.iter().map(|c| type_of(types, c)).collect();

        let mut data = BTreeMap::new();
        for (key, row) in &self.data {
            check_row_length(key, row, self.columns.len())?;
            let cells = row
                .iter()
                .zip(self.columns.iter().zip(&col_types))
                .map(|(cell, (col, ty))| ty.normalize(col, cell))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            data.insert(key.clone(), cells);
        }

        debug!(index = %self.index, rows = data.len(), "normalized table");
        Ok(Table {
            index: self.index.clone(),
            columns: self.columns.clone(),
            data,
        })
    }
}

/// A typed 1-D lookup table.
///
/// # Examples
///
/// ```
/// use bolts_core::{ParameterType, RawTable, TypeMap, Value};
///
/// let yaml: serde_yaml::Value = serde_yaml::from_str(
///     "index: key\ncolumns: [d, s]\ndata:\n  M3: [3, 5.5]\n  M4: [4, 7]",
/// ).unwrap();
/// let mut types = TypeMap::new();
/// types.insert("key".into(), ParameterType::TableIndex);
///
/// let table = RawTable::parse(&yaml).unwrap().normalize(&types).unwrap();
/// assert_eq!(table.row("M3").unwrap()[1], Value::Number(5.5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub index: String,
    pub columns: Vec<String>,
    pub data: BTreeMap<String, Vec<Value>>,
}

impl Table {
    pub fn row(&self, key: &str) -> Option<&[Value]> {
        self.data.get(key).map(Vec::as_slice)
    }

    /// Keys of the rows, i.e. the legal values of the index.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Index and column names.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.index.as_str()).chain(self.columns.iter().map(String::as_str))
    }
}

/// A 2-D table as parsed, cells not yet typed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable2D {
    pub rowindex: String,
    pub colindex: String,
    pub columns: Vec<String>,
    pub result: String,
    pub data: BTreeMap<String, Vec<Yaml>>,
}

impl RawTable2D {
    /// Parses `{rowindex, colindex, columns, result, data}`.
    pub fn parse(value: &Yaml) -> Result<Self> {
        let map = expect_mapping(value, "table2d")?;
        check_schema(
            map,
            "table2d",
            &["rowindex", "colindex", "columns", "result", "data"],
            &[],
        )?;

        let rowindex = expect_str(&map["rowindex"], "table2d", "rowindex")?;
        let colindex = expect_str(&map["colindex"], "table2d", "colindex")?;
        if rowindex == colindex {
            return Err(ValueError::SameIndex(rowindex).into());
        }

        Ok(Self {
            rowindex,
            colindex,
            columns: expect_str_list(&map["columns"], "table2d", "columns")?,
            result: expect_str(&map["result"], "table2d", "result")?,
            data: parse_data(&map["data"], "table2d")?,
        })
    }

    /// Types every cell by the result parameter's type.
    pub fn normalize(&self, types: &TypeMap) -> std::result::Result<Table2D, ValueError> {
        require_table_index(types, &self.rowindex)?;
        require_table_index(types, &self.colindex)?;

        let ty = type_of(types, &self.result);
        let mut data = BTreeMap::new();
        for (key, row) in &self.data {
            check_row_length(key, row, self.columns.len())?;
            let cells = row
                .iter()
                .map(|cell| ty.normalize(&self.result, cell))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            data.insert(key.clone(), cells);
        }

        debug!(
            rowindex = %self.rowindex,
            colindex = %self.colindex,
            rows = data.len(),
            "normalized table2d"
        );
        Ok(Table2D {
            rowindex: self.rowindex.clone(),
            colindex: self.colindex.clone(),
            columns: self.columns.clone(),
            result: self.result.clone(),
            data,
        })
    }
}

/// A typed 2-D lookup table producing a single `result` parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table2D {
    pub rowindex: String,
    pub colindex: String,
    pub columns: Vec<String>,
    pub result: String,
    pub data: BTreeMap<String, Vec<Value>>,
}

impl Table2D {
    /// Returns the cell at (`row`, `col`), if both keys exist.
    pub fn lookup(&self, row: &str, col: &str) -> Option<&Value> {
        let pos = self.columns.iter().position(|c| c == col)?;
        self.data.get(row).and_then(|cells| cells.get(pos))
    }

    pub fn row_keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Row index, column index and result names.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        [
            self.rowindex.as_str(),
            self.colindex.as_str(),
            self.result.as_str(),
        ]
        .into_iter()
    }
}
