//! Error types for parsing and resolving parameter declarations.
//!
//! Every failure is fatal to the structure being built: a parameter set is
//! either constructed completely or not at all.

use thiserror::Error;

use crate::ParameterType;

/// Shape violations reported by [`check_schema`](crate::check_schema).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A key is neither mandatory nor optional for this element.
    #[error("unknown field {field} in {element}")]
    UnknownField { element: String, field: String },
    /// Mandatory keys that were not present.
    #[error("missing mandatory field(s) {} in {element}", fields.join(", "))]
    MissingField { element: String, fields: Vec<String> },
}

/// Cell and index problems found while normalizing tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("cannot parse '{raw}' as a number for parameter {param}")]
    InvalidNumber { param: String, raw: String },

    #[error("negative length in table: {value} for parameter {param}")]
    NegativeLength { param: String, value: f64 },

    #[error("cannot parse '{raw}' as a bool for parameter {param}, expected True or False")]
    InvalidBool { param: String, raw: String },

    #[error("table cell for parameter {param} is not a scalar")]
    NonScalar { param: String },

    #[error("table index {param} has type {found}, expected Table Index")]
    IndexNotTableIndex { param: String, found: ParameterType },

    #[error("row {key} has {found} values, expected {expected}")]
    RowLength {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("rowindex and colindex are both {0}, use an ordinary table instead")]
    SameIndex(String),
}

/// Errors raised while constructing or combining a
/// [`ParameterSet`](crate::ParameterSet).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParsingError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Value(#[from] ValueError),

    /// Structurally wrong YAML (e.g. a list where a mapping is expected).
    #[error("malformed {element}: {message}")]
    Malformed { element: String, message: String },

    #[error("unknown parameter in {section}: {name}")]
    UnknownParameter { section: String, name: String },

    #[error("unknown type in types: {0}")]
    UnknownType(String),

    #[error("default value given for non-free parameter {0}")]
    NonFreeDefault(String),

    #[error("invalid common combination: {0}")]
    Common(String),

    #[error("incompatible types for parameter {name}: {left} and {right}")]
    IncompatibleType {
        name: String,
        left: ParameterType,
        right: ParameterType,
    },

    #[error("incompatible default values for parameter {name}: {left} and {right}")]
    IncompatibleDefault {
        name: String,
        left: String,
        right: String,
    },

    #[error("incompatible descriptions for parameter {name}: '{left}' and '{right}'")]
    IncompatibleDescription {
        name: String,
        left: String,
        right: String,
    },
}

impl ParsingError {
    pub(crate) fn malformed(element: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            element: element.to_string(),
            message: message.into(),
        }
    }
}

/// Lookup failures during [`ParameterSet::collect`](crate::ParameterSet::collect).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectError {
    /// A table index has no value in the environment being collected.
    #[error("no value for table index {0}")]
    MissingValue(String),

    #[error("key {key} not found in table indexed by {index}")]
    MissingRow { index: String, key: String },

    #[error("column {key} not found in table indexed by {index}")]
    MissingColumn { index: String, key: String },

    #[error("parameter value not collected: {0}")]
    Uncollected(String),
}

/// Convenience alias for results with [`ParsingError`].
pub type Result<T> = std::result::Result<T, ParsingError>;
