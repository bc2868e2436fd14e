//! Parameter types and values.
//!
//! Parameters are typed with one of six [`ParameterType`]s. Raw YAML cells are
//! turned into [`Value`]s by [`ParameterType::normalize`], which is where unit
//! and range checks happen.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::Value as Yaml;

use crate::error::{ParsingError, ValueError};
use crate::schema::scalar_to_string;

/// Type of a parameter.
///
/// Serialized as the label used in `.blt` files, e.g. `"Length (mm)"`.
///
/// # Examples
///
/// ```
/// use bolts_core::{ParameterType, Value};
///
/// let ty: ParameterType = "Table Index".parse().unwrap();
/// assert_eq!(ty, ParameterType::TableIndex);
/// assert_eq!(ParameterType::LengthMm.default_value(), Value::Number(10.0));
/// assert!("Length (cm)".parse::<ParameterType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ParameterType {
    /// Length in millimetres (the type of every undeclared parameter).
    #[default]
    #[serde(rename = "Length (mm)")]
    LengthMm,
    #[serde(rename = "Length (in)")]
    LengthInch,
    #[serde(rename = "Number")]
    Number,
    #[serde(rename = "Bool")]
    Bool,
    /// Discrete key into one or more tables.
    #[serde(rename = "Table Index")]
    TableIndex,
    #[serde(rename = "String")]
    String,
}

impl ParameterType {
    pub const ALL: [ParameterType; 6] = [
        ParameterType::LengthMm,
        ParameterType::LengthInch,
        ParameterType::Number,
        ParameterType::Bool,
        ParameterType::TableIndex,
        ParameterType::String,
    ];

    /// Label as written in `.blt` files.
    pub fn label(self) -> &'static str {
        match self {
            ParameterType::LengthMm => "Length (mm)",
            ParameterType::LengthInch => "Length (in)",
            ParameterType::Number => "Number",
            ParameterType::Bool => "Bool",
            ParameterType::TableIndex => "Table Index",
            ParameterType::String => "String",
        }
    }

    /// Default value of a free parameter of this type.
    pub fn default_value(self) -> Value {
        match self {
            ParameterType::LengthMm => Value::Number(10.0),
            ParameterType::LengthInch => Value::Number(1.0),
            ParameterType::Number => Value::Number(1.0),
            ParameterType::Bool => Value::Bool(false),
            ParameterType::TableIndex | ParameterType::String => Value::Str(String::new()),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ParameterType::LengthMm | ParameterType::LengthInch | ParameterType::Number
        )
    }

    pub fn is_length(self) -> bool {
        matches!(self, ParameterType::LengthMm | ParameterType::LengthInch)
    }

    /// Bool and Table Index parameters have a finite value domain.
    pub fn is_discrete(self) -> bool {
        matches!(self, ParameterType::Bool | ParameterType::TableIndex)
    }

    /// Converts a raw cell into a value of this type.
    ///
    /// The literal string `"None"` (or a YAML null) is the absent value for
    /// every type. Numbers may be given as YAML numbers or strings; lengths
    /// must not be negative. Bools accept the strings `True`/`False` and
    /// YAML booleans, whatever their spelling.
    ///
    /// # Examples
    ///
    /// ```
    /// use bolts_core::{ParameterType, Value};
    /// use serde_yaml::Value as Yaml;
    ///
    /// let v = ParameterType::LengthMm.normalize("d", &Yaml::from("12.5")).unwrap();
    /// assert_eq!(v, Value::Number(12.5));
    /// assert!(ParameterType::LengthMm.normalize("d", &Yaml::from("-5")).is_err());
    /// assert_eq!(ParameterType::Number.normalize("n", &Yaml::from("None")).unwrap(), Value::None);
    /// ```
    pub fn normalize(self, param: &str, raw: &Yaml) -> Result<Value, ValueError> {
        let raw = match raw {
            Yaml::Tagged(tagged) => &tagged.value,
            other => other,
        };
        match raw {
            Yaml::Null => return Ok(Value::None),
            Yaml::String(s) if s == "None" => return Ok(Value::None),
            Yaml::Sequence(_) | Yaml::Mapping(_) => {
                return Err(ValueError::NonScalar {
                    param: param.to_string(),
                });
            }
            _ => {}
        }

        match self {
            ParameterType::LengthMm | ParameterType::LengthInch | ParameterType::Number => {
                let number = match raw {
                    Yaml::Number(n) => n.as_f64(),
                    Yaml::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .filter(|n| !n.is_nan())
                .ok_or_else(|| ValueError::InvalidNumber {
                    param: param.to_string(),
                    raw: scalar_to_string(raw),
                })?;
                if self.is_length() && number < 0.0 {
                    return Err(ValueError::NegativeLength {
                        param: param.to_string(),
                        value: number,
                    });
                }
                Ok(Value::Number(number))
            }
            ParameterType::Bool => match raw {
                Yaml::Bool(b) => Ok(Value::Bool(*b)),
                Yaml::String(s) if s == "True" => Ok(Value::Bool(true)),
                Yaml::String(s) if s == "False" => Ok(Value::Bool(false)),
                _ => Err(ValueError::InvalidBool {
                    param: param.to_string(),
                    raw: scalar_to_string(raw),
                }),
            },
            ParameterType::TableIndex | ParameterType::String => {
                Ok(Value::Str(scalar_to_string(raw)))
            }
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ParameterType {
    type Err = ParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParameterType::ALL
            .into_iter()
            .find(|ty| ty.label() == s)
            .ok_or_else(|| ParsingError::UnknownType(s.to_string()))
    }
}

/// A concrete parameter value.
///
/// Serializes untagged: numbers, bools, strings, and `null` for the absent
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Absent value, written `None` in tables.
    #[default]
    None,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl Value {
    /// Converts a YAML scalar without a declared type.
    pub fn from_yaml(raw: &Yaml) -> Value {
        match raw {
            Yaml::Null => Value::None,
            Yaml::Bool(b) => Value::Bool(*b),
            Yaml::Number(n) => n.as_f64().map_or(Value::None, Value::Number),
            Yaml::String(s) if s == "None" => Value::None,
            Yaml::String(s) => Value::Str(s.clone()),
            Yaml::Tagged(tagged) => Value::from_yaml(&tagged.value),
            other => Value::Str(scalar_to_string(other)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
