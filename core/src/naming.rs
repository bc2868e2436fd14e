//! Name templates for part instances.
//!
//! A naming element pairs a printf-style template with the parameters that
//! fill its placeholders, e.g. `template: "Hex screw %s x %g"` and
//! `substitute: [key, l]`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_yaml::Value as Yaml;

use crate::Value;
use crate::error::{CollectError, ParsingError, Result};
use crate::schema::{check_schema, expect_mapping, expect_str, expect_str_list};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Display,
    Integer,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder(Conversion),
}

/// Template for the display name of a part instance.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use bolts_core::{Naming, Value};
///
/// let yaml = serde_yaml::from_str("template: Hex screw %s x %g\nsubstitute: [key, l]").unwrap();
/// let naming = Naming::parse(&yaml).unwrap();
///
/// let mut values = BTreeMap::new();
/// values.insert("key".to_string(), Value::from("M3"));
/// values.insert("l".to_string(), Value::Number(20.0));
/// assert_eq!(naming.get_name(&values).unwrap(), "Hex screw M3 x 20");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Naming {
    pub template: String,
    pub substitute: Vec<String>,
    #[serde(skip)]
    segments: Vec<Segment>,
}

impl Naming {
    /// Parses `{template, substitute?}`.
    ///
    /// Fails if the template contains an unsupported conversion or the
    /// number of placeholders differs from the number of substitutes.
    pub fn parse(value: &Yaml) -> Result<Self> {
        let map = expect_mapping(value, "naming")?;
        check_schema(map, "naming", &["template"], &["substitute"])?;

        let template = expect_str(&map["template"], "naming", "template")?;
        let substitute = match map.get("substitute") {
            Some(list) => expect_str_list(list, "naming", "substitute")?,
            None => Vec::new(),
        };

        let segments = parse_template(&template)?;
        let placeholders = segments
            .iter()
            .filter(|s| matches!(s, Segment::Placeholder(_)))
            .count();
        if placeholders != substitute.len() {
            return Err(ParsingError::malformed(
                "naming",
                format!(
                    "template has {placeholders} placeholder(s) but {} substitute(s)",
                    substitute.len()
                ),
            ));
        }

        Ok(Self {
            template,
            substitute,
            segments,
        })
    }

    /// Renders the name from collected parameter values.
    pub fn get_name(
        &self,
        params: &BTreeMap<String, Value>,
    ) -> std::result::Result<String, CollectError> {
        let mut substitutes = self.substitute.iter();
        let mut name = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => name.push_str(text),
                Segment::Placeholder(conversion) => {
                    let Some(param) = substitutes.next() else {
                        break;
                    };
                    let value = params
                        .get(param)
                        .ok_or_else(|| CollectError::Uncollected(param.clone()))?;
                    name.push_str(&render(value, *conversion));
                }
            }
        }

        Ok(name)
    }
}

fn render(value: &Value, conversion: Conversion) -> String {
    match (conversion, value) {
        (Conversion::Integer, Value::Number(n)) => format!("{}", n.trunc() as i64),
        (Conversion::Display, Value::Number(n)) => float_str(*n),
        _ => value.to_string(),
    }
}

/// A number as `%s` shows a float: always with a fraction or an exponent,
/// switching to `1e+16` notation outside `[1e-4, 1e16)`.
fn float_str(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        let inf = if n > 0.0 { "inf" } else { "-inf" };
        return inf.to_string();
    }

    let magnitude = n.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{n:e}");
        if let Some((mantissa, exp)) = sci.split_once('e') {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            return format!("{mantissa}e{sign}{:02}", exp.unsigned_abs());
        }
        return sci;
    }

    let plain = n.to_string();
    if plain.contains('.') {
        plain
    } else {
        plain + ".0"
    }
}

fn parse_template(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            text.push(c);
            continue;
        }
        let conversion = match chars.next() {
            Some('%') => {
                text.push('%');
                continue;
            }
            Some('s') => Conversion::Display,
            Some('d') => Conversion::Integer,
            Some('g') => Conversion::General,
            other => {
                let other = other.map(String::from).unwrap_or_default();
                return Err(ParsingError::malformed(
                    "naming",
                    format!("unsupported conversion %{other}"),
                ));
            }
        };
        if !text.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut text)));
        }
        segments.push(Segment::Placeholder(conversion));
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}
