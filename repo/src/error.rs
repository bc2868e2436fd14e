//! Error types for repository loading.
//!
//! Errors raised deep inside a collection file are wrapped in
//! [`RepositoryError::Traced`] on their way out, recording which repository,
//! collection, class or base was being read.

use std::fmt;

use bolts_core::{CollectError, ParsingError};
use thiserror::Error;

/// What a [`Trace`] entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKey {
    RepositoryPath,
    Collection,
    Class,
    Base,
}

impl fmt::Display for TraceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TraceKey::RepositoryPath => "Repository path",
            TraceKey::Collection => "Collection",
            TraceKey::Class => "Class",
            TraceKey::Base => "Base",
        })
    }
}

/// Location information attached to an error, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace(Vec<(TraceKey, String)>);

impl Trace {
    pub fn get(&self, key: TraceKey) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Errors that can occur while loading a repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML syntax error.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid parameter, naming or table declaration.
    #[error(transparent)]
    Parsing(#[from] ParsingError),

    /// Parameter lookup failure while resolving a part.
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("old or unknown blt version: {0}")]
    Version(String),

    #[error("malformed repository: {0}")]
    MalformedRepository(String),

    #[error("malformed collection: {0}")]
    MalformedCollection(String),

    #[error("malformed class: {0}")]
    MalformedClass(String),

    #[error("malformed base: {0}")]
    MalformedBase(String),

    #[error("non-unique base for class id: {0}")]
    NonUniqueBase(String),

    #[error("class {class} replaces unknown class {replaced}")]
    UnknownReplacedClass { class: String, replaced: String },

    /// Any of the above with location information.
    #[error("{source}. {trace}")]
    Traced {
        source: Box<RepositoryError>,
        trace: Trace,
    },
}

impl RepositoryError {
    /// Attaches a location to the error.
    pub fn trace(self, key: TraceKey, value: impl Into<String>) -> Self {
        match self {
            RepositoryError::Traced { source, mut trace } => {
                trace.0.push((key, value.into()));
                RepositoryError::Traced { source, trace }
            }
            other => RepositoryError::Traced {
                source: Box::new(other),
                trace: Trace(vec![(key, value.into())]),
            },
        }
    }

    /// The error without location information.
    pub fn root(&self) -> &RepositoryError {
        match self {
            RepositoryError::Traced { source, .. } => source.root(),
            other => other,
        }
    }

    /// Location information, if any was attached.
    pub fn trace_info(&self) -> Option<&Trace> {
        match self {
            RepositoryError::Traced { trace, .. } => Some(trace),
            _ => None,
        }
    }
}

/// Convenience alias for results with [`RepositoryError`].
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Adds [`RepositoryError::trace`] to results.
pub(crate) trait ResultExt<T> {
    fn trace(self, key: TraceKey, value: &str) -> Result<T>;
}

impl<T, E: Into<RepositoryError>> ResultExt<T> for std::result::Result<T, E> {
    fn trace(self, key: TraceKey, value: &str) -> Result<T> {
        self.map_err(|e| e.into().trace(key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_accumulates_innermost_first() {
        let err = RepositoryError::MalformedClass("bad status".into())
            .trace(TraceKey::Class, "hexscrew1")
            .trace(TraceKey::Collection, "hex");

        assert!(matches!(err.root(), RepositoryError::MalformedClass(_)));
        let trace = err.trace_info().unwrap();
        assert_eq!(trace.get(TraceKey::Class), Some("hexscrew1"));
        assert_eq!(trace.get(TraceKey::Collection), Some("hex"));
        assert_eq!(
            err.to_string(),
            "malformed class: bad status. Class: hexscrew1, Collection: hex"
        );
    }

    #[test]
    fn test_parsing_errors_convert() {
        let err: Result<()> =
            Err(ParsingError::UnknownType("Angle".into())).trace(TraceKey::Class, "c");
        let err = err.unwrap_err();
        assert!(matches!(
            err.root(),
            RepositoryError::Parsing(ParsingError::UnknownType(_))
        ));
    }
}
