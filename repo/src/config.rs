//! Options controlling how a repository is loaded.
//!
//! # Example YAML
//!
//! ```yaml
//! openscad: true
//! parallel: false
//! ```

use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Repository loading options.
///
/// Missing keys take their default value.
///
/// # Examples
///
/// ```
/// # use bolts_repo::LoadOptions;
/// let options = LoadOptions::default();
/// assert!(options.openscad);
/// assert!(options.parallel);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadOptions {
    /// Read the OpenSCAD base files under `openscad/`.
    pub openscad: bool,
    /// Parse collection files on the rayon thread pool.
    pub parallel: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            openscad: true,
            parallel: true,
        }
    }
}

impl LoadOptions {
    /// Loads options from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::RepositoryError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::RepositoryError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let options = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "parallel: false").unwrap();

        let options = LoadOptions::load(file.path()).unwrap();
        assert!(options.openscad);
        assert!(!options.parallel);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "freecad: true").unwrap();

        assert!(LoadOptions::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = LoadOptions::load("/nonexistent/options.yml").unwrap_err();
        assert!(matches!(err, crate::RepositoryError::IoError(_)));
    }
}
