use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::Rubric;
use crate::error::EngineError;

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    Rubric(EngineError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(f, "failed to read standard {}: {}", path.display(), source)
            }
            LoadError::Json(err) => write!(f, "standard is not valid JSON: {}", err),
            LoadError::Rubric(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Json(err) => Some(err),
            LoadError::Rubric(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<EngineError> for LoadError {
    fn from(err: EngineError) -> Self {
        Self::Rubric(err)
    }
}

/// Advant standard shipped with the crate, used when no standard path is configured.
pub const BUNDLED_STANDARD: &str = include_str!("../../standards/advant_standard.json");

impl Rubric {
    pub fn bundled() -> Result<Self, LoadError> {
        Self::from_json_str(BUNDLED_STANDARD)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let document: serde_json::Value = serde_json::from_reader(reader)?;
        Ok(Self::from_value(document)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, LoadError> {
        let document: serde_json::Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn bundled_standard_parses() {
        let rubric = Rubric::bundled().expect("bundled standard is valid");
        assert_eq!(rubric.categories.len(), 3);
        assert_eq!(rubric.max_total(), 23.0);
        assert!(rubric.credit("SF4").is_some());
    }

    #[test]
    fn missing_file_reports_path() {
        let error = Rubric::from_path("does/not/exist.json").expect_err("file is missing");
        assert!(error.to_string().contains("does/not/exist.json"));
    }

    #[test]
    fn invalid_json_is_reported_separately_from_rubric_errors() {
        let error = Rubric::from_reader(Cursor::new("{ not json")).expect_err("bad json");
        assert!(matches!(error, LoadError::Json(_)));

        let error = Rubric::from_json_str(r#"{"categories": []}"#).expect_err("bad rubric");
        assert!(matches!(
            error,
            LoadError::Rubric(EngineError::MalformedRubric(_))
        ));
    }
}
