//! YAML document reading and writing

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::yaml::diagnostics::{YamlError, YamlSyntaxError};

/// Parse YAML content into a typed value with source-annotated errors
pub fn parse_yaml<T: DeserializeOwned>(content: &str, filename: &str) -> Result<T, YamlError> {
    serde_yml::from_str(content).map_err(|e| {
        YamlError::Syntax(YamlSyntaxError::from_serde_error(&e, content, filename))
    })
}

/// Parse YAML from a file path
pub fn parse_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T, YamlError> {
    let content = fs::read_to_string(path)?;
    let filename = path.display().to_string();
    parse_yaml(&content, &filename)
}

/// Serialize `value` and replace `path` with it
///
/// The document is written to a sibling temp file and renamed into place,
/// so readers see either the old or the new document, never a partial one.
pub fn write_yaml_file<T: Serialize>(path: &Path, value: &T) -> Result<(), YamlError> {
    let content = serde_yml::to_string(value)
        .map_err(|e| YamlError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("yaml.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spc::SpecLimits;

    #[test]
    fn test_parse_valid_yaml() {
        let yaml = "usl: 2.385\ntarget: 2.38\nlsl: 2.375";
        let spec: SpecLimits = parse_yaml(yaml, "spec.yaml").unwrap();
        assert_eq!(spec, SpecLimits::new(2.385, 2.38, 2.375));
    }

    #[test]
    fn test_parse_invalid_yaml_returns_error() {
        let yaml = "usl: [2.385\n  target";
        let result: Result<SpecLimits, _> = parse_yaml(yaml, "spec.yaml");
        assert!(matches!(result, Err(YamlError::Syntax(_))));
    }

    #[test]
    fn test_write_then_read_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/spec.yaml");
        let spec = SpecLimits::new(1.0, 0.5, 0.1);

        write_yaml_file(&path, &spec).unwrap();
        assert!(!path.with_extension("yaml.tmp").exists());

        let back: SpecLimits = parse_yaml_file(&path).unwrap();
        assert_eq!(back, spec);
    }
}
