// Settings document loading shared by the vocalis crates

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

/// Load a settings document from a file.
///
/// The path must not contain `..`; the content is parsed with [`load_str`].
pub fn load_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let shown = path.to_string_lossy();

    if shown.contains("..") {
        return Err(Error::Configuration(format!(
            "Path traversal detected: '{}'",
            shown
        )));
    }

    debug!("Loading settings from {}", shown);
    let content = std::fs::read_to_string(path)?;
    load_str(&content)
}

/// Parse a settings document, trying JSON, then TOML, then YAML.
pub fn load_str<T: DeserializeOwned>(content: &str) -> Result<T> {
    if content.trim().is_empty() {
        return Err(Error::Deserialization("Empty settings document".to_string()));
    }

    if let Ok(value) = serde_json::from_str::<T>(content) {
        return Ok(value);
    }

    if let Ok(value) = toml::from_str::<T>(content) {
        return Ok(value);
    }

    // YAML last: it accepts almost anything, so its error is the one we report
    serde_yaml::from_str::<T>(content)
        .map_err(|e| Error::Deserialization(format!("Unknown settings format: {}", e)))
}

/// Read an environment variable and parse it, ignoring unset or malformed values.
pub fn env_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        ratio: f64,
    }

    #[test]
    fn test_load_json() {
        let sample: Sample = load_str(r#"{"name": "a", "ratio": 1.5}"#).unwrap();
        assert_eq!(sample, Sample { name: "a".to_string(), ratio: 1.5 });
    }

    #[test]
    fn test_load_toml() {
        let sample: Sample = load_str("name = \"b\"\nratio = 0.5\n").unwrap();
        assert_eq!(sample.name, "b");
    }

    #[test]
    fn test_load_yaml() {
        let sample: Sample = load_str("name: c\nratio: 2.0\n").unwrap();
        assert_eq!(sample.ratio, 2.0);
    }

    #[test]
    fn test_load_empty_rejected() {
        let result: Result<Sample> = load_str("   ");
        assert!(matches!(result, Err(Error::Deserialization(_))));
    }

    #[test]
    fn test_load_file_rejects_traversal() {
        let result: Result<Sample> = load_file("../secrets.toml");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_load_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"name": "file", "ratio": 3.0}"#).unwrap();

        let sample: Sample = load_file(&path).unwrap();
        assert_eq!(sample.name, "file");
    }
}
