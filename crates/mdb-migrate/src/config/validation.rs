//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.destination.trim().is_empty() || config.files.is_empty() {
        return Err(MigrateError::Config(
            "destination uri and at least one source file are required".into(),
        ));
    }

    if let Some(file) = config.files.iter().find(|f| f.as_os_str().is_empty()) {
        return Err(MigrateError::Config(format!(
            "empty source file name: {:?}",
            file
        )));
    }

    for (key, value) in [
        ("text_encoding", &config.text_encoding),
        ("blob_encoding", &config.blob_encoding),
    ] {
        if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
            return Err(MigrateError::Config(format!("{} must not be empty", key)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config {
            destination: "postgres://localhost/target".to_string(),
            files: vec![PathBuf::from("northwind.mdb")],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_destination() {
        let mut config = valid_config();
        config.destination = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_files() {
        let mut config = valid_config();
        config.files.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_encoding_name() {
        let mut config = valid_config();
        config.text_encoding = Some(" ".to_string());
        assert!(validate(&config).is_err());
    }
}
