//! YAML parsing and validation of `tablestack.yaml`.
//!
//! Structural checks only: version, name, stack ids. Name rules that depend
//! on resolved values are checked after construction by `synth::validate_app`.

use super::types::*;
use crate::error::{Error, Result, ValidationError};
use std::path::Path;

/// Parse a tablestack.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "read config");
    parse_config(&content)
}

/// Parse a tablestack.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<AppConfig> {
    Ok(serde_yaml_ng::from_str(yaml)?)
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &AppConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != CONFIG_VERSION {
        errors.push(ValidationError::new(format!(
            "version must be \"{}\", got \"{}\"",
            CONFIG_VERSION, config.version
        )));
    }

    if config.name.is_empty() {
        errors.push(ValidationError::new("name must not be empty"));
    }

    if config.stacks.is_empty() {
        errors.push(ValidationError::new("at least one stack must be declared"));
    }

    for (id, stack) in &config.stacks {
        if id.is_empty() {
            errors.push(ValidationError::new("stack id must not be empty"));
        }
        if id.contains(super::construct::PATH_SEP) {
            errors.push(ValidationError::new(format!(
                "stack id '{}' must not contain '{}'",
                id,
                super::construct::PATH_SEP
            )));
        }
        if let Some(ref name) = stack.stack_name {
            if name.is_empty() {
                errors.push(ValidationError::new(format!(
                    "stack '{}' has an empty stack_name",
                    id
                )));
            }
        }
        for key in stack.tags.keys() {
            if key.is_empty() {
                errors.push(ValidationError::new(format!(
                    "stack '{}' has an empty tag key",
                    id
                )));
            }
        }
    }

    errors
}
