//! Secret references in `config.toml`.
//!
//! The portal password (and user id) may point outside the file:
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and keeps the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is used verbatim

use std::process::Command;

use thiserror::Error;

const PASS_PREFIX: &str = "pass::";
const ENV_PREFIX: &str = "env::";

/// A secret reference that could not be resolved.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to run `pass show {path}`: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`pass show {path}` failed ({status}): {stderr}")]
    Pass {
        path: String,
        status: String,
        stderr: String,
    },

    #[error("`pass show {0}` produced no output")]
    Empty(String),

    #[error("environment variable `{0}` is not set")]
    MissingEnv(String),
}

/// Returns true if `value` is a `pass::` or `env::` reference.
pub fn is_reference(value: &str) -> bool {
    value.starts_with(PASS_PREFIX) || value.starts_with(ENV_PREFIX)
}

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, SecretError> {
    if let Some(path) = value.strip_prefix(PASS_PREFIX) {
        from_pass(path)
    } else if let Some(var) = value.strip_prefix(ENV_PREFIX) {
        std::env::var(var).map_err(|_| SecretError::MissingEnv(var.to_string()))
    } else {
        Ok(value.to_string())
    }
}

fn from_pass(path: &str) -> Result<String, SecretError> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|source| SecretError::Spawn {
            path: path.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SecretError::Pass {
            path: path.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SecretError::Empty(path.to_string()))
}
