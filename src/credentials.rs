//! Validation of service account credentials handed to the facade.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{DriveError, Result};
use crate::models::ServiceAccountCredentials;

/// Where the service account key comes from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Path to a service account JSON key file.
    Path(PathBuf),
    /// Key material already loaded as JSON.
    Inline(Value),
    /// Key material already deserialized.
    Parsed(ServiceAccountCredentials),
}

impl From<PathBuf> for CredentialSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&std::path::Path> for CredentialSource {
    fn from(path: &std::path::Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for CredentialSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Value> for CredentialSource {
    fn from(value: Value) -> Self {
        Self::Inline(value)
    }
}

impl From<ServiceAccountCredentials> for CredentialSource {
    fn from(credentials: ServiceAccountCredentials) -> Self {
        Self::Parsed(credentials)
    }
}

impl CredentialSource {
    /// Resolve the source into validated credentials.
    ///
    /// Every failure, whatever its cause, is reported as
    /// [`DriveError::InvalidCredential`].
    pub fn validate(self) -> Result<ServiceAccountCredentials> {
        match self {
            Self::Path(path) => {
                if path.as_os_str().is_empty() {
                    return Err(invalid("empty credential path"));
                }
                if !path.is_file() {
                    return Err(invalid(format!("{} does not exist", path.display())));
                }
                let content = fs::read_to_string(&path)
                    .map_err(|e| invalid(format!("{}: {}", path.display(), e)))?;
                let value: Value = serde_json::from_str(&content)
                    .map_err(|e| invalid(format!("{}: {}", path.display(), e)))?;
                from_value(value)
            }
            Self::Inline(value) => from_value(value),
            Self::Parsed(credentials) => check_fields(credentials),
        }
    }
}

fn from_value(value: Value) -> Result<ServiceAccountCredentials> {
    match &value {
        Value::Object(map) if !map.is_empty() => {}
        Value::Object(_) => return Err(invalid("empty credential object")),
        Value::Null => return Err(invalid("no credential supplied")),
        _ => return Err(invalid("credential must be a JSON object")),
    }
    let credentials: ServiceAccountCredentials =
        serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
    check_fields(credentials)
}

fn check_fields(credentials: ServiceAccountCredentials) -> Result<ServiceAccountCredentials> {
    if credentials.client_email.trim().is_empty() {
        return Err(invalid("client_email is empty"));
    }
    if credentials.private_key.trim().is_empty() {
        return Err(invalid("private_key is empty"));
    }
    Ok(credentials)
}

fn invalid(reason: impl Into<String>) -> DriveError {
    DriveError::InvalidCredential(reason.into())
}
