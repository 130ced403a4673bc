//! Error types for document compilation and registry loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while compiling a document.
///
/// Configuration gaps (unknown include segments, unresolvable descriptors)
/// and missing data (absent fields or relations) are never errors: they are
/// omitted from the output. Only structural misuse and collaborator failures
/// surface here.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid model: expected object, got {actual}")]
    InvalidModel { actual: String },

    #[error(transparent)]
    EagerLoad(#[from] StoreError),

    #[error("failed to resolve url for route '{route}': {message}")]
    UrlResolution { route: String, message: String },
}

impl CompileError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::InvalidModel { .. } => 2,
            CompileError::EagerLoad(_) | CompileError::UrlResolution { .. } => 3,
        }
    }
}

/// Failure reported by a model store while eager-loading relation paths.
#[derive(Debug, Error)]
#[error("failed to load relation path '{path}': {message}")]
pub struct StoreError {
    pub path: String,
    pub message: String,
}

impl StoreError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors while loading a descriptor registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid registry with {} error(s)", errors.len())]
    InvalidRegistry { errors: Vec<RegistryIssue> },
}

impl RegistryError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RegistryError::FileNotFound { .. } | RegistryError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            RegistryError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Single registry schema violation with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RegistryIssue {
    /// JSON Pointer (RFC 6901) to the offending value.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for RegistryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_exit_codes() {
        let err = CompileError::InvalidModel {
            actual: "string".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = CompileError::from(StoreError::new("author", "connection reset"));
        assert_eq!(err.exit_code(), 3);

        let err = CompileError::UrlResolution {
            route: "articles.show".into(),
            message: "unknown route".into(),
        };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn registry_error_exit_codes() {
        let err = RegistryError::FileNotFound {
            path: PathBuf::from("registry.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = RegistryError::InvalidRegistry { errors: vec![] };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::new("author.profile", "table missing");
        assert_eq!(
            err.to_string(),
            "failed to load relation path 'author.profile': table missing"
        );
    }

    #[test]
    fn registry_issue_display() {
        let issue = RegistryIssue {
            path: "/resources/articles/hide_properties".into(),
            message: "expected array".into(),
        };
        assert_eq!(
            issue.to_string(),
            "/resources/articles/hide_properties: expected array"
        );
    }
}
