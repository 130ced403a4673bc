//! Registry and model loading from various sources.
//!
//! Handles loading JSON from files, strings, and HTTP URLs, and turning a
//! registry document into a [`RegistryFile`].

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::descriptor::ResourceDescriptor;
use crate::error::RegistryError;
use crate::links::RouteTable;
use crate::registry::DescriptorRegistry;
use crate::types::CompileOptions;
use crate::validator::validate_registry;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A loaded registry file: descriptors, routes, and compile options.
#[derive(Debug, Clone, Default)]
pub struct RegistryFile {
    pub registry: DescriptorRegistry,
    pub routes: RouteTable,
    pub options: CompileOptions,
}

#[derive(Deserialize)]
struct RawRegistry {
    #[serde(default)]
    options: CompileOptions,
    #[serde(default)]
    routes: IndexMap<String, String>,
    #[serde(default)]
    kinds: IndexMap<String, String>,
    resources: IndexMap<String, ResourceDescriptor>,
}

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `RegistryError::FileNotFound` if the file doesn't exist,
/// or `RegistryError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, RegistryError> {
    if !path.exists() {
        return Err(RegistryError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| RegistryError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_json_str(&content)
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `RegistryError::InvalidJson` if the string isn't valid JSON.
pub fn load_json_str(content: &str) -> Result<Value, RegistryError> {
    serde_json::from_str(content).map_err(|source| RegistryError::InvalidJson { source })
}

/// Load a JSON document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `RegistryError::NetworkError` if the request fails or the
/// response isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_json_url(url: &str) -> Result<Value, RegistryError> {
    let network = |source: reqwest::Error| RegistryError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    // Check for HTTP errors before parsing
    client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a JSON document from a file path or URL.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_json_auto(source: &str) -> Result<Value, RegistryError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_json_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(RegistryError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_json(Path::new(source))
    }
}

/// Validate and build a registry from a parsed document.
///
/// # Errors
///
/// Returns `RegistryError::InvalidRegistry` on schema violations.
pub fn registry_from_value(value: Value) -> Result<RegistryFile, RegistryError> {
    validate_registry(&value)?;
    let raw: RawRegistry =
        serde_json::from_value(value).map_err(|source| RegistryError::InvalidJson { source })?;

    let mut registry = DescriptorRegistry::new();
    for (name, descriptor) in raw.resources {
        registry.register(name, descriptor);
    }
    for (kind, name) in raw.kinds {
        registry.bind_kind(kind, name);
    }
    debug!(
        resources = registry.len(),
        routes = raw.routes.len(),
        "registry loaded"
    );

    Ok(RegistryFile {
        registry,
        routes: RouteTable::from(raw.routes),
        options: raw.options,
    })
}

/// Load a registry from a file path or URL.
///
/// # Errors
///
/// Propagates load, parse, and validation errors.
pub fn load_registry(source: &str) -> Result<RegistryFile, RegistryError> {
    registry_from_value(load_json_auto(source)?)
}

/// Load a registry from a JSON string.
///
/// # Errors
///
/// Propagates parse and validation errors.
pub fn load_registry_str(content: &str) -> Result<RegistryFile, RegistryError> {
    registry_from_value(load_json_str(content)?)
}
