//! Registry file validation against an embedded JSON Schema.

use serde_json::{json, Value};

use crate::error::{RegistryError, RegistryIssue};

/// JSON Schema every registry file must satisfy.
pub fn registry_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["resources"],
        "additionalProperties": false,
        "properties": {
            "options": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "id_field": { "type": "string", "minLength": 1 },
                    "camelize_attributes": { "type": "boolean" },
                    "single_as_array": { "type": "boolean" },
                    "debug_timings": { "type": "boolean" },
                    "default_page_size": { "type": "integer", "minimum": 1 }
                }
            },
            "routes": { "$ref": "#/$defs/stringMap" },
            "kinds": { "$ref": "#/$defs/stringMap" },
            "resources": {
                "type": "object",
                "additionalProperties": { "$ref": "#/$defs/resource" }
            }
        },
        "$defs": {
            "stringMap": {
                "type": "object",
                "additionalProperties": { "type": "string" }
            },
            "stringList": {
                "type": "array",
                "items": { "type": "string" }
            },
            "resource": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "alias": { "type": "string" },
                    "aliased_properties": { "$ref": "#/$defs/stringMap" },
                    "hide_properties": { "$ref": "#/$defs/stringList" },
                    "id_properties": { "$ref": "#/$defs/stringList" },
                    "url_templates": {
                        "type": "array",
                        "items": { "$ref": "#/$defs/urlTemplate" }
                    },
                    "relationships": {
                        "type": "object",
                        "additionalProperties": { "$ref": "#/$defs/relationship" }
                    },
                    "meta_accessors": { "$ref": "#/$defs/stringList" }
                }
            },
            "urlTemplate": {
                "type": "object",
                "required": ["name", "route"],
                "additionalProperties": false,
                "properties": {
                    "name": { "type": "string", "minLength": 1 },
                    "route": { "type": "string", "minLength": 1 },
                    "method": { "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"] },
                    "params": { "$ref": "#/$defs/stringMap" }
                }
            },
            "relationship": {
                "type": "object",
                "required": ["resource"],
                "additionalProperties": false,
                "properties": {
                    "resource": { "type": "string", "minLength": 1 },
                    "autowired": { "type": "boolean" },
                    "extra_fields": { "type": "object" }
                }
            }
        }
    })
}

/// Validate a parsed registry document.
///
/// # Errors
///
/// Returns `RegistryError::InvalidRegistry` with every violation found.
pub fn validate_registry(registry: &Value) -> Result<(), RegistryError> {
    let issues = registry_issues(registry)?;
    if issues.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::InvalidRegistry { errors: issues })
    }
}

/// All schema violations in a parsed registry document.
pub fn registry_issues(registry: &Value) -> Result<Vec<RegistryIssue>, RegistryError> {
    let schema = registry_schema();
    let validator =
        jsonschema::validator_for(&schema).map_err(|e| RegistryError::InvalidRegistry {
            errors: vec![RegistryIssue {
                path: String::new(),
                message: e.to_string(),
            }],
        })?;

    Ok(validator
        .iter_errors(registry)
        .map(|e| RegistryIssue {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect())
}
