//! Core types shared across the compiler.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON:API version written into every document.
pub const JSONAPI_VERSION: &str = "1.0";

/// Fallback identifier attribute.
pub const ATTR_IDENTIFIER: &str = "id";

/// Request keys consumed by the compiler.
pub const INCLUDES_KEY: &str = "includes";
pub const FILTER_PREFIX: &str = "filter";
pub const PAGE_NUMBER_KEY: &str = "page[number]";
pub const PAGE_SIZE_KEY: &str = "page[size]";
pub const PAGE_SORT_KEY: &str = "page[sort]";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns true for values treated as "empty": null, false, zero,
/// the empty string, and empty arrays or objects.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Renders a scalar as it appears in a URL or a dedup key.
///
/// Strings are used verbatim; other values use their JSON encoding.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Converts `snake_case` or `kebab-case` to `camelCase`.
pub fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, word) in key
        .split(|c| c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Converts `camelCase` to `snake_case`.
///
/// An underscore is inserted before every run of uppercase letters that does
/// not start the string, then the whole key is lowercased.
pub fn uncamelcase(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_upper = false;
    for (i, c) in key.chars().enumerate() {
        let upper = c.is_uppercase();
        if upper && !prev_upper && i > 0 {
            out.push('_');
        }
        out.extend(c.to_lowercase());
        prev_upper = upper;
    }
    out
}

/// Options controlling document compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Attribute used as the identifier when a descriptor declares no id properties.
    pub id_field: String,
    /// Rename `snake_case` attribute keys (other than `*_id` keys) to `camelCase`.
    pub camelize_attributes: bool,
    /// Wrap a single primary resource in an array.
    pub single_as_array: bool,
    /// Attach a top-level `debug` object with compile timings.
    pub debug_timings: bool,
    /// Page size used when the request carries no `page[size]`.
    pub default_page_size: u64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            id_field: ATTR_IDENTIFIER.to_string(),
            camelize_attributes: false,
            single_as_array: false,
            debug_timings: false,
            default_page_size: 10,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback identifier field.
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Enable or disable attribute key camelization.
    pub fn camelize_attributes(mut self, camelize: bool) -> Self {
        self.camelize_attributes = camelize;
        self
    }

    /// Wrap single primary resources in an array.
    pub fn single_as_array(mut self, wrap: bool) -> Self {
        self.single_as_array = wrap;
        self
    }

    /// Enable or disable the `debug` timing block.
    pub fn debug_timings(mut self, enabled: bool) -> Self {
        self.debug_timings = enabled;
        self
    }

    /// Set the default page size.
    pub fn default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_values() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!(false)));
        assert!(is_empty_value(&json!(0)));
        assert!(is_empty_value(&json!(0.0)));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));

        assert!(!is_empty_value(&json!(true)));
        assert!(!is_empty_value(&json!(7)));
        assert!(!is_empty_value(&json!("0")));
        assert!(!is_empty_value(&json!([0])));
    }

    #[test]
    fn scalar_rendering() {
        assert_eq!(scalar_to_string(&json!("abc")), "abc");
        assert_eq!(scalar_to_string(&json!(42)), "42");
        assert_eq!(scalar_to_string(&json!(true)), "true");
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(camel_case("created_at"), "createdAt");
        assert_eq!(camel_case("first_name_initial"), "firstNameInitial");
        assert_eq!(camel_case("kebab-case"), "kebabCase");
        assert_eq!(camel_case("title"), "title");
        assert_eq!(camel_case("_leading"), "leading");
    }

    #[test]
    fn uncamelcase_conversion() {
        assert_eq!(uncamelcase("createdAt"), "created_at");
        assert_eq!(uncamelcase("title"), "title");
        assert_eq!(uncamelcase("CreatedAt"), "created_at");
        assert_eq!(uncamelcase("authorID"), "author_id");
    }

    #[test]
    fn compile_options_defaults() {
        let opts = CompileOptions::default();
        assert_eq!(opts.id_field, "id");
        assert!(!opts.camelize_attributes);
        assert_eq!(opts.default_page_size, 10);
    }

    #[test]
    fn compile_options_deserialize_partial() {
        let opts: CompileOptions =
            serde_json::from_value(json!({ "camelize_attributes": true })).unwrap();
        assert!(opts.camelize_attributes);
        assert_eq!(opts.id_field, "id");
    }
}
