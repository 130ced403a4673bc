//! Attribute shaping: hide, rename, and sparse-fieldset filtering.
//!
//! Steps, in order:
//!
//! 1. Identifier fields and every key in `hide_properties` are removed.
//! 2. Each `source -> alias` rename is applied when `source` holds a
//!    non-empty value. Empty values (null, false, 0, "", [], {}) are left
//!    in place under their source name.
//! 3. Optionally, `snake_case` keys are camelized.
//! 4. If the request carries `filter.<alias>`, the output is rebuilt from the
//!    raw attributes restricted to exactly the listed fields. This replaces
//!    steps 2-3; hidden and identifier fields still never appear.
//!
//! Link bindings read from the result of steps 1-3, taken before the
//! sparse fieldset is applied.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::context::RequestContext;
use crate::descriptor::ResourceDescriptor;
use crate::types::{camel_case, is_empty_value, CompileOptions};

/// Output of [`shape_attributes`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapedAttributes {
    /// Final `attributes` member.
    pub attributes: Map<String, Value>,
    /// Hidden/renamed attributes before fieldset filtering.
    pub unfiltered: Map<String, Value>,
}

/// Fields promoted into the resource identifier.
pub fn identifier_fields<'a>(
    descriptor: &'a ResourceDescriptor,
    options: &'a CompileOptions,
) -> Vec<&'a str> {
    if descriptor.id_properties.is_empty() {
        vec![options.id_field.as_str()]
    } else {
        descriptor.id_properties.iter().map(String::as_str).collect()
    }
}

/// Shape one model's raw attributes for the `attributes` member.
pub fn shape_attributes(
    raw: &Map<String, Value>,
    descriptor: &ResourceDescriptor,
    ctx: &dyn RequestContext,
    options: &CompileOptions,
) -> ShapedAttributes {
    let id_fields = identifier_fields(descriptor, options);
    let excluded = |key: &str| descriptor.is_hidden(key) || id_fields.contains(&key);

    let mut shaped: Map<String, Value> = raw
        .iter()
        .filter(|(key, _)| !excluded(key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for (source, alias) in &descriptor.aliased_properties {
        let non_empty = shaped.get(source).is_some_and(|v| !is_empty_value(v));
        if !non_empty {
            continue;
        }
        if let Some(value) = shaped.remove(source) {
            shaped.insert(alias.clone(), value);
        }
    }

    if options.camelize_attributes {
        shaped = camelize_keys(shaped);
    }

    let attributes = match ctx.fieldset(&descriptor.alias) {
        Some(fields) => {
            let wanted: HashSet<&str> = fields.into_iter().collect();
            raw.iter()
                .filter(|(key, _)| wanted.contains(key.as_str()) && !excluded(key.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        }
        None => shaped.clone(),
    };

    ShapedAttributes {
        attributes,
        unfiltered: shaped,
    }
}

/// Keys containing `_` (but not `_id`) become camelCase.
fn camelize_keys(attributes: Map<String, Value>) -> Map<String, Value> {
    attributes
        .into_iter()
        .map(|(key, value)| {
            if key.contains('_') && !key.contains("_id") {
                (camel_case(&key), value)
            } else {
                (key, value)
            }
        })
        .collect()
}
