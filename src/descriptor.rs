//! Resource descriptors: per-type mapping configuration.
//!
//! A [`ResourceDescriptor`] is pure data. It names the JSON:API `type`, the
//! attributes to hide or rename, the identifier fields, the link templates,
//! the relationships that may be included, and the meta accessors to call.
//!
//! # Example
//!
//! ```
//! use jsonapi_transformer::{RelationshipDef, ResourceDescriptor, UrlTemplate};
//!
//! let articles = ResourceDescriptor::new("articles")
//!     .hide(["secret"])
//!     .alias_property("created_at", "created")
//!     .id_properties(["id"])
//!     .url(UrlTemplate::new("self", "articles.show").bind("id", "id"))
//!     .relationship("author", RelationshipDef::new("people"))
//!     .meta_accessor("stats");
//!
//! assert_eq!(articles.alias, "articles");
//! assert!(articles.is_hidden("secret"));
//! ```

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP method a link template points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Named, lazily-resolved reference to another descriptor in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorRef(String);

impl DescriptorRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DescriptorRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One named link of a resource object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlTemplate {
    /// Key under the resource's `links` object.
    pub name: String,
    /// Route passed to the URL resolver.
    pub route: String,
    #[serde(default)]
    pub method: Method,
    /// URL parameter name -> attribute key.
    #[serde(default)]
    pub params: IndexMap<String, String>,
}

impl UrlTemplate {
    pub fn new(name: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            route: route.into(),
            method: Method::Get,
            params: IndexMap::new(),
        }
    }

    /// Bind a URL parameter to an attribute key.
    pub fn bind(mut self, param: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.params.insert(param.into(), attribute.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// A relationship a resource may expose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDef {
    /// Descriptor used for the related models.
    pub resource: DescriptorRef,
    /// Expand this relationship even when the request does not ask for it.
    #[serde(default)]
    pub autowired: bool,
    /// Static members emitted as the relationship object's `meta`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra_fields: Map<String, Value>,
}

impl RelationshipDef {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: DescriptorRef::new(resource),
            autowired: false,
            extra_fields: Map::new(),
        }
    }

    pub fn autowired(mut self, autowired: bool) -> Self {
        self.autowired = autowired;
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_fields.insert(key.into(), value);
        self
    }
}

/// Declarative configuration for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// The JSON:API `type` value.
    #[serde(default)]
    pub alias: String,
    /// Source attribute -> output attribute.
    #[serde(default)]
    pub aliased_properties: IndexMap<String, String>,
    #[serde(default)]
    pub hide_properties: BTreeSet<String>,
    /// Attributes promoted into the resource `id`.
    #[serde(default)]
    pub id_properties: Vec<String>,
    #[serde(default)]
    pub url_templates: Vec<UrlTemplate>,
    #[serde(default)]
    pub relationships: IndexMap<String, RelationshipDef>,
    /// Zero-argument model accessors merged into `meta`.
    #[serde(default)]
    pub meta_accessors: Vec<String>,
}

impl ResourceDescriptor {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            ..Self::default()
        }
    }

    pub fn hide<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hide_properties
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn alias_property(mut self, source: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliased_properties.insert(source.into(), alias.into());
        self
    }

    pub fn id_properties<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_properties = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn url(mut self, template: UrlTemplate) -> Self {
        self.url_templates.push(template);
        self
    }

    pub fn relationship(mut self, name: impl Into<String>, def: RelationshipDef) -> Self {
        self.relationships.insert(name.into(), def);
        self
    }

    pub fn meta_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.meta_accessors.push(accessor.into());
        self
    }

    pub fn is_hidden(&self, field: &str) -> bool {
        self.hide_properties.contains(field)
    }

    /// Relationships flagged `autowired`, in declaration order.
    pub fn autowired(&self) -> impl Iterator<Item = (&String, &RelationshipDef)> {
        self.relationships.iter().filter(|(_, def)| def.autowired)
    }
}
