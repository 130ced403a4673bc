//! Compiled JSON:API documents.
//!
//! [`Document`] and [`ResourceObject`] serialize directly to the response
//! body shape. [`IncludedSet`] is the per-compile dedup map behind the
//! `included` member.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::types::{scalar_to_string, JSONAPI_VERSION};

/// `{type, id}` pair identifying a resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Value,
}

impl ResourceIdentifier {
    pub fn new(kind: impl Into<String>, id: Value) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// Dedup key: `(type, id-as-string)`.
    pub fn key(&self) -> (String, String) {
        (self.kind.clone(), scalar_to_string(&self.id))
    }
}

/// Relationship linkage: one identifier or a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Linkage {
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

impl Linkage {
    /// Union with another linkage. Lists keep first-seen order; anything
    /// else is replaced by `other`.
    pub fn merge(&mut self, other: Linkage) {
        match (self, other) {
            (Linkage::Many(existing), Linkage::Many(incoming)) => {
                for id in incoming {
                    if !existing.contains(&id) {
                        existing.push(id);
                    }
                }
            }
            (slot, other) => *slot = other,
        }
    }
}

/// One entry of a resource's `relationships` member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    pub data: Linkage,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

/// A compiled resource object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub relationships: IndexMap<String, Relationship>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub links: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl ResourceObject {
    pub fn new(kind: impl Into<String>, id: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            id,
            attributes: Map::new(),
            relationships: IndexMap::new(),
            links: Map::new(),
            meta: Map::new(),
        }
    }

    /// Ad-hoc resource object with no descriptor behind it.
    pub fn custom(kind: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            attributes,
            ..Self::new(kind, None)
        }
    }

    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.id
            .as_ref()
            .map(|id| ResourceIdentifier::new(self.kind.clone(), id.clone()))
    }

    /// Fold `other` into `self`: attribute, link, and meta keys are unioned
    /// with `other` winning conflicts; relationship linkage is unioned.
    pub fn merge(&mut self, other: ResourceObject) {
        self.attributes.extend(other.attributes);
        self.merge_relationships(other.relationships);
        self.links.extend(other.links);
        self.meta.extend(other.meta);
    }

    pub fn merge_relationships(&mut self, relationships: IndexMap<String, Relationship>) {
        for (name, incoming) in relationships {
            match self.relationships.get_mut(&name) {
                Some(existing) => {
                    existing.data.merge(incoming.data);
                    existing.meta.extend(incoming.meta);
                }
                None => {
                    self.relationships.insert(name, incoming);
                }
            }
        }
    }
}

/// Included resources keyed by `(type, id)`, in first-insertion order.
#[derive(Debug, Default)]
pub struct IncludedSet {
    entries: IndexMap<(String, String), ResourceObject>,
}

impl IncludedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge a resource. Returns `false` for resources without an id,
    /// which cannot be included.
    pub fn upsert(&mut self, resource: ResourceObject) -> bool {
        let Some(key) = resource.identifier().map(|id| id.key()) else {
            return false;
        };
        match self.entries.get_mut(&key) {
            Some(existing) => existing.merge(resource),
            None => {
                self.entries.insert(key, resource);
            }
        }
        true
    }

    /// Merge relationship linkage into an already-inserted resource.
    pub fn merge_relationships(
        &mut self,
        identifier: &ResourceIdentifier,
        relationships: IndexMap<String, Relationship>,
    ) {
        if let Some(existing) = self.entries.get_mut(&identifier.key()) {
            existing.merge_relationships(relationships);
        }
    }

    pub fn get(&self, identifier: &ResourceIdentifier) -> Option<&ResourceObject> {
        self.entries.get(&identifier.key())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<ResourceObject> {
        self.entries.into_values().collect()
    }
}

/// Primary `data` member.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    One(Box<ResourceObject>),
    Many(Vec<ResourceObject>),
    Values(Vec<Value>),
}

/// Top-level JSON:API document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub jsonapi: String,
    pub data: PrimaryData,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub links: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Map<String, Value>>,
}

impl Document {
    pub fn new(data: PrimaryData) -> Self {
        Self {
            jsonapi: JSONAPI_VERSION.to_string(),
            data,
            included: Vec::new(),
            links: Map::new(),
            meta: Map::new(),
            debug: None,
        }
    }

    /// Plain array response: values are emitted as-is with an item count.
    pub fn array(values: Vec<Value>) -> Self {
        let mut document = Self::new(PrimaryData::Values(Vec::new()));
        document.meta.insert("items".into(), json!(values.len()));
        document.data = PrimaryData::Values(values);
        document
    }

    /// Serialize into a JSON value.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures; plain documents never produce one.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
