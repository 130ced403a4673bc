//! Model capability contract and the JSON-backed in-memory store.
//!
//! The compiler only reads models through [`Model`]. It never loads data:
//! relations must be materialized by a [`ModelStore`] before compilation, and
//! anything not loaded is simply absent from the output.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{CompileError, StoreError};
use crate::pagination::{Page, PageRequest, SortDirection, SortField};
use crate::types::json_type_name;

/// Related value of a loaded relation.
pub enum Relation<'a> {
    One(&'a dyn Model),
    Many(Vec<&'a dyn Model>),
    NotLoaded,
}

/// Read access to a domain object.
pub trait Model {
    /// Kind tag used for registry dispatch when a relationship's declared
    /// descriptor cannot be resolved.
    fn kind(&self) -> Option<&str> {
        None
    }

    /// Scalar fields of the model.
    fn attributes(&self) -> Map<String, Value>;

    /// Store-provided identifier, consulted when the descriptor declares no
    /// id properties.
    fn identifier(&self) -> Option<Value> {
        None
    }

    /// A relation by name; `NotLoaded` unless it was eager-loaded.
    fn relation(&self, name: &str) -> Relation<'_>;

    /// Result of a zero-argument meta accessor, `None` when the accessor
    /// does not exist.
    fn meta(&self, _accessor: &str) -> Option<Map<String, Value>> {
        None
    }
}

/// A store able to materialize relation paths on already-fetched models.
pub trait ModelStore {
    type Model: Model;

    /// Load every dotted path (e.g. `author.profile`) on each model.
    ///
    /// A path that leads nowhere (unknown or null relation) is not an error.
    fn eager_load(&self, models: &mut [Self::Model], paths: &[String]) -> Result<(), StoreError>;
}

enum Loaded {
    One(Box<JsonModel>),
    Many(Vec<JsonModel>),
    Missing,
}

/// Model backed by a JSON object.
///
/// Two input shapes are accepted:
///
/// ```json
/// { "id": 1, "title": "Hi" }
/// ```
///
/// or the structured form, which can carry relations and meta accessors.
/// An object is only read as structured when `attributes` is an object and
/// every other key is `id`, `kind`, `relations`, or `meta`; anything else is
/// a flat attribute map, even if it has an `attributes` member:
///
/// ```json
/// {
///   "kind": "Article",
///   "attributes": { "id": 1, "title": "Hi" },
///   "relations": { "author": { "attributes": { "id": 9 } } },
///   "meta": { "stats": { "views": 3 } }
/// }
/// ```
///
/// Relations stay invisible until loaded through [`JsonStore`].
pub struct JsonModel {
    kind: Option<String>,
    id: Option<Value>,
    attributes: Map<String, Value>,
    pending: Map<String, Value>,
    loaded: IndexMap<String, Loaded>,
    meta: Map<String, Value>,
}

impl JsonModel {
    /// Build a model from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::InvalidModel` if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self, CompileError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(CompileError::InvalidModel {
                    actual: json_type_name(&other).to_string(),
                })
            }
        };

        if !is_structured(&map) {
            return Ok(Self::from_attributes(map));
        }

        let attributes = match map.remove("attributes") {
            Some(Value::Object(attrs)) => attrs,
            _ => Map::new(),
        };
        let kind = match map.remove("kind") {
            Some(Value::String(kind)) => Some(kind),
            _ => None,
        };
        let pending = match map.remove("relations") {
            Some(Value::Object(relations)) => relations,
            _ => Map::new(),
        };
        let meta = match map.remove("meta") {
            Some(Value::Object(meta)) => meta,
            _ => Map::new(),
        };

        Ok(Self {
            kind,
            id: map.remove("id"),
            attributes,
            pending,
            loaded: IndexMap::new(),
            meta,
        })
    }

    /// Build a relation-less model from a flat attribute map.
    pub fn from_attributes(attributes: Map<String, Value>) -> Self {
        Self {
            kind: None,
            id: None,
            attributes,
            pending: Map::new(),
            loaded: IndexMap::new(),
            meta: Map::new(),
        }
    }

    /// Parse either a single model or an array of models.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::InvalidModel` for scalars or arrays containing
    /// non-objects.
    pub fn many_from_value(value: Value) -> Result<Vec<Self>, CompileError> {
        match value {
            Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            other => Ok(vec![Self::from_value(other)?]),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Attach an unloaded relation.
    pub fn with_relation(mut self, name: impl Into<String>, value: Value) -> Self {
        self.pending.insert(name.into(), value);
        self
    }

    /// Attach a meta accessor result.
    pub fn with_meta(mut self, accessor: impl Into<String>, value: Value) -> Self {
        self.meta.insert(accessor.into(), value);
        self
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    fn load_path(&mut self, segments: &[&str], full_path: &str) -> Result<(), StoreError> {
        let Some((head, rest)) = segments.split_first() else {
            return Ok(());
        };

        if !self.loaded.contains_key(*head) {
            let loaded = match self.pending.remove(*head) {
                None | Some(Value::Null) => Loaded::Missing,
                Some(Value::Array(items)) => {
                    let models = items
                        .into_iter()
                        .map(|item| related_model(item, full_path))
                        .collect::<Result<Vec<_>, _>>()?;
                    Loaded::Many(models)
                }
                Some(other) => Loaded::One(Box::new(related_model(other, full_path)?)),
            };
            trace!(relation = *head, path = full_path, "loaded relation");
            self.loaded.insert((*head).to_string(), loaded);
        }

        match self.loaded.get_mut(*head) {
            Some(Loaded::One(model)) => model.load_path(rest, full_path),
            Some(Loaded::Many(models)) => {
                for model in models {
                    model.load_path(rest, full_path)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Top-level keys allowed next to `attributes` in the structured form.
const STRUCTURED_KEYS: [&str; 5] = ["attributes", "id", "kind", "relations", "meta"];

/// An object `attributes` member and no keys outside [`STRUCTURED_KEYS`].
fn is_structured(map: &Map<String, Value>) -> bool {
    matches!(map.get("attributes"), Some(Value::Object(_)))
        && map.keys().all(|key| STRUCTURED_KEYS.contains(&key.as_str()))
}

fn related_model(value: Value, path: &str) -> Result<JsonModel, StoreError> {
    JsonModel::from_value(value).map_err(|e| StoreError::new(path, e.to_string()))
}

impl Model for JsonModel {
    fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn attributes(&self) -> Map<String, Value> {
        self.attributes.clone()
    }

    fn identifier(&self) -> Option<Value> {
        self.id.clone()
    }

    fn relation(&self, name: &str) -> Relation<'_> {
        match self.loaded.get(name) {
            Some(Loaded::One(model)) => Relation::One(model.as_ref()),
            Some(Loaded::Many(models)) => {
                Relation::Many(models.iter().map(|m| m as &dyn Model).collect())
            }
            Some(Loaded::Missing) | None => Relation::NotLoaded,
        }
    }

    fn meta(&self, accessor: &str) -> Option<Map<String, Value>> {
        match self.meta.get(accessor)? {
            Value::Object(map) => Some(map.clone()),
            Value::Null => Some(Map::new()),
            other => {
                let mut map = Map::new();
                map.insert(accessor.to_string(), other.clone());
                Some(map)
            }
        }
    }
}

/// In-memory store for [`JsonModel`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStore;

impl JsonStore {
    /// Sort `models` per `request.sort`, then cut out the requested page.
    ///
    /// Pages past the end yield an empty item list; the page number itself
    /// is kept so links still point at what was asked for.
    pub fn paginate(
        &self,
        mut models: Vec<JsonModel>,
        request: &PageRequest,
        base_url: impl Into<String>,
    ) -> Page<JsonModel> {
        if !request.sort.is_empty() {
            models.sort_by(|a, b| compare_by(&request.sort, a, b));
        }

        let total = models.len() as u64;
        let per_page = request.size.max(1);
        let skip = request.number.saturating_sub(1).saturating_mul(per_page);
        let items: Vec<JsonModel> = models
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(per_page).unwrap_or(usize::MAX))
            .collect();

        Page::new(items, request.number, per_page, total, base_url)
            .with_sort(request.raw_sort.clone())
    }
}

impl ModelStore for JsonStore {
    type Model = JsonModel;

    fn eager_load(&self, models: &mut [JsonModel], paths: &[String]) -> Result<(), StoreError> {
        for path in paths {
            let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
            for model in models.iter_mut() {
                model.load_path(&segments, path)?;
            }
        }
        Ok(())
    }
}

fn compare_by(sort: &[SortField], a: &JsonModel, b: &JsonModel) -> Ordering {
    for field in sort {
        let ordering = compare_values(
            a.attributes.get(&field.field),
            b.attributes.get(&field.field),
        );
        let ordering = match field.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
