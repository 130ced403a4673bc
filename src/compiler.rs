//! Document compilation.
//!
//! [`Compiler`] walks a model graph along the request's include tree and
//! produces a [`Document`]. One [`IncludedSet`] is created per top-level
//! call and threaded by reference through the recursion, so independent
//! calls never share mutable state.

use std::time::Instant;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::context::RequestContext;
use crate::descriptor::{DescriptorRef, ResourceDescriptor};
use crate::document::{
    Document, IncludedSet, Linkage, PrimaryData, Relationship, ResourceIdentifier, ResourceObject,
};
use crate::error::CompileError;
use crate::include::IncludeTree;
use crate::links::{resource_links, UrlResolver};
use crate::model::{Model, ModelStore, Relation};
use crate::pagination::{pagination_links, pagination_meta, Paginator};
use crate::registry::DescriptorRegistry;
use crate::shaper::shape_attributes;
use crate::types::{scalar_to_string, CompileOptions};

/// Primary input of a compile call.
pub enum Data<'m> {
    One(&'m dyn Model),
    Many(Vec<&'m dyn Model>),
}

impl<'m> Data<'m> {
    /// Collection input from a slice of concrete models.
    pub fn many<M: Model>(models: &'m [M]) -> Self {
        Data::Many(models.iter().map(|m| m as &dyn Model).collect())
    }
}

/// Compiles models into JSON:API documents.
///
/// # Example
///
/// ```
/// use jsonapi_transformer::{
///     Compiler, Data, DescriptorRegistry, JsonModel, QueryParams, ResourceDescriptor,
///     RouteTable,
/// };
/// use serde_json::json;
///
/// let registry = DescriptorRegistry::new()
///     .with("articles", ResourceDescriptor::new("articles").hide(["secret"]));
/// let routes = RouteTable::new();
/// let compiler = Compiler::new(&registry, &routes);
///
/// let model = JsonModel::from_value(json!({ "id": 1, "title": "Hi", "secret": "x" })).unwrap();
/// let articles = registry.get("articles").unwrap();
/// let doc = compiler
///     .compile(articles, Data::One(&model), &QueryParams::new())
///     .unwrap();
///
/// assert_eq!(
///     doc.to_value().unwrap()["data"],
///     json!({ "type": "articles", "id": 1, "attributes": { "title": "Hi" } })
/// );
/// ```
pub struct Compiler<'a> {
    registry: &'a DescriptorRegistry,
    resolver: &'a dyn UrlResolver,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a DescriptorRegistry, resolver: &'a dyn UrlResolver) -> Self {
        Self {
            registry,
            resolver,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn registry(&self) -> &'a DescriptorRegistry {
        self.registry
    }

    /// Include tree for `descriptor` under the request's `includes` value.
    pub fn include_tree(
        &self,
        descriptor: &ResourceDescriptor,
        ctx: &dyn RequestContext,
    ) -> IncludeTree {
        IncludeTree::resolve(ctx.includes(), descriptor, self.registry)
    }

    /// Ask `store` to materialize every relation path the request selects.
    ///
    /// # Errors
    ///
    /// Store failures surface as `CompileError::EagerLoad`.
    pub fn eager_load<S: ModelStore>(
        &self,
        store: &S,
        descriptor: &ResourceDescriptor,
        models: &mut [S::Model],
        ctx: &dyn RequestContext,
    ) -> Result<(), CompileError> {
        let paths = self.include_tree(descriptor, ctx).load_paths();
        if paths.is_empty() {
            return Ok(());
        }
        debug!(resource = %descriptor.alias, paths = ?paths, "eager loading");
        store.eager_load(models, &paths)?;
        Ok(())
    }

    /// Compile one model or a collection.
    ///
    /// Collection order is preserved. Relations must already be loaded;
    /// anything not loaded is left out.
    ///
    /// # Errors
    ///
    /// Only URL resolution failures abort compilation.
    pub fn compile(
        &self,
        descriptor: &ResourceDescriptor,
        data: Data<'_>,
        ctx: &dyn RequestContext,
    ) -> Result<Document, CompileError> {
        let started = Instant::now();
        let tree = self.include_tree(descriptor, ctx);
        let mut included = IncludedSet::new();

        let primary = match data {
            Data::One(model) => {
                let object = self.compile_resource(descriptor, model, &tree, ctx, &mut included)?;
                if self.options.single_as_array {
                    PrimaryData::Many(vec![object])
                } else {
                    PrimaryData::One(Box::new(object))
                }
            }
            Data::Many(models) => {
                let mut objects = Vec::with_capacity(models.len());
                for model in models {
                    let object =
                        self.compile_resource(descriptor, model, &tree, ctx, &mut included)?;
                    objects.push(object);
                }
                PrimaryData::Many(objects)
            }
        };

        let mut document = Document::new(primary);
        self.finish(&mut document, included, started);
        debug!(
            resource = %descriptor.alias,
            included = document.included.len(),
            "document compiled"
        );
        Ok(document)
    }

    /// Compile a page of models and attach pagination links and meta.
    ///
    /// # Errors
    ///
    /// Same as [`compile`](Self::compile).
    pub fn compile_page<P: Paginator>(
        &self,
        descriptor: &ResourceDescriptor,
        page: &P,
        ctx: &dyn RequestContext,
    ) -> Result<Document, CompileError> {
        let mut document = self.compile(descriptor, Data::Many(page.models()), ctx)?;
        document.links = pagination_links(page);
        document.meta = pagination_meta(page);
        Ok(document)
    }

    fn finish(&self, document: &mut Document, included: IncludedSet, started: Instant) {
        let primary: Vec<(String, String)> = match &document.data {
            PrimaryData::One(object) => object.identifier().map(|id| id.key()).into_iter().collect(),
            PrimaryData::Many(objects) => objects
                .iter()
                .filter_map(|o| o.identifier().map(|id| id.key()))
                .collect(),
            PrimaryData::Values(_) => Vec::new(),
        };
        document.included = included
            .into_vec()
            .into_iter()
            .filter(|o| {
                o.identifier()
                    .map_or(true, |id| !primary.contains(&id.key()))
            })
            .collect();

        if self.options.debug_timings {
            let mut debug = Map::new();
            debug.insert(
                "fullTransform".into(),
                json!(format!("{}ms", started.elapsed().as_millis())),
            );
            document.debug = Some(debug);
        }
    }

    fn compile_resource(
        &self,
        descriptor: &ResourceDescriptor,
        model: &dyn Model,
        tree: &IncludeTree,
        ctx: &dyn RequestContext,
        included: &mut IncludedSet,
    ) -> Result<ResourceObject, CompileError> {
        let mut object = self.resource_body(descriptor, model, ctx)?;
        object.relationships = self.relationships(descriptor, model, tree, ctx, included)?;
        Ok(object)
    }

    /// Everything but relationships: identifier, attributes, links, meta.
    fn resource_body(
        &self,
        descriptor: &ResourceDescriptor,
        model: &dyn Model,
        ctx: &dyn RequestContext,
    ) -> Result<ResourceObject, CompileError> {
        let raw = model.attributes();
        let shaped = shape_attributes(&raw, descriptor, ctx, &self.options);

        let mut object = ResourceObject::new(
            descriptor.alias.clone(),
            self.identifier(descriptor, model, &raw),
        );
        object.links = resource_links(descriptor, &shaped.unfiltered, &raw, self.resolver)?;
        object.meta = resource_meta(descriptor, model);
        object.attributes = shaped.attributes;
        Ok(object)
    }

    /// `id_properties` (composite values joined with `:`), then the model's
    /// own identifier, then the configured fallback field.
    fn identifier(
        &self,
        descriptor: &ResourceDescriptor,
        model: &dyn Model,
        raw: &Map<String, Value>,
    ) -> Option<Value> {
        let parts: Vec<&Value> = descriptor
            .id_properties
            .iter()
            .filter_map(|field| raw.get(field))
            .filter(|v| !v.is_null())
            .collect();
        if !parts.is_empty() && parts.len() == descriptor.id_properties.len() {
            return Some(match parts.as_slice() {
                [single] => (*single).clone(),
                many => Value::String(
                    many.iter()
                        .map(|v| scalar_to_string(v))
                        .collect::<Vec<_>>()
                        .join(":"),
                ),
            });
        }

        model.identifier().filter(|v| !v.is_null()).or_else(|| {
            raw.get(&self.options.id_field)
                .filter(|v| !v.is_null())
                .cloned()
        })
    }

    fn relationships(
        &self,
        descriptor: &ResourceDescriptor,
        model: &dyn Model,
        tree: &IncludeTree,
        ctx: &dyn RequestContext,
        included: &mut IncludedSet,
    ) -> Result<IndexMap<String, Relationship>, CompileError> {
        let mut relationships = IndexMap::new();

        for (name, node) in tree.selected() {
            let (related, single) = match model.relation(name) {
                Relation::NotLoaded => continue,
                Relation::One(related) => (vec![related], true),
                Relation::Many(related) => (related, false),
            };

            let mut identifiers = Vec::with_capacity(related.len());
            for related_model in related {
                let Some(related_descriptor) =
                    self.related_descriptor(&node.descriptor, related_model)
                else {
                    debug!(
                        resource = %descriptor.alias,
                        relation = %name,
                        descriptor = node.descriptor.name(),
                        "no descriptor for related model, skipped"
                    );
                    continue;
                };
                if let Some(identifier) = self.include(
                    related_descriptor,
                    related_model,
                    &node.children,
                    ctx,
                    included,
                )? {
                    identifiers.push(identifier);
                }
            }

            let data = if single {
                match identifiers.pop() {
                    Some(identifier) => Linkage::One(identifier),
                    None => continue,
                }
            } else if identifiers.is_empty() {
                continue;
            } else {
                Linkage::Many(identifiers)
            };

            let meta = descriptor
                .relationships
                .get(name)
                .map(|def| def.extra_fields.clone())
                .unwrap_or_default();
            relationships.insert(name.clone(), Relationship { data, meta });
        }

        Ok(relationships)
    }

    /// Add a related model to `included` and return its linkage.
    ///
    /// The body is inserted before the model's own relationships are
    /// walked, so included order is pre-order over the model graph.
    fn include(
        &self,
        descriptor: &ResourceDescriptor,
        model: &dyn Model,
        tree: &IncludeTree,
        ctx: &dyn RequestContext,
        included: &mut IncludedSet,
    ) -> Result<Option<ResourceIdentifier>, CompileError> {
        let object = self.resource_body(descriptor, model, ctx)?;
        let Some(identifier) = object.identifier() else {
            debug!(resource = %descriptor.alias, "related model has no identifier, skipped");
            return Ok(None);
        };
        included.upsert(object);

        let relationships = self.relationships(descriptor, model, tree, ctx, included)?;
        included.merge_relationships(&identifier, relationships);
        Ok(Some(identifier))
    }

    fn related_descriptor(
        &self,
        reference: &DescriptorRef,
        model: &dyn Model,
    ) -> Option<&'a ResourceDescriptor> {
        let registry = self.registry;
        registry
            .resolve(reference)
            .or_else(|| model.kind().and_then(|kind| registry.for_kind(kind)))
            .map(|descriptor| descriptor.as_ref())
    }
}

/// Merge meta accessor results in declaration order.
///
/// Accumulation stops at the first accessor that is missing or returns
/// nothing; entries merged before it are kept.
fn resource_meta(descriptor: &ResourceDescriptor, model: &dyn Model) -> Map<String, Value> {
    let mut meta = Map::new();
    for accessor in &descriptor.meta_accessors {
        match model.meta(accessor) {
            Some(values) if !values.is_empty() => meta.extend(values),
            _ => {
                debug!(
                    resource = %descriptor.alias,
                    accessor = %accessor,
                    "empty meta accessor, remaining accessors skipped"
                );
                break;
            }
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::QueryParams;
    use crate::descriptor::RelationshipDef;
    use crate::links::RouteTable;
    use crate::model::{JsonModel, JsonStore};

    fn registry() -> DescriptorRegistry {
        DescriptorRegistry::new()
            .with(
                "articles",
                ResourceDescriptor::new("articles")
                    .relationship("author", RelationshipDef::new("people"))
                    .meta_accessor("stats")
                    .meta_accessor("flags")
                    .meta_accessor("late"),
            )
            .with("people", ResourceDescriptor::new("people"))
            .with("orders", ResourceDescriptor::new("orders").id_properties(["shop", "number"]))
    }

    fn model(value: Value) -> JsonModel {
        JsonModel::from_value(value).unwrap()
    }

    #[test]
    fn composite_identifier_joins_parts() {
        let registry = registry();
        let routes = RouteTable::new();
        let compiler = Compiler::new(&registry, &routes);
        let order = model(json!({ "shop": "eu", "number": 17, "total": 3 }));

        let doc = compiler
            .compile(registry.get("orders").unwrap(), Data::One(&order), &QueryParams::new())
            .unwrap();
        let value = doc.to_value().unwrap();
        assert_eq!(value["data"]["id"], json!("eu:17"));
        assert_eq!(value["data"]["attributes"], json!({ "total": 3 }));
    }

    #[test]
    fn store_identifier_used_without_id_properties() {
        let registry = registry();
        let routes = RouteTable::new();
        let compiler = Compiler::new(&registry, &routes);
        let person = model(json!({ "id": "p-1", "attributes": { "name": "Ann" } }));

        let doc = compiler
            .compile(registry.get("people").unwrap(), Data::One(&person), &QueryParams::new())
            .unwrap();
        assert_eq!(doc.to_value().unwrap()["data"]["id"], json!("p-1"));
    }

    #[test]
    fn meta_accumulation_stops_at_first_empty_accessor() {
        let registry = registry();
        let routes = RouteTable::new();
        let compiler = Compiler::new(&registry, &routes);
        let article = model(json!({
            "attributes": { "id": 1 },
            "meta": { "stats": { "views": 3 }, "flags": {}, "late": { "never": true } }
        }));

        let doc = compiler
            .compile(registry.get("articles").unwrap(), Data::One(&article), &QueryParams::new())
            .unwrap();
        assert_eq!(doc.to_value().unwrap()["data"]["meta"], json!({ "views": 3 }));
    }

    #[test]
    fn eager_load_uses_include_tree() {
        let registry = registry();
        let routes = RouteTable::new();
        let compiler = Compiler::new(&registry, &routes);
        let mut articles = vec![model(json!({
            "attributes": { "id": 1 },
            "relations": { "author": { "attributes": { "id": 2 } } }
        }))];
        let ctx = QueryParams::parse("includes=author");
        let descriptor = registry.get("articles").unwrap();

        compiler
            .eager_load(&JsonStore, descriptor, &mut articles, &ctx)
            .unwrap();
        assert!(articles[0].is_loaded("author"));

        let doc = compiler
            .compile(descriptor, Data::many(&articles), &ctx)
            .unwrap();
        assert_eq!(doc.included.len(), 1);
        assert_eq!(doc.included[0].kind, "people");
    }

    #[test]
    fn debug_timings_are_opt_in() {
        let registry = registry();
        let routes = RouteTable::new();
        let person = model(json!({ "id": 1 }));
        let people = registry.get("people").unwrap();

        let plain = Compiler::new(&registry, &routes)
            .compile(people, Data::One(&person), &QueryParams::new())
            .unwrap();
        assert!(plain.debug.is_none());

        let timed = Compiler::new(&registry, &routes)
            .with_options(CompileOptions::default().debug_timings(true))
            .compile(people, Data::One(&person), &QueryParams::new())
            .unwrap();
        let debug = timed.debug.unwrap();
        assert!(debug["fullTransform"].as_str().unwrap().ends_with("ms"));
    }

    #[test]
    fn single_as_array_wraps_primary_data() {
        let registry = registry();
        let routes = RouteTable::new();
        let person = model(json!({ "id": 1 }));
        let doc = Compiler::new(&registry, &routes)
            .with_options(CompileOptions::default().single_as_array(true))
            .compile(registry.get("people").unwrap(), Data::One(&person), &QueryParams::new())
            .unwrap();
        assert!(doc.to_value().unwrap()["data"].is_array());
    }
}
