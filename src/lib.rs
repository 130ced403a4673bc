//! JSON:API Transformer
//!
//! Compiles domain models into JSON:API documents.
//!
//! Each resource type is described by a [`ResourceDescriptor`]: its `type`
//! alias, hidden and renamed attributes, identifier fields, link templates,
//! relationships, and meta accessors. The [`Compiler`] walks a model graph
//! along the request's include paths and produces a [`Document`] with
//! deduplicated `included` resources, resource links, and pagination links.
//!
//! # Example
//!
//! ```
//! use jsonapi_transformer::{
//!     Compiler, Data, DescriptorRegistry, JsonModel, JsonStore, QueryParams,
//!     RelationshipDef, ResourceDescriptor, RouteTable, UrlTemplate,
//! };
//! use serde_json::json;
//!
//! let registry = DescriptorRegistry::new()
//!     .with(
//!         "articles",
//!         ResourceDescriptor::new("articles")
//!             .hide(["secret"])
//!             .id_properties(["id"])
//!             .url(UrlTemplate::new("self", "articles.show").bind("article", "id"))
//!             .relationship("author", RelationshipDef::new("people")),
//!     )
//!     .with("people", ResourceDescriptor::new("people"));
//! let routes = RouteTable::new().route("articles.show", "/articles/{article}");
//! let compiler = Compiler::new(&registry, &routes);
//!
//! let mut models = vec![JsonModel::from_value(json!({
//!     "attributes": { "id": 1, "title": "Hi", "secret": "x" },
//!     "relations": { "author": { "attributes": { "id": 9, "name": "Ann" } } }
//! }))
//! .unwrap()];
//!
//! let ctx = QueryParams::parse("includes=author");
//! let articles = registry.get("articles").unwrap();
//! compiler.eager_load(&JsonStore, articles, &mut models, &ctx).unwrap();
//! let doc = compiler.compile(articles, Data::many(&models), &ctx).unwrap();
//!
//! let value = doc.to_value().unwrap();
//! assert_eq!(value["data"][0]["attributes"], json!({ "title": "Hi" }));
//! assert_eq!(value["data"][0]["links"]["self"], json!("/articles/1"));
//! assert_eq!(
//!     value["data"][0]["relationships"]["author"]["data"],
//!     json!({ "type": "people", "id": 9 })
//! );
//! assert_eq!(value["included"][0]["attributes"], json!({ "name": "Ann" }));
//! ```
//!
//! # Request Parameters
//!
//! | Key | Effect |
//! |-----|--------|
//! | `includes` | Comma-separated dotted relation paths; `-name` drops an autowired relation |
//! | `filter[<type>]` | Sparse fieldset for one resource type |
//! | `page[number]`, `page[size]` | Page selection for paged results |
//! | `page[sort]` | Alternating `field,direction` tokens |
//!
//! Bracketed and dotted keys are equivalent (`page[size]` == `page.size`).

mod cache;
mod compiler;
mod context;
mod descriptor;
mod document;
mod error;
mod include;
mod linter;
mod links;
mod loader;
mod model;
mod pagination;
mod registry;
mod shaper;
mod types;
mod validator;

pub use cache::DocumentCache;
pub use compiler::{Compiler, Data};
pub use context::{QueryParams, RequestContext};
pub use descriptor::{DescriptorRef, Method, RelationshipDef, ResourceDescriptor, UrlTemplate};
pub use document::{
    Document, IncludedSet, Linkage, PrimaryData, Relationship, ResourceIdentifier, ResourceObject,
};
pub use error::{CompileError, RegistryError, RegistryIssue, StoreError};
pub use include::{IncludeNode, IncludeTree};
pub use linter::{
    check, check_file, check_registry, CheckResult, Diagnostic, FileResult, FileStatus, Severity,
};
pub use links::{resource_links, RouteTable, UrlResolver};
pub use loader::{
    is_url, load_json, load_json_auto, load_json_str, load_registry, load_registry_str,
    registry_from_value, RegistryFile,
};
pub use model::{JsonModel, JsonStore, Model, ModelStore, Relation};
pub use pagination::{
    pagination_links, pagination_meta, parse_sort, Page, PageRequest, Paginator, SortDirection,
    SortField,
};
pub use registry::DescriptorRegistry;
pub use shaper::{identifier_fields, shape_attributes, ShapedAttributes};
pub use types::{camel_case, is_empty_value, uncamelcase, CompileOptions, JSONAPI_VERSION};
pub use validator::{registry_issues, registry_schema, validate_registry};

#[cfg(feature = "remote")]
pub use loader::load_json_url;
