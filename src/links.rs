//! Resource links built from URL templates.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::descriptor::ResourceDescriptor;
use crate::error::CompileError;
use crate::types::{is_empty_value, scalar_to_string};

/// Resolves a route name plus parameters into a URL.
///
/// Failures are fatal for the compile call.
pub trait UrlResolver {
    fn resolve_url(
        &self,
        route: &str,
        params: &IndexMap<String, String>,
    ) -> Result<String, CompileError>;
}

impl<F> UrlResolver for F
where
    F: Fn(&str, &IndexMap<String, String>) -> Result<String, CompileError>,
{
    fn resolve_url(
        &self,
        route: &str,
        params: &IndexMap<String, String>,
    ) -> Result<String, CompileError> {
        self(route, params)
    }
}

/// Route name -> path pattern with `{param}` placeholders.
///
/// Parameters without a placeholder are appended as a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: IndexMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.routes.insert(name.into(), pattern.into());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl From<IndexMap<String, String>> for RouteTable {
    fn from(routes: IndexMap<String, String>) -> Self {
        Self { routes }
    }
}

impl UrlResolver for RouteTable {
    fn resolve_url(
        &self,
        route: &str,
        params: &IndexMap<String, String>,
    ) -> Result<String, CompileError> {
        let pattern = self
            .routes
            .get(route)
            .ok_or_else(|| CompileError::UrlResolution {
                route: route.to_string(),
                message: "unknown route".to_string(),
            })?;

        let mut url = String::with_capacity(pattern.len());
        let mut used = Vec::new();
        let mut rest = pattern.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let name = &rest[start + 1..start + len];
            let value = params.get(name).ok_or_else(|| CompileError::UrlResolution {
                route: route.to_string(),
                message: format!("missing parameter '{}'", name),
            })?;
            url.push_str(&rest[..start]);
            url.push_str(&urlencoding::encode(value));
            used.push(name);
            rest = &rest[start + len + 1..];
        }
        url.push_str(rest);

        let query: Vec<String> = params
            .iter()
            .filter(|(name, _)| !used.contains(&name.as_str()))
            .map(|(name, value)| {
                format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
            })
            .collect();
        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query.join("&"));
        }

        Ok(url)
    }
}

/// Build the `links` member of one resource object.
///
/// Binding values come from the shaped (renamed, unfiltered) attributes,
/// falling back to the raw attributes. A template with an absent or empty
/// binding is skipped.
pub fn resource_links(
    descriptor: &ResourceDescriptor,
    shaped: &Map<String, Value>,
    raw: &Map<String, Value>,
    resolver: &dyn UrlResolver,
) -> Result<Map<String, Value>, CompileError> {
    let mut links = Map::new();

    'templates: for template in &descriptor.url_templates {
        let mut params = IndexMap::new();
        for (param, attribute) in &template.params {
            let value = shaped
                .get(attribute)
                .filter(|v| !is_empty_value(v))
                .or_else(|| raw.get(attribute).filter(|v| !is_empty_value(v)));
            let Some(value) = value else {
                debug!(
                    resource = %descriptor.alias,
                    link = %template.name,
                    attribute = %attribute,
                    "link binding missing, template skipped"
                );
                continue 'templates;
            };
            params.insert(param.clone(), scalar_to_string(value));
        }

        let url = resolver.resolve_url(&template.route, &params)?;
        links.insert(template.name.clone(), Value::String(url));
    }

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::UrlTemplate;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn routes() -> RouteTable {
        RouteTable::new()
            .route("articles.show", "/articles/{article}")
            .route("articles.comments", "/articles/{article}/comments")
    }

    #[test]
    fn route_table_substitutes_placeholders() {
        let url = routes()
            .resolve_url("articles.show", &params(&[("article", "42")]))
            .unwrap();
        assert_eq!(url, "/articles/42");
    }

    #[test]
    fn route_table_appends_extra_params_as_query() {
        let url = routes()
            .resolve_url(
                "articles.comments",
                &params(&[("article", "7"), ("lang", "en gb")]),
            )
            .unwrap();
        assert_eq!(url, "/articles/7/comments?lang=en%20gb");
    }

    #[test]
    fn route_table_errors() {
        let err = routes().resolve_url("nope", &params(&[])).unwrap_err();
        assert!(matches!(err, CompileError::UrlResolution { route, .. } if route == "nope"));

        let err = routes()
            .resolve_url("articles.show", &params(&[]))
            .unwrap_err();
        assert!(
            matches!(err, CompileError::UrlResolution { message, .. } if message.contains("article"))
        );
    }

    #[test]
    fn links_fall_back_to_raw_and_skip_missing() {
        let desc = ResourceDescriptor::new("articles")
            .url(UrlTemplate::new("self", "articles.show").bind("article", "id"))
            .url(UrlTemplate::new("comments", "articles.comments").bind("article", "slug"));
        let shaped = Map::new();
        let raw = json!({ "id": 5, "slug": "" }).as_object().unwrap().clone();

        let links = resource_links(&desc, &shaped, &raw, &routes()).unwrap();
        assert_eq!(Value::Object(links), json!({ "self": "/articles/5" }));
    }

    #[test]
    fn links_prefer_renamed_attributes() {
        let desc = ResourceDescriptor::new("articles")
            .url(UrlTemplate::new("self", "articles.show").bind("article", "handle"));
        let shaped = json!({ "handle": "hello" }).as_object().unwrap().clone();

        let links = resource_links(&desc, &shaped, &Map::new(), &routes()).unwrap();
        assert_eq!(links["self"], json!("/articles/hello"));
    }

    #[test]
    fn closure_resolver_errors_propagate() {
        let desc = ResourceDescriptor::new("articles")
            .url(UrlTemplate::new("self", "articles.show").bind("article", "id"));
        let raw = json!({ "id": 1 }).as_object().unwrap().clone();
        let failing = |route: &str, _: &IndexMap<String, String>| -> Result<String, CompileError> {
            Err(CompileError::UrlResolution {
                route: route.to_string(),
                message: "router offline".to_string(),
            })
        };

        let err = resource_links(&desc, &Map::new(), &raw, &failing).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
