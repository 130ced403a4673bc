//! Request parameters consumed by the compiler.
//!
//! The compiler never reads ambient request state. Every call receives a
//! [`RequestContext`] explicitly; [`QueryParams`] is the stock implementation
//! backed by a parsed query string.
//!
//! Bracketed and dotted keys are interchangeable: `page[number]` and
//! `page.number` address the same value.

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::types::{FILTER_PREFIX, INCLUDES_KEY};

/// Read-only key-value view of request parameters.
pub trait RequestContext {
    fn get(&self, key: &str) -> Option<&str>;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Raw `includes` value.
    fn includes(&self) -> Option<&str> {
        self.get(INCLUDES_KEY)
    }

    /// Sparse fieldset for a resource alias, split on `,`.
    fn fieldset(&self, alias: &str) -> Option<Vec<&str>> {
        let raw = self.get(&format!("{}.{}", FILTER_PREFIX, alias))?;
        Some(
            raw.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .collect(),
        )
    }
}

/// Query-string backed request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: IndexMap<String, String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (leading `?` optional).
    ///
    /// Keys and values are percent-decoded, `+` decodes to a space, and a
    /// repeated key keeps its last value.
    pub fn parse(query: &str) -> Self {
        let mut params = IndexMap::new();
        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = normalize_key(&decode(key));
            if key.is_empty() {
                continue;
            }
            params.insert(key, decode(value));
        }
        Self { params }
    }

    /// Set a parameter, replacing any previous value.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.params.insert(normalize_key(key), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Stable serialization: keys sorted, values percent-encoded.
    pub fn canonical(&self) -> String {
        let mut pairs: Vec<(&String, &String)> = self.params.iter().collect();
        pairs.sort();
        pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl RequestContext for QueryParams {
    fn get(&self, key: &str) -> Option<&str> {
        self.params.get(&normalize_key(key)).map(String::as_str)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.insert(k.as_ref(), v);
        }
        params
    }
}

/// `page[number]` -> `page.number`, `a[b][c]` -> `a.b.c`.
fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '[' => out.push('.'),
            ']' => {}
            other => out.push(other),
        }
    }
    out.trim_end_matches('.').to_string()
}

fn decode(raw: &str) -> String {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced.into_owned(),
    }
}
