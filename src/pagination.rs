//! Paged result sets, sort parsing, and top-level pagination links.
//!
//! Page links round-trip through the same bracketed parameter names the
//! request used (`page[number]`, `page[size]`, `page[sort]`).

use serde_json::{json, Map, Value};

use crate::context::RequestContext;
use crate::model::Model;
use crate::types::{uncamelcase, PAGE_NUMBER_KEY, PAGE_SIZE_KEY, PAGE_SORT_KEY};

/// Sort direction for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `asc` and `desc` are taken literally; anything else sorts descending.
    pub fn parse(token: &str) -> Self {
        match token {
            "asc" => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One `field,direction` pair from `page[sort]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    /// Store-side field name (snake_case).
    pub field: String,
    pub direction: SortDirection,
}

/// Parse alternating `field,direction` tokens.
///
/// Field tokens are converted to snake_case. A trailing field with no
/// direction token is ignored.
pub fn parse_sort(raw: &str) -> Vec<SortField> {
    let mut fields = Vec::new();
    let mut pending: Option<String> = None;

    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match pending.take() {
            None => pending = Some(uncamelcase(token)),
            Some(field) => fields.push(SortField {
                field,
                direction: SortDirection::parse(token),
            }),
        }
    }

    fields
}

/// Paging parameters read from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub number: u64,
    pub size: u64,
    pub sort: Vec<SortField>,
    /// `page[sort]` as received, echoed into page links.
    pub raw_sort: Option<String>,
}

impl PageRequest {
    /// Read `page[number]`, `page[size]`, and `page[sort]`.
    ///
    /// Missing or unparsable numbers fall back to page 1 and `default_size`.
    pub fn from_context(ctx: &dyn RequestContext, default_size: u64) -> Self {
        let number = ctx
            .get(PAGE_NUMBER_KEY)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1);
        let size = ctx
            .get(PAGE_SIZE_KEY)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default_size.max(1));
        let raw_sort = ctx
            .get(PAGE_SORT_KEY)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let sort = raw_sort.as_deref().map(parse_sort).unwrap_or_default();

        Self {
            number,
            size,
            sort,
            raw_sort,
        }
    }
}

/// A paged result set able to produce URLs for arbitrary page numbers.
pub trait Paginator {
    fn current_page(&self) -> u64;
    fn per_page(&self) -> u64;
    fn last_page(&self) -> u64;
    fn url(&self, page: u64) -> String;

    /// Models on the current page, in order.
    fn models(&self) -> Vec<&dyn Model>;

    fn has_more_pages(&self) -> bool {
        self.current_page() < self.last_page()
    }
}

/// Concrete page over owned models.
pub struct Page<M> {
    items: Vec<M>,
    current_page: u64,
    per_page: u64,
    total: u64,
    base_url: String,
    sort: Option<String>,
}

impl<M> Page<M> {
    pub fn new(
        items: Vec<M>,
        current_page: u64,
        per_page: u64,
        total: u64,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            items,
            current_page: current_page.max(1),
            per_page: per_page.max(1),
            total,
            base_url: base_url.into(),
            sort: None,
        }
    }

    /// Echo a `page[sort]` value into every page URL.
    pub fn with_sort(mut self, sort: Option<String>) -> Self {
        self.sort = sort;
        self
    }

    pub fn items(&self) -> &[M] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [M] {
        &mut self.items
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl<M: Model> Paginator for Page<M> {
    fn current_page(&self) -> u64 {
        self.current_page
    }

    fn per_page(&self) -> u64 {
        self.per_page
    }

    fn last_page(&self) -> u64 {
        let partial = u64::from(self.total % self.per_page != 0);
        (self.total / self.per_page + partial).max(1)
    }

    fn url(&self, page: u64) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{}{}{}={}&{}={}",
            self.base_url, separator, PAGE_NUMBER_KEY, page, PAGE_SIZE_KEY, self.per_page
        );
        if let Some(sort) = &self.sort {
            url.push_str(&format!("&{}={}", PAGE_SORT_KEY, urlencoding::encode(sort)));
        }
        url
    }

    fn models(&self) -> Vec<&dyn Model> {
        self.items.iter().map(|m| m as &dyn Model).collect()
    }
}

/// Top-level `links` for a page: `self`, `first`, `prev`, `next`, `last`.
///
/// `prev` only appears when `1 < current <= last`; `next` only when more
/// pages follow.
pub fn pagination_links(page: &dyn Paginator) -> Map<String, Value> {
    let current = page.current_page();
    let last = page.last_page();

    let mut links = Map::new();
    links.insert("self".into(), json!(page.url(current)));
    links.insert("first".into(), json!(page.url(1)));
    if current > 1 && current <= last {
        links.insert("prev".into(), json!(page.url(current - 1)));
    }
    if page.has_more_pages() {
        links.insert("next".into(), json!(page.url(current + 1)));
    }
    links.insert("last".into(), json!(page.url(last)));
    links
}

/// Top-level `meta` for a page.
pub fn pagination_meta(page: &dyn Paginator) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert("total-pages".into(), json!(page.last_page()));
    meta.insert("page-size".into(), json!(page.per_page()));
    meta.insert("currentPage".into(), json!(page.current_page()));
    meta
}
