//! Include-path resolution.
//!
//! Turns the request's comma-separated dotted include list plus every
//! descriptor's `autowired` relationships into a nested [`IncludeTree`].
//!
//! # Rules
//!
//! - Each dotted segment is validated against the relationship map of the
//!   descriptor reached so far. An unknown segment (or a relationship whose
//!   descriptor cannot be resolved) stops that token only; segments already
//!   walked stay selected.
//! - Autowiring runs after the explicit tokens. For every node already in the
//!   tree, and for the root, autowired relationships missing at that level
//!   are added. Nodes added by autowiring are not themselves autowired, so the
//!   tree depth is bounded by what the caller asked for even when descriptors
//!   reference each other cyclically.
//! - A token prefixed with `-` (e.g. `-author`) overrides autowiring: the
//!   relation is recorded as deselected and is never expanded. An explicit
//!   include of the same relation takes precedence over the override.

use indexmap::IndexMap;
use tracing::debug;

use crate::descriptor::{DescriptorRef, ResourceDescriptor};
use crate::registry::DescriptorRegistry;

/// One relation in the include tree.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeNode {
    /// False for relations deselected with a `-` override.
    pub selected: bool,
    /// True when the node was added by autowiring rather than requested.
    pub autowired: bool,
    /// Descriptor used for the related models.
    pub descriptor: DescriptorRef,
    pub children: IncludeTree,
}

impl IncludeNode {
    fn new(descriptor: DescriptorRef, selected: bool, autowired: bool) -> Self {
        Self {
            selected,
            autowired,
            descriptor,
            children: IncludeTree::default(),
        }
    }
}

/// Relation name -> node, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncludeTree {
    nodes: IndexMap<String, IncludeNode>,
}

impl IncludeTree {
    /// Build the tree for `root` from a raw `includes` value.
    pub fn resolve(
        raw: Option<&str>,
        root: &ResourceDescriptor,
        registry: &DescriptorRegistry,
    ) -> Self {
        let mut tree = IncludeTree::default();
        let tokens: Vec<&str> = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        for token in tokens.iter().filter(|t| !t.starts_with('-')) {
            tree.insert_path(token, root, registry);
        }
        for token in tokens.iter().filter_map(|t| t.strip_prefix('-')) {
            tree.deselect_path(token, root, registry);
        }

        tree.autowire(root, registry);
        tree
    }

    pub fn get(&self, name: &str) -> Option<&IncludeNode> {
        self.nodes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IncludeNode)> {
        self.nodes.iter()
    }

    /// Selected nodes only.
    pub fn selected(&self) -> impl Iterator<Item = (&String, &IncludeNode)> {
        self.nodes.iter().filter(|(_, node)| node.selected)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Flatten selected nodes back into dotted paths for eager loading.
    ///
    /// One path per selected leaf, e.g. `author.profile`.
    pub fn load_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_paths("", &mut paths);
        paths
    }

    fn collect_paths(&self, prefix: &str, paths: &mut Vec<String>) {
        for (name, node) in self.selected() {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };
            if node.children.selected().next().is_none() {
                paths.push(path);
            } else {
                node.children.collect_paths(&path, paths);
            }
        }
    }

    fn insert_path(
        &mut self,
        token: &str,
        root: &ResourceDescriptor,
        registry: &DescriptorRegistry,
    ) {
        let mut level = self;
        let mut descriptor = root;

        for segment in token.split('.').filter(|s| !s.is_empty()) {
            let Some(def) = descriptor.relationships.get(segment) else {
                debug!(
                    include = token,
                    segment,
                    resource = %descriptor.alias,
                    "unknown relation in include path"
                );
                return;
            };

            let node = level
                .nodes
                .entry(segment.to_string())
                .or_insert_with(|| IncludeNode::new(def.resource.clone(), true, false));
            node.selected = true;
            node.autowired = false;

            let Some(next) = registry.resolve(&node.descriptor) else {
                debug!(
                    include = token,
                    segment,
                    descriptor = node.descriptor.name(),
                    "relation descriptor not registered"
                );
                return;
            };
            descriptor = next.as_ref();
            level = &mut node.children;
        }
    }

    fn deselect_path(
        &mut self,
        token: &str,
        root: &ResourceDescriptor,
        registry: &DescriptorRegistry,
    ) {
        let segments: Vec<&str> = token.split('.').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut level = self;
        let mut descriptor = root;
        for segment in parents {
            let Some(node) = level.nodes.get_mut(*segment) else {
                return;
            };
            let Some(next) = registry.resolve(&node.descriptor) else {
                return;
            };
            descriptor = next.as_ref();
            level = &mut node.children;
        }

        if let Some(def) = descriptor.relationships.get(*last) {
            level
                .nodes
                .entry((*last).to_string())
                .or_insert_with(|| IncludeNode::new(def.resource.clone(), false, false));
        }
    }

    fn autowire(&mut self, descriptor: &ResourceDescriptor, registry: &DescriptorRegistry) {
        for node in self.nodes.values_mut().filter(|n| n.selected) {
            if let Some(child) = registry.resolve(&node.descriptor) {
                node.children.autowire(child, registry);
            }
        }

        for (name, def) in descriptor.autowired() {
            if !self.nodes.contains_key(name) {
                self.nodes.insert(
                    name.clone(),
                    IncludeNode::new(def.resource.clone(), true, true),
                );
            }
        }
    }
}
