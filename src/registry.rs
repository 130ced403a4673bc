//! Process-wide descriptor registry.
//!
//! Descriptors are registered once at startup under a name (the target of
//! [`DescriptorRef`]s) and optionally bound to model kind tags. After
//! construction the registry is read-only and can be shared across threads.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::{DescriptorRef, ResourceDescriptor};

/// Name -> descriptor map with kind-tag dispatch.
#[derive(Debug, Clone, Default)]
pub struct DescriptorRegistry {
    descriptors: HashMap<String, Arc<ResourceDescriptor>>,
    kinds: HashMap<String, String>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under `name`, replacing any previous entry.
    ///
    /// An empty alias defaults to the registration name.
    pub fn register(&mut self, name: impl Into<String>, mut descriptor: ResourceDescriptor) {
        let name = name.into();
        if descriptor.alias.is_empty() {
            descriptor.alias = name.clone();
        }
        self.descriptors.insert(name, Arc::new(descriptor));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, descriptor: ResourceDescriptor) -> Self {
        self.register(name, descriptor);
        self
    }

    /// Bind a model kind tag to a registered descriptor name.
    pub fn bind_kind(&mut self, kind: impl Into<String>, name: impl Into<String>) {
        self.kinds.insert(kind.into(), name.into());
    }

    /// Builder form of [`bind_kind`](Self::bind_kind).
    pub fn with_kind(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.bind_kind(kind, name);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ResourceDescriptor>> {
        self.descriptors.get(name)
    }

    pub fn resolve(&self, reference: &DescriptorRef) -> Option<&Arc<ResourceDescriptor>> {
        self.get(reference.name())
    }

    /// Descriptor bound to a model kind tag.
    pub fn for_kind(&self, kind: &str) -> Option<&Arc<ResourceDescriptor>> {
        self.kinds.get(kind).and_then(|name| self.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
