use super::Descriptor;
use std::sync::Arc;

/// Ordered collection of descriptors, searched by path.
///
/// Constructed explicitly and shared by reference, so independent managers
/// (one per tenant, say) can reuse the same immutable policy objects.
#[derive(Default, Clone)]
pub struct Registry {
    descriptors: Vec<Arc<dyn Descriptor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: Arc<dyn Descriptor>) -> Arc<dyn Descriptor> {
        if let Some(existing) = self
            .descriptors
            .iter()
            .find(|d| d.name() == descriptor.name())
        {
            tracing::warn!(
                "descriptor '{}' registered twice; the earlier one keeps precedence",
                existing.name()
            );
        }
        self.descriptors.push(Arc::clone(&descriptor));
        descriptor
    }

    pub fn with(mut self, descriptor: Arc<dyn Descriptor>) -> Self {
        self.register(descriptor);
        self
    }

    /// First registered descriptor whose matcher accepts `path`.
    pub fn resolve(&self, path: &str) -> Option<Arc<dyn Descriptor>> {
        self.descriptors
            .iter()
            .find(|d| d.match_resource(path).is_some())
            .cloned()
    }

    /// Every descriptor accepting `path`, in registration order.
    /// More than one entry means the registry is ambiguous for this path.
    pub fn candidates(&self, path: &str) -> Vec<Arc<dyn Descriptor>> {
        self.descriptors
            .iter()
            .filter(|d| d.match_resource(path).is_some())
            .cloned()
            .collect()
    }

    pub fn descriptors(&self) -> &[Arc<dyn Descriptor>] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
