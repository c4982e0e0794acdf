use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::index::VectorIndex;

/// Shared, read-mostly reference to the live index.
///
/// Readers take an `Arc` snapshot and keep it for the whole query. A rebuild
/// constructs a complete new index elsewhere and swaps it in with `publish`,
/// so no query ever observes a partially built index.
pub struct IndexHandle {
    current: ArcSwap<VectorIndex>,
}

impl IndexHandle {
    pub fn new(index: VectorIndex) -> Self {
        Self { current: ArcSwap::from_pointee(index) }
    }

    pub fn current(&self) -> Arc<VectorIndex> {
        self.current.load_full()
    }

    /// Replace the live index; returns the one it replaced.
    pub fn publish(&self, index: VectorIndex) -> Arc<VectorIndex> {
        self.current.swap(Arc::new(index))
    }
}
