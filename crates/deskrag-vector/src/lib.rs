//! Vector index, its on-disk artifact, and the build/load lifecycle.

pub mod artifact;
pub mod builder;
pub mod handle;
pub mod index;

pub use builder::IndexBuilder;
pub use handle::IndexHandle;
pub use index::VectorIndex;
