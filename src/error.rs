use thiserror::Error;

use crate::node::NodeId;

/// Caller-facing failures. Missing keys are reported as `None`, not as errors.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TreeError {
    /// The key is NaN and cannot be ordered.
    #[error("key {0} is not comparable")]
    InvalidKey(f64),

    /// Several entries share this numeric key; remove by `(key, id)` instead.
    #[error("numeric key {0} matches more than one entry")]
    AmbiguousKey(f64),

    /// The handle refers to an entry that was removed or replaced.
    #[error("node handle {0:?} is stale")]
    StaleNode(NodeId),
}
