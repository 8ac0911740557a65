/// Failures of the fallible tree operations.
///
/// Missing keys and empty trees are not errors, those are reported as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Allocating storage for a new node failed. The tree is left unchanged.
    #[error("failed to allocate storage for a new tree node")]
    OutOfMemory,
    /// The handle does not refer to a live node of this tree, either because
    /// the node was already erased or because the handle came from another tree.
    #[error("node handle does not refer to a live node of this tree")]
    InvalidHandle,
}
