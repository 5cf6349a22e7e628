use thiserror::Error;

/// Errors surfaced by container operations.
///
/// Out-of-domain insertions, empty cells and failed point locations are not
/// errors; they are reported through the return values of the operations
/// that produce them.
#[derive(Debug, Error)]
pub enum Error {
    /// A block's particle arrays would have to grow past the hard ceiling,
    /// [`MAX_PARTICLE_MEMORY`](crate::MAX_PARTICLE_MEMORY).
    #[error("block {block}: requested capacity {requested} exceeds the particle memory ceiling")]
    MemoryExceeded { block: usize, requested: usize },

    /// The worker thread pool could not be constructed.
    #[error("failed to build worker thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
