use thiserror::Error;

/// The crate-wide error kinds.
///
/// All of these except [`EngineError::LockOwnership`] are recoverable from
/// the caller's perspective: the core never aborts a build or search run
/// because a single unit failed. `LockOwnership` indicates a programming
/// bug (a writer-unlock from the wrong thread) and is fatal.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("input missing: {0}")]
    InputMissing(String),

    #[error("io error on {unit}: {source}")]
    Io {
        unit: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("write lock released by thread {actual:?}, but was acquired by {expected:?}")]
    LockOwnership {
        expected: std::thread::ThreadId,
        actual: std::thread::ThreadId,
    },

    #[error("task failed: {0}")]
    TaskFailure(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
