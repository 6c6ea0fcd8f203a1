use archiver_l1::L1Error;
use archiver_store::StoreError;

/// A [`Result`] that uses [`ArchiverError`] as the error type.
pub(crate) type ArchiverResult<T> = Result<T, ArchiverError>;

/// An error that occurred during a sync pass.
#[derive(Debug, thiserror::Error)]
pub enum ArchiverError {
    /// An error reading from L1.
    #[error("L1 error: {0}")]
    L1(#[from] L1Error),
    /// An error at the store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The local pending tip is missing from the store.
    #[error("missing local block {0}")]
    MissingLocalBlock(u64),
    /// A batched store write reported a failure.
    #[error("failed to {0}")]
    StoreWriteFailed(&'static str),
    /// The reorg walk exceeded the configured maximum depth.
    #[error("reorg from block {tip} is deeper than the maximum depth {max_depth}")]
    ReorgTooDeep {
        /// The local tip the walk started from.
        tip: u64,
        /// The configured maximum depth.
        max_depth: u64,
    },
}

/// An error returned by the [`crate::SyncScheduler`].
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The scheduler was already started.
    #[error("archiver is already running")]
    AlreadyRunning,
    /// The periodic sync task panicked or was aborted.
    #[error("sync task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
