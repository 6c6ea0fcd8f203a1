use metrics::{Counter, Gauge, Histogram};
use metrics_derive::Metrics;

/// The metrics for the [`super::Archiver`].
#[derive(Metrics, Clone)]
#[metrics(scope = "archiver")]
pub(crate) struct ArchiverMetrics {
    /// A counter on the synced L2 blocks.
    pub(crate) blocks_synced: Counter,
    /// A counter on the synced L1 to L2 messages.
    pub(crate) messages_synced: Counter,
    /// A counter on the predicted prunes.
    pub(crate) prunes: Counter,
    /// A counter on the unwinds caused by an archive mismatch.
    pub(crate) reorgs: Counter,
    /// A counter on the unwound blocks.
    pub(crate) unwound_blocks: Counter,
    /// A counter on the broadcast functions skipped because of an unknown class.
    pub(crate) skipped_functions: Counter,
    /// A counter on the broadcast functions dropped because of an invalid membership proof.
    pub(crate) invalid_functions: Counter,
    /// A counter on the failed sync passes.
    pub(crate) failed_syncs: Counter,
    /// The latest synced L2 block.
    pub(crate) l2_block_number: Gauge,
    /// The latest proven L2 block.
    pub(crate) proven_block_number: Gauge,
    /// The latest observed L1 block.
    pub(crate) l1_block_number: Gauge,
    /// A histogram of the sync pass duration.
    pub(crate) sync_duration: Histogram,
    /// A histogram of the processing duration per block.
    pub(crate) block_processing_duration: Histogram,
}
