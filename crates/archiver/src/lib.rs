//! The archiver syncs the L2 chain, the L1 to L2 messages and the contract entities derived from
//! the chain out of the rollup contracts on L1.
//!
//! Every pass reads the L1 head once, then syncs the messages, the blocks (detecting and unwinding
//! reorgs of the pending chain along the way) and finally checks whether the pending chain is
//! about to be pruned on L1.

pub use args::ArchiverArgs;
mod args;

mod blocks;

pub use config::{
    ArchiverConfig, DEFAULT_BATCH_SIZE, DEFAULT_EXTRACTION_CONCURRENCY, DEFAULT_POLLING_INTERVAL,
};
mod config;

pub use error::{ArchiverError, SchedulerError};
mod error;

pub use event::ArchiverEvent;
mod event;

mod extraction;
mod messages;

mod metrics;

pub use planner::BatchRangePlanner;
mod planner;

mod prune;

pub use scheduler::SyncScheduler;
mod scheduler;

pub use source::ArchiverSource;
mod source;

use archiver_l1::L1View;
use archiver_primitives::{L1RollupConstants, L1Snapshot, SyncPoint};
use archiver_store::ArchiverStore;
use error::ArchiverResult;
use extraction::EntityExtractor;
use metrics::ArchiverMetrics;
use std::time::Instant;
use tokio::sync::{broadcast, watch};

/// The capacity of the archiver event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// The state owned by the sync loop.
#[derive(Debug, Default, Clone, Copy)]
struct SyncState {
    /// The latest observed L1 block.
    l1_snapshot: Option<L1Snapshot>,
}

/// Syncs the L2 chain from L1 into the store.
#[derive(Debug)]
pub struct Archiver<L1, S> {
    /// The L1 view.
    l1: L1,
    /// The archiver store.
    store: S,
    /// Persists blocks and the entities they carry.
    extractor: EntityExtractor<S>,
    /// The archiver configuration.
    config: ArchiverConfig,
    /// The rollup constants.
    constants: L1RollupConstants,
    /// The L1 search window planner.
    planner: BatchRangePlanner,
    /// The state of the sync loop.
    state: SyncState,
    /// Publishes the latest L1 snapshot to readers.
    l1_snapshot: watch::Sender<Option<L1Snapshot>>,
    /// The archiver events.
    events: broadcast::Sender<ArchiverEvent>,
    /// The archiver metrics.
    metrics: ArchiverMetrics,
}

impl<L1, S> Archiver<L1, S>
where
    L1: L1View,
    S: ArchiverStore + Clone,
{
    /// Returns a new [`Archiver`].
    pub fn new(l1: L1, store: S, config: ArchiverConfig, constants: L1RollupConstants) -> Self {
        let metrics = ArchiverMetrics::default();
        let extractor =
            EntityExtractor::new(store.clone(), config.extraction_concurrency, metrics.clone());
        let (l1_snapshot, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            l1,
            store,
            extractor,
            planner: BatchRangePlanner::new(config.batch_size, &constants),
            config,
            constants,
            state: SyncState::default(),
            l1_snapshot,
            events,
            metrics,
        }
    }

    /// Returns the read-only query surface over the synced data.
    pub fn source(&self) -> ArchiverSource<S> {
        ArchiverSource::new(self.store.clone(), self.l1_snapshot.subscribe(), self.constants)
    }

    /// Returns a receiver for the archiver events.
    pub fn subscribe(&self) -> broadcast::Receiver<ArchiverEvent> {
        self.events.subscribe()
    }

    /// Returns the archiver configuration.
    pub const fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    /// Returns the rollup constants.
    pub const fn constants(&self) -> &L1RollupConstants {
        &self.constants
    }

    /// Returns the latest observed L1 block, if any.
    pub const fn l1_snapshot(&self) -> Option<L1Snapshot> {
        self.state.l1_snapshot
    }

    /// Returns the L2 slot of the next L1 block.
    pub fn get_l2_slot_number(&self) -> Option<u64> {
        self.state.l1_snapshot.map(|snapshot| next_l2_slot(&self.constants, snapshot))
    }

    /// Returns the L2 epoch of the next L1 block.
    pub fn get_l2_epoch_number(&self) -> Option<u64> {
        self.get_l2_slot_number().map(|slot| self.constants.epoch_at_slot(slot))
    }

    /// Runs a single sync pass. Failed passes leave the pointers at their last committed value,
    /// so the next pass resumes from there.
    #[tracing::instrument(skip(self))]
    pub async fn sync(&mut self, initial_run: bool) -> Result<(), ArchiverError> {
        let start = Instant::now();
        let res = self.sync_inner(initial_run).await;
        if let Err(err) = &res {
            self.metrics.failed_syncs.increment(1);
            tracing::error!(target: "archiver::sync", %err, "sync failed");
        }
        self.metrics.sync_duration.record(start.elapsed().as_secs_f64());
        res
    }

    async fn sync_inner(&mut self, initial_run: bool) -> ArchiverResult<()> {
        let current_l1_block = self.l1.get_current_l1_block_number().await?;
        self.update_l1_snapshot(current_l1_block).await?;

        let SyncPoint { blocks_synced_to, messages_synced_to } =
            self.store.get_sync_point().await?;
        // the rollup deployment block is searched too.
        let default_synced_to = self.constants.l1_start_block.saturating_sub(1);
        let blocks_synced_to = blocks_synced_to.unwrap_or(default_synced_to);
        let messages_synced_to = messages_synced_to.unwrap_or(default_synced_to);

        if initial_run {
            tracing::info!(
                target: "archiver::sync",
                blocks_synced_to,
                messages_synced_to,
                current_l1_block,
                "starting initial archiver sync"
            );
        }

        self.handle_l1_to_l2_messages(messages_synced_to, current_l1_block).await?;

        if current_l1_block > blocks_synced_to {
            let status = self.handle_l2_blocks(blocks_synced_to, current_l1_block).await?;
            self.handle_epoch_prune(status.proven_block_number, current_l1_block).await?;
        }

        if initial_run {
            tracing::info!(
                target: "archiver::sync",
                current_l1_block,
                "initial archiver sync complete"
            );
        }
        Ok(())
    }

    /// Refreshes the L1 snapshot if the L1 head moved.
    async fn update_l1_snapshot(&mut self, current_l1_block: u64) -> ArchiverResult<()> {
        if self.state.l1_snapshot.is_some_and(|s| s.block_number >= current_l1_block) {
            return Ok(());
        }

        let timestamp = self.l1.get_l1_block_timestamp(current_l1_block).await?;
        let snapshot = L1Snapshot { block_number: current_l1_block, timestamp };
        self.state.l1_snapshot = Some(snapshot);
        self.l1_snapshot.send_replace(Some(snapshot));
        self.metrics.l1_block_number.set(current_l1_block as f64);
        tracing::trace!(target: "archiver::sync", %snapshot, "updated L1 snapshot");

        Ok(())
    }

    /// Broadcasts the event to the subscribers, if any.
    fn notify(&self, event: ArchiverEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!(target: "archiver::sync", ?event, "no subscriber for archiver event");
        }
    }
}

/// Returns the L2 slot of the L1 block following the snapshot.
pub(crate) const fn next_l2_slot(constants: &L1RollupConstants, snapshot: L1Snapshot) -> u64 {
    constants.slot_at_timestamp(snapshot.timestamp + constants.ethereum_slot_duration)
}
