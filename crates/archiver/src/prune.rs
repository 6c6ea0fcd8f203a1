use crate::{error::ArchiverResult, Archiver, ArchiverError, ArchiverEvent};
use archiver_l1::L1View;
use archiver_store::ArchiverStore;

impl<L1, S> Archiver<L1, S>
where
    L1: L1View,
    S: ArchiverStore + Clone,
{
    /// Unwinds the pending chain to the proven tip if the rollup would accept a prune at the next
    /// L1 slot.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn handle_epoch_prune(
        &self,
        proven_block_number: u64,
        current_l1_block: u64,
    ) -> ArchiverResult<()> {
        let Some(snapshot) = self.state.l1_snapshot else {
            return Ok(());
        };
        let local_pending = self.store.get_synced_l2_block_number().await?;
        if local_pending <= proven_block_number {
            return Ok(());
        }

        let time = snapshot.timestamp + self.constants.ethereum_slot_duration;
        if !self.l1.can_prune_at_time(time, current_l1_block).await? {
            return Ok(());
        }

        let tip = self
            .store
            .get_block(local_pending)
            .await?
            .ok_or(ArchiverError::MissingLocalBlock(local_pending))?;
        let slot_number = tip.block.slot_number();
        let epoch_number = self.constants.epoch_at_slot(slot_number);
        let count = local_pending - proven_block_number;

        self.extractor.unwind_blocks(local_pending, count).await?;
        self.metrics.prunes.increment(1);
        self.metrics.l2_block_number.set(proven_block_number as f64);
        self.notify(ArchiverEvent::L2PruneDetected {
            block_number: local_pending,
            slot_number,
            epoch_number,
        });
        tracing::warn!(
            target: "archiver::prune",
            from = local_pending,
            to = proven_block_number,
            slot_number,
            epoch_number,
            "unwound pending chain ahead of a rollup prune"
        );

        Ok(())
    }
}
