use crate::{error::ArchiverResult, Archiver, ArchiverError, ArchiverEvent};
use archiver_l1::{L1View, RollupStatus};
use archiver_store::ArchiverStore;

impl<L1, S> Archiver<L1, S>
where
    L1: L1View,
    S: ArchiverStore + Clone,
{
    /// Syncs the L2 blocks published after `blocks_synced_to`, up to the current L1 block.
    ///
    /// The local pending chain is checked against the rollup first and unwound to the latest
    /// common ancestor if it diverged. Returns the rollup status the pass was based on.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn handle_l2_blocks(
        &self,
        blocks_synced_to: u64,
        current_l1_block: u64,
    ) -> ArchiverResult<RollupStatus> {
        let local_pending = self.store.get_synced_l2_block_number().await?;
        let status = self.l1.get_rollup_status(local_pending, current_l1_block).await?;
        tracing::trace!(
            target: "archiver::blocks",
            local_pending,
            ?status,
            "fetched rollup status"
        );

        if local_pending == 0 && status.pending_block_number == 0 {
            self.store.set_blocks_synced_to(current_l1_block).await?;
            tracing::debug!(
                target: "archiver::blocks",
                current_l1_block,
                "no blocks on the rollup"
            );
            return Ok(status);
        }

        self.update_proven_block(&status).await?;

        if local_pending > 0 {
            let local_tip = self
                .store
                .get_block(local_pending)
                .await?
                .ok_or(ArchiverError::MissingLocalBlock(local_pending))?;
            let local_archive = local_tip.block.archive_root();

            if status.pending_archive == local_archive {
                self.store.set_blocks_synced_to(current_l1_block).await?;
                tracing::debug!(
                    target: "archiver::blocks",
                    local_pending,
                    current_l1_block,
                    "pending chain unchanged"
                );
                return Ok(status);
            }

            if status.archive_at_local_pending_tip != Some(local_archive) {
                self.unwind_to_common_ancestor(local_pending, current_l1_block).await?;
            }
        }

        self.retrieve_blocks(blocks_synced_to, current_l1_block, &status).await?;
        self.update_proven_block(&status).await?;

        Ok(status)
    }

    /// Records the proven chain reported by the rollup, if the proven block is stored locally
    /// and its archive matches. The proven block number never decreases.
    pub(crate) async fn update_proven_block(&self, status: &RollupStatus) -> ArchiverResult<()> {
        let proven = status.proven_block_number;
        let Some(local) = self.store.get_block(proven).await? else {
            return Ok(());
        };
        if local.block.archive_root() != status.proven_archive {
            tracing::debug!(
                target: "archiver::blocks",
                proven,
                local_archive = %local.block.archive_root(),
                proven_archive = %status.proven_archive,
                "proven archive does not match local block"
            );
            return Ok(());
        }

        let local_proven = self.store.get_proven_l2_block_number().await?;
        if proven <= local_proven {
            return Ok(());
        }

        let epoch_number = status.proven_epoch_number;
        self.store.set_proven_l2_block_number(proven).await?;
        self.store.set_proven_l2_epoch_number(epoch_number).await?;
        self.metrics.proven_block_number.set(proven as f64);
        self.notify(ArchiverEvent::ProvenChainUpdated { block_number: proven, epoch_number });
        tracing::info!(
            target: "archiver::blocks",
            proven,
            previous = local_proven,
            epoch_number,
            "updated proven chain"
        );

        Ok(())
    }

    /// Unwinds the local chain from `tip` to the latest block whose archive matches the rollup.
    async fn unwind_to_common_ancestor(
        &self,
        tip: u64,
        current_l1_block: u64,
    ) -> ArchiverResult<()> {
        let ancestor = self.find_common_ancestor(tip, current_l1_block).await?;
        let count = tip - ancestor;

        self.extractor.unwind_blocks(tip, count).await?;
        self.metrics.reorgs.increment(1);
        self.metrics.l2_block_number.set(ancestor as f64);
        self.notify(ArchiverEvent::ChainUnwound { from: tip, to: ancestor });
        tracing::warn!(
            target: "archiver::blocks",
            from = tip,
            to = ancestor,
            count,
            "unwound pending chain diverging from the rollup"
        );

        Ok(())
    }

    /// Walks back from `tip` until a local block matches the archive recorded on the rollup.
    /// Returns 0 if no local block matches.
    async fn find_common_ancestor(&self, tip: u64, current_l1_block: u64) -> ArchiverResult<u64> {
        let check_depth = |candidate: u64| match self.config.max_reorg_depth {
            Some(max_depth) if tip - candidate > max_depth => {
                Err(ArchiverError::ReorgTooDeep { tip, max_depth })
            }
            _ => Ok(()),
        };

        let mut candidate = tip.saturating_sub(1);
        while candidate > 0 {
            check_depth(candidate)?;

            let local = self
                .store
                .get_block(candidate)
                .await?
                .ok_or(ArchiverError::MissingLocalBlock(candidate))?;
            let remote = self.l1.get_archive_root_at(candidate, current_l1_block).await?;
            tracing::trace!(target: "archiver::blocks", candidate, ?remote, "checking archive");
            if remote == Some(local.block.archive_root()) {
                return Ok(candidate);
            }
            candidate -= 1;
        }

        check_depth(0)?;
        Ok(0)
    }

    /// Retrieves and stores the blocks published in the L1 windows following `blocks_synced_to`.
    /// The block pointer only moves to the last L1 block a block was found in.
    async fn retrieve_blocks(
        &self,
        blocks_synced_to: u64,
        current_l1_block: u64,
        status: &RollupStatus,
    ) -> ArchiverResult<()> {
        let mut search_end = blocks_synced_to;
        loop {
            let (start, end) = self.planner.next_range(search_end, current_l1_block);
            let retrieved = self.l1.retrieve_blocks(start, end).await?;
            tracing::trace!(
                target: "archiver::blocks",
                start,
                end,
                count = retrieved.len(),
                "retrieved L2 blocks"
            );

            if !retrieved.is_empty() {
                let last_processed = retrieved.last_processed_l1_block_number;
                let local_tip = self.store.get_synced_l2_block_number().await?;
                let blocks = retrieved
                    .retrieved_data
                    .into_iter()
                    .filter(|b| b.number() > local_tip)
                    .collect::<Vec<_>>();

                if let (Some(first), Some(last)) = (blocks.first(), blocks.last()) {
                    let (from, to) = (first.number(), last.number());
                    self.extractor.add_blocks(&blocks).await?;

                    for block in &blocks {
                        tracing::info!(
                            target: "archiver::blocks",
                            number = block.number(),
                            hash = %block.block.hash(),
                            archive = %block.block.archive_root(),
                            txs = block.block.body.tx_effects.len(),
                            l1_block = block.l1.block_number,
                            "downloaded L2 block"
                        );
                    }
                    self.metrics.blocks_synced.increment(blocks.len() as u64);
                    self.metrics.l2_block_number.set(to as f64);
                    self.notify(ArchiverEvent::BlocksAdded { from, to });
                }

                self.store.set_blocks_synced_to(last_processed).await?;
                self.update_proven_block(status).await?;
            }

            search_end = end;
            if search_end >= current_l1_block {
                break;
            }
        }

        Ok(())
    }
}
