use crate::{L1Error, L1Result, L1View, RollupStatus};
use alloy_primitives::B256;
use archiver_primitives::{InboxMessage, L1RollupConstants, PublishedL2Block, Retrieved};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct MockL1State {
    current_l1_block: u64,
    blocks: Vec<PublishedL2Block>,
    proven_block_number: u64,
    messages: Vec<InboxMessage>,
    can_prune: bool,
    failing_head_queries: usize,
}

impl MockL1State {
    fn archive_at(&self, l2_block_number: u64, at_l1_block: u64) -> Option<B256> {
        self.blocks
            .iter()
            .find(|b| b.number() == l2_block_number && b.l1.block_number <= at_l1_block)
            .map(|b| b.block.archive_root())
    }

    fn pending_at(&self, at_l1_block: u64) -> Option<&PublishedL2Block> {
        self.blocks.iter().filter(|b| b.l1.block_number <= at_l1_block).max_by_key(|b| b.number())
    }
}

/// A mock implementation of the [`L1View`] trait, backed by an in-memory rollup contract.
///
/// Only canonical blocks are kept: reorgs and prunes remove the replaced blocks, so that
/// retrieval never returns them.
#[derive(Debug)]
pub struct MockL1View {
    state: Mutex<MockL1State>,
    constants: L1RollupConstants,
    message_queries: AtomicUsize,
    block_queries: AtomicUsize,
    archive_queries: AtomicUsize,
}

impl MockL1View {
    /// Returns a new [`MockL1View`] with an empty rollup.
    pub fn new(constants: L1RollupConstants) -> Self {
        Self {
            state: Mutex::new(MockL1State::default()),
            constants,
            message_queries: AtomicUsize::new(0),
            block_queries: AtomicUsize::new(0),
            archive_queries: AtomicUsize::new(0),
        }
    }

    /// Sets the current L1 block.
    pub fn set_current_l1_block(&self, block_number: u64) {
        self.state.lock().current_l1_block = block_number;
    }

    /// Publishes the blocks on the rollup.
    pub fn publish_blocks(&self, blocks: impl IntoIterator<Item = PublishedL2Block>) {
        self.state.lock().blocks.extend(blocks);
    }

    /// Replaces every block from `l2_block_number` onwards with the provided blocks.
    pub fn reorg_from(
        &self,
        l2_block_number: u64,
        blocks: impl IntoIterator<Item = PublishedL2Block>,
    ) {
        let mut state = self.state.lock();
        state.blocks.retain(|b| b.number() < l2_block_number);
        state.blocks.extend(blocks);
    }

    /// Removes every block after `l2_block_number`.
    pub fn prune_to(&self, l2_block_number: u64) {
        self.state.lock().blocks.retain(|b| b.number() <= l2_block_number);
    }

    /// Sets the proven block number.
    pub fn set_proven_block_number(&self, block_number: u64) {
        self.state.lock().proven_block_number = block_number;
    }

    /// Inserts the messages in the inbox.
    pub fn insert_messages(&self, messages: impl IntoIterator<Item = InboxMessage>) {
        self.state.lock().messages.extend(messages);
    }

    /// Sets the result of [`L1View::can_prune_at_time`].
    pub fn set_can_prune(&self, can_prune: bool) {
        self.state.lock().can_prune = can_prune;
    }

    /// Makes the next `count` head queries fail.
    pub fn fail_next_head_queries(&self, count: usize) {
        self.state.lock().failing_head_queries = count;
    }

    /// Returns the amount of message retrieval queries issued.
    pub fn message_queries(&self) -> usize {
        self.message_queries.load(Ordering::Relaxed)
    }

    /// Returns the amount of block retrieval queries issued.
    pub fn block_queries(&self) -> usize {
        self.block_queries.load(Ordering::Relaxed)
    }

    /// Returns the amount of historical archive queries issued.
    pub fn archive_queries(&self) -> usize {
        self.archive_queries.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl L1View for MockL1View {
    async fn get_current_l1_block_number(&self) -> L1Result<u64> {
        let mut state = self.state.lock();
        if state.failing_head_queries > 0 {
            state.failing_head_queries -= 1;
            return Err(L1Error::Transport("connection refused".to_string()));
        }
        Ok(state.current_l1_block)
    }

    async fn get_l1_block_timestamp(&self, block_number: u64) -> L1Result<u64> {
        let elapsed = block_number.saturating_sub(self.constants.l1_start_block);
        Ok(self.constants.l1_genesis_time + elapsed * self.constants.ethereum_slot_duration)
    }

    async fn get_rollup_status(
        &self,
        local_pending_tip: u64,
        at_l1_block: u64,
    ) -> L1Result<RollupStatus> {
        let state = self.state.lock();
        let (pending_block_number, pending_archive) = state
            .pending_at(at_l1_block)
            .map(|b| (b.number(), b.block.archive_root()))
            .unwrap_or_default();
        let proven_block_number = state.proven_block_number.min(pending_block_number);
        let proven = state
            .blocks
            .iter()
            .find(|b| b.number() == proven_block_number && b.l1.block_number <= at_l1_block);

        Ok(RollupStatus {
            proven_block_number,
            proven_archive: proven.map(|b| b.block.archive_root()).unwrap_or_default(),
            pending_block_number,
            pending_archive,
            archive_at_local_pending_tip: state.archive_at(local_pending_tip, at_l1_block),
            proven_epoch_number: proven
                .map(|b| self.constants.epoch_at_slot(b.block.slot_number()))
                .unwrap_or_default(),
        })
    }

    async fn get_archive_root_at(
        &self,
        l2_block_number: u64,
        at_l1_block: u64,
    ) -> L1Result<Option<B256>> {
        self.archive_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self.state.lock().archive_at(l2_block_number, at_l1_block))
    }

    async fn can_prune_at_time(&self, _timestamp: u64, _at_l1_block: u64) -> L1Result<bool> {
        Ok(self.state.lock().can_prune)
    }

    async fn get_total_messages_inserted(&self) -> L1Result<u64> {
        let state = self.state.lock();
        let current = state.current_l1_block;
        Ok(state.messages.iter().filter(|m| m.l1_block_number <= current).count() as u64)
    }

    async fn retrieve_messages(&self, start: u64, end: u64) -> L1Result<Retrieved<InboxMessage>> {
        self.message_queries.fetch_add(1, Ordering::Relaxed);
        let state = self.state.lock();
        let messages = state
            .messages
            .iter()
            .filter(|m| (start..=end).contains(&m.l1_block_number))
            .copied()
            .collect::<Vec<_>>();

        Ok(match messages.last().map(|m| m.l1_block_number) {
            Some(last) => Retrieved::new(messages, start..=end, last),
            None => Retrieved::empty(start..=end),
        })
    }

    async fn retrieve_blocks(&self, start: u64, end: u64) -> L1Result<Retrieved<PublishedL2Block>> {
        self.block_queries.fetch_add(1, Ordering::Relaxed);
        let state = self.state.lock();
        let mut blocks = state
            .blocks
            .iter()
            .filter(|b| (start..=end).contains(&b.l1.block_number))
            .cloned()
            .collect::<Vec<_>>();
        blocks.sort_by_key(|b| b.number());

        Ok(match blocks.iter().map(|b| b.l1.block_number).max() {
            Some(last) => Retrieved::new(blocks, start..=end, last),
            None => Retrieved::empty(start..=end),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archiver_primitives::test_utils::{chain, published};

    #[tokio::test]
    async fn test_should_report_archive_at_local_tip() -> eyre::Result<()> {
        // Given
        let l1 = MockL1View::new(L1RollupConstants::default());
        let blocks = chain(3);
        l1.publish_blocks(
            blocks.iter().cloned().enumerate().map(|(i, b)| published(b, 10 + i as u64)),
        );
        l1.set_proven_block_number(1);

        // When
        let status = l1.get_rollup_status(2, 11).await?;

        // Then
        assert_eq!(status.pending_block_number, 2);
        assert_eq!(status.pending_archive, blocks[1].archive_root());
        assert_eq!(status.proven_archive, blocks[0].archive_root());
        assert_eq!(status.archive_at_local_pending_tip, Some(blocks[1].archive_root()));

        Ok(())
    }

    #[tokio::test]
    async fn test_should_return_empty_window() -> eyre::Result<()> {
        let l1 = MockL1View::new(L1RollupConstants::default());

        let retrieved = l1.retrieve_blocks(5, 9).await?;

        assert!(retrieved.is_empty());
        assert_eq!(retrieved.last_processed_l1_block_number, 4);
        assert_eq!(l1.block_queries(), 1);

        Ok(())
    }
}
