use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The L1 blocks the block and message streams are synced to.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SyncPoint {
    /// The last L1 block the L2 blocks were synced from.
    pub blocks_synced_to: Option<u64>,
    /// The last L1 block the L1 to L2 messages were synced from.
    pub messages_synced_to: Option<u64>,
}

/// The latest L1 block observed by the archiver.
#[derive(Debug, Display, Default, Copy, Clone, PartialEq, Eq)]
#[display("L1Snapshot {{ block_number: {block_number}, timestamp: {timestamp} }}")]
pub struct L1Snapshot {
    /// The L1 block number.
    pub block_number: u64,
    /// The L1 block timestamp.
    pub timestamp: u64,
}

/// The rollup constants needed to map L1 time to L2 slots and epochs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1RollupConstants {
    /// The L1 block the rollup was deployed at.
    pub l1_start_block: u64,
    /// The L1 timestamp of the rollup genesis.
    pub l1_genesis_time: u64,
    /// The duration of an L2 slot in seconds.
    pub slot_duration: u64,
    /// The duration of an L1 slot in seconds.
    pub ethereum_slot_duration: u64,
    /// The amount of L2 slots in an epoch.
    pub epoch_duration: u64,
}

impl Default for L1RollupConstants {
    fn default() -> Self {
        Self {
            l1_start_block: 0,
            l1_genesis_time: 0,
            slot_duration: 36,
            ethereum_slot_duration: 12,
            epoch_duration: 32,
        }
    }
}

impl L1RollupConstants {
    /// Returns the L2 slot at the provided timestamp.
    pub const fn slot_at_timestamp(&self, timestamp: u64) -> u64 {
        if self.slot_duration == 0 {
            return 0;
        }
        timestamp.saturating_sub(self.l1_genesis_time) / self.slot_duration
    }

    /// Returns the epoch of the provided L2 slot.
    pub const fn epoch_at_slot(&self, slot: u64) -> u64 {
        if self.epoch_duration == 0 {
            return 0;
        }
        slot / self.epoch_duration
    }

    /// Returns the amount of L1 blocks covering `l2_blocks` L2 slots.
    pub const fn l1_blocks_for_l2_blocks(&self, l2_blocks: u64) -> u64 {
        if self.ethereum_slot_duration == 0 {
            return l2_blocks;
        }
        l2_blocks.saturating_mul(self.slot_duration) / self.ethereum_slot_duration
    }
}
