use alloy_primitives::B256;
use derive_more::Display;

/// The number of the first L2 block.
pub const INITIAL_L2_BLOCK_NUM: u64 = 1;

/// The height of the subtree of L1 to L2 messages inserted per L2 block.
pub const L1_TO_L2_MSG_SUBTREE_HEIGHT: u32 = 4;

/// An L1 to L2 message, as inserted in the inbox contract.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("InboxMessage {{ index: {index}, l2_block_number: {l2_block_number}, l1_block_number: {l1_block_number} }}")]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct InboxMessage {
    /// The global index of the message in the L1 to L2 message tree.
    pub index: u64,
    /// The message leaf.
    pub leaf: B256,
    /// The L1 block number the message was emitted in.
    pub l1_block_number: u64,
    /// The L1 block hash the message was emitted in.
    pub l1_block_hash: B256,
    /// The L2 block the message is meant to be included in.
    pub l2_block_number: u64,
}

impl InboxMessage {
    /// Returns the number of messages in the subtree of a single L2 block.
    pub const fn messages_per_block() -> u64 {
        1 << L1_TO_L2_MSG_SUBTREE_HEIGHT
    }

    /// Returns the smallest message index for the provided L2 block.
    pub const fn smallest_index_from_l2_block(l2_block_number: u64) -> u64 {
        l2_block_number.saturating_sub(INITIAL_L2_BLOCK_NUM) * Self::messages_per_block()
    }

    /// Returns the L2 block the message index belongs to.
    pub const fn l2_block_from_index(index: u64) -> u64 {
        index / Self::messages_per_block() + INITIAL_L2_BLOCK_NUM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_should_map_to_l2_block() {
        assert_eq!(InboxMessage::smallest_index_from_l2_block(1), 0);
        assert_eq!(InboxMessage::smallest_index_from_l2_block(3), 32);
        assert_eq!(InboxMessage::l2_block_from_index(31), 2);
        assert_eq!(InboxMessage::l2_block_from_index(32), 3);
    }
}
