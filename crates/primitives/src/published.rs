use crate::L2Block;
use alloy_primitives::B256;
use std::ops::RangeInclusive;

/// Information about the L1 block some data was published in.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct L1PublishedData {
    /// The L1 block number.
    pub block_number: u64,
    /// The L1 block hash.
    pub block_hash: B256,
    /// The L1 block timestamp.
    pub timestamp: u64,
}

/// A block paired with the L1 block it was published in.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct PublishedBlock<T> {
    /// The published block.
    pub block: T,
    /// The L1 publication data.
    pub l1: L1PublishedData,
}

impl<T> PublishedBlock<T> {
    /// Returns a new instance of [`PublishedBlock`].
    pub const fn new(block: T, l1: L1PublishedData) -> Self {
        Self { block, l1 }
    }
}

/// An L2 block published on L1.
pub type PublishedL2Block = PublishedBlock<L2Block>;

impl PublishedL2Block {
    /// Returns the L2 block number.
    pub const fn number(&self) -> u64 {
        self.block.number()
    }
}

/// A page of data retrieved from a range of L1 blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved<T> {
    /// The retrieved data, in L1 emission order.
    pub retrieved_data: Vec<T>,
    /// The L1 block range the data was searched in.
    pub l1_range: RangeInclusive<u64>,
    /// The last L1 block the data was read from. Equals the block before the range if nothing was
    /// retrieved.
    pub last_processed_l1_block_number: u64,
}

impl<T> Retrieved<T> {
    /// Returns a new instance of [`Retrieved`].
    pub const fn new(
        retrieved_data: Vec<T>,
        l1_range: RangeInclusive<u64>,
        last_processed_l1_block_number: u64,
    ) -> Self {
        Self { retrieved_data, l1_range, last_processed_l1_block_number }
    }

    /// Returns an empty page for the range.
    pub fn empty(l1_range: RangeInclusive<u64>) -> Self {
        let last_processed_l1_block_number = l1_range.start().saturating_sub(1);
        Self { retrieved_data: Vec::new(), l1_range, last_processed_l1_block_number }
    }

    /// Returns true if no data was retrieved.
    pub fn is_empty(&self) -> bool {
        self.retrieved_data.is_empty()
    }

    /// Returns the amount of retrieved items.
    pub fn len(&self) -> usize {
        self.retrieved_data.len()
    }
}
