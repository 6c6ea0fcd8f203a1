use crate::{AppendOnlyTreeSnapshot, BlockHeader, Body, L1PublishedData, L2Block, PublishedL2Block};
use alloy_primitives::B256;
use arbitrary::{Arbitrary, Unstructured};
use rand::RngCore;

/// Contract class fixtures with valid membership proofs.
pub mod contract;

/// Returns a header decoded from random bytes.
fn random_header() -> BlockHeader {
    let mut entropy = [0u8; size_of::<BlockHeader>()];
    rand::rng().fill_bytes(&mut entropy);
    BlockHeader::arbitrary(&mut Unstructured::new(&entropy)).unwrap_or_default()
}

/// Returns the block following `parent`, with random header content.
pub fn next_block(parent: Option<&L2Block>) -> L2Block {
    let mut header = random_header();
    match parent {
        Some(parent) => {
            header.block_number = parent.number() + 1;
            header.slot_number = parent.slot_number() + 1;
            header.last_archive = parent.archive;
        }
        None => {
            header.block_number = crate::INITIAL_L2_BLOCK_NUM;
            header.slot_number = 1;
            header.last_archive = AppendOnlyTreeSnapshot::default();
        }
    }
    L2Block::new(header, Body::default())
}

/// Returns a chain of random blocks numbered from 1 to `len`.
pub fn chain(len: usize) -> Vec<L2Block> {
    chain_from(None, len)
}

/// Returns `len` random blocks following `parent`. Calling it twice with the same parent returns
/// two competing forks.
pub fn chain_from(parent: Option<&L2Block>, len: usize) -> Vec<L2Block> {
    let mut blocks: Vec<L2Block> = Vec::with_capacity(len);
    for _ in 0..len {
        let next = next_block(blocks.last().or(parent));
        blocks.push(next);
    }
    blocks
}

/// Wraps the block as published in the provided L1 block.
pub fn published(block: L2Block, l1_block_number: u64) -> PublishedL2Block {
    PublishedL2Block::new(
        block,
        L1PublishedData {
            block_number: l1_block_number,
            block_hash: B256::left_padding_from(&l1_block_number.to_be_bytes()),
            timestamp: l1_block_number * 12,
        },
    )
}
