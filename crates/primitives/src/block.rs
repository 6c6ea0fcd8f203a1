use crate::{field_from_u64, hash_fields, ContractClassLog, L2Address, PrivateLog, PublicLog};
use alloy_primitives::{Address, B256, U256};

/// A snapshot of an append only tree.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct AppendOnlyTreeSnapshot {
    /// The root of the tree.
    pub root: B256,
    /// The index of the next free leaf.
    pub next_available_leaf_index: u64,
}

impl AppendOnlyTreeSnapshot {
    /// Returns a new instance of [`AppendOnlyTreeSnapshot`].
    pub const fn new(root: B256, next_available_leaf_index: u64) -> Self {
        Self { root, next_available_leaf_index }
    }

    /// Returns the snapshot of the archive after appending the block hash.
    pub fn append(&self, block_hash: B256) -> Self {
        Self {
            root: hash_fields(&[self.root, block_hash]),
            next_available_leaf_index: self.next_available_leaf_index + 1,
        }
    }
}

/// The header of an L2 block.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct BlockHeader {
    /// The archive snapshot before this block was appended.
    pub last_archive: AppendOnlyTreeSnapshot,
    /// The commitment over the block content.
    pub content_commitment: B256,
    /// The L2 chain id.
    pub chain_id: u64,
    /// The rollup version.
    pub version: u64,
    /// The block number.
    pub block_number: u64,
    /// The slot the block was proposed in.
    pub slot_number: u64,
    /// The block timestamp.
    pub timestamp: u64,
    /// The L1 address receiving the block rewards.
    pub coinbase: Address,
    /// The L2 address receiving the block fees.
    pub fee_recipient: L2Address,
    /// The sum of the fees paid by the block transactions.
    pub total_fees: U256,
    /// The total mana used by the block.
    pub total_mana_used: u64,
}

impl BlockHeader {
    /// Returns the hash of the header.
    pub fn hash(&self) -> B256 {
        hash_fields(&[
            self.last_archive.root,
            field_from_u64(self.last_archive.next_available_leaf_index),
            self.content_commitment,
            field_from_u64(self.chain_id),
            field_from_u64(self.version),
            field_from_u64(self.block_number),
            field_from_u64(self.slot_number),
            field_from_u64(self.timestamp),
            self.coinbase.into_word(),
            self.fee_recipient,
            B256::from(self.total_fees.to_be_bytes::<32>()),
            field_from_u64(self.total_mana_used),
        ])
    }
}

/// The effects of a single transaction.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct TxEffect {
    /// The hash of the transaction.
    pub tx_hash: B256,
    /// The fee paid by the transaction.
    pub transaction_fee: U256,
    /// The nullifiers emitted by the transaction.
    pub nullifiers: Vec<B256>,
    /// The private logs emitted by the transaction.
    pub private_logs: Vec<PrivateLog>,
    /// The public logs emitted by the transaction.
    pub public_logs: Vec<PublicLog>,
    /// The contract class logs emitted by the transaction.
    pub contract_class_logs: Vec<ContractClassLog>,
}

/// The body of an L2 block.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct Body {
    /// The ordered transaction effects.
    pub tx_effects: Vec<TxEffect>,
}

/// An L2 block.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct L2Block {
    /// The archive snapshot after this block was appended.
    pub archive: AppendOnlyTreeSnapshot,
    /// The block header.
    pub header: BlockHeader,
    /// The block body.
    pub body: Body,
}

impl L2Block {
    /// Returns a new [`L2Block`], computing the archive from the header.
    pub fn new(header: BlockHeader, body: Body) -> Self {
        let archive = header.last_archive.append(header.hash());
        Self { archive, header, body }
    }

    /// Returns the block number.
    pub const fn number(&self) -> u64 {
        self.header.block_number
    }

    /// Returns the slot number.
    pub const fn slot_number(&self) -> u64 {
        self.header.slot_number
    }

    /// Returns the archive root after this block.
    pub const fn archive_root(&self) -> B256 {
        self.archive.root
    }

    /// Returns the block hash.
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// Returns an iterator over the private logs of the block, in order.
    pub fn private_logs(&self) -> impl Iterator<Item = &PrivateLog> {
        self.body.tx_effects.iter().flat_map(|tx| tx.private_logs.iter())
    }

    /// Returns an iterator over the public logs of the block, in order.
    pub fn public_logs(&self) -> impl Iterator<Item = &PublicLog> {
        self.body.tx_effects.iter().flat_map(|tx| tx.public_logs.iter())
    }

    /// Returns an iterator over the contract class logs of the block, in order.
    pub fn contract_class_logs(&self) -> impl Iterator<Item = &ContractClassLog> {
        self.body.tx_effects.iter().flat_map(|tx| tx.contract_class_logs.iter())
    }

    /// Returns an iterator over the nullifiers of the block, in order.
    pub fn nullifiers(&self) -> impl Iterator<Item = &B256> {
        self.body.tx_effects.iter().flat_map(|tx| tx.nullifiers.iter())
    }
}
