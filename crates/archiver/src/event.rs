/// An event emitted by the [`crate::Archiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiverEvent {
    /// The pending chain is about to be pruned on L1 and was unwound to the proven tip.
    L2PruneDetected {
        /// The local pending tip before the unwind.
        block_number: u64,
        /// The slot of the local pending tip.
        slot_number: u64,
        /// The epoch of the local pending tip.
        epoch_number: u64,
    },
    /// New blocks were added to the chain.
    BlocksAdded {
        /// The first added block.
        from: u64,
        /// The last added block.
        to: u64,
    },
    /// The chain was unwound because of a mismatch with L1.
    ChainUnwound {
        /// The tip before the unwind.
        from: u64,
        /// The tip after the unwind.
        to: u64,
    },
    /// The proven chain advanced.
    ProvenChainUpdated {
        /// The proven block number.
        block_number: u64,
        /// The proven epoch.
        epoch_number: u64,
    },
}
