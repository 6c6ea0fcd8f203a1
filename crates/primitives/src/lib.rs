//! Primitive types for the rollup archiver.

pub use block::{AppendOnlyTreeSnapshot, BlockHeader, Body, L2Block, TxEffect};
mod block;

pub use contract::{
    compute_artifact_hash, compute_contract_class_id, compute_function_artifact_leaf,
    compute_private_function_leaf, compute_private_functions_root,
    compute_public_bytecode_commitment, BroadcastFunction, ContractClass, ContractInstance,
    ContractInstanceUpdate, ExecutablePrivateFunctionWithMembershipProof, FunctionSelector,
    PrivateFunction, PublicKeys, UtilityFunctionWithMembershipProof,
    ARTIFACT_FUNCTION_TREE_HEIGHT, FUNCTION_TREE_HEIGHT,
};
mod contract;

pub use events::{
    ContractClassRegisteredEvent, ContractInstanceDeployedEvent, ContractInstanceUpdatedEvent,
    PrivateFunctionBroadcastedEvent, ProtocolEvent, UtilityFunctionBroadcastedEvent,
    CONTRACT_CLASS_REGISTERED_MAGIC_VALUE, CONTRACT_CLASS_REGISTERER_ADDRESS,
    CONTRACT_INSTANCE_DEPLOYED_TAG, CONTRACT_INSTANCE_DEPLOYER_ADDRESS,
    CONTRACT_INSTANCE_UPDATED_MAGIC_VALUE, PRIVATE_FUNCTION_BROADCASTED_MAGIC_VALUE,
    UTILITY_FUNCTION_BROADCASTED_MAGIC_VALUE,
};
mod events;

pub use error::EventDecodeError;
mod error;

pub use fields::{bytes_to_fields, field_from_u64, fields_to_bytes, FieldReader, BYTES_PER_FIELD};
mod fields;

pub use hash::{compute_root_from_sibling_path, hash_bytes, hash_fields, MerkleTree};
mod hash;

pub use logs::{ContractClassLog, PrivateLog, PublicLog};
mod logs;

pub use message::{InboxMessage, INITIAL_L2_BLOCK_NUM, L1_TO_L2_MSG_SUBTREE_HEIGHT};
mod message;

pub use published::{L1PublishedData, PublishedBlock, PublishedL2Block, Retrieved};
mod published;

pub use sync::{L1RollupConstants, L1Snapshot, SyncPoint};
mod sync;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers
pub mod test_utils;

/// An address on the L2. Addresses are field elements.
pub type L2Address = alloy_primitives::B256;
