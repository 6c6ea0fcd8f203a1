//! Contract classes, instances and the hashing used to validate them.

use crate::{
    bytes_to_fields, compute_root_from_sibling_path, field_from_u64, hash_bytes, hash_fields,
    L2Address, MerkleTree,
};
use alloy_primitives::B256;
use derive_more::{Display, From};

/// The height of the private functions tree of a contract class.
pub const FUNCTION_TREE_HEIGHT: usize = 5;

/// The height of the private and utility artifact trees of a contract class.
pub const ARTIFACT_FUNCTION_TREE_HEIGHT: usize = 5;

/// The selector of a contract function.
#[derive(Debug, Display, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, From)]
#[display("0x{_0:08x}")]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct FunctionSelector(pub u32);

impl FunctionSelector {
    /// Returns the field representation of the selector.
    pub fn to_field(self) -> B256 {
        field_from_u64(self.0 as u64)
    }
}

/// A private function of a contract class, as committed to in the private functions tree.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct PrivateFunction {
    /// The function selector.
    pub selector: FunctionSelector,
    /// The hash of the verification key of the function.
    pub vk_hash: B256,
}

/// Returns the leaf of a private function in the private functions tree.
pub fn compute_private_function_leaf(function: &PrivateFunction) -> B256 {
    hash_fields(&[function.selector.to_field(), function.vk_hash])
}

/// Returns the root of the private functions tree. Leaves are sorted by selector.
pub fn compute_private_functions_root(functions: &[PrivateFunction]) -> B256 {
    let mut functions = functions.to_vec();
    functions.sort_by_key(|f| f.selector);
    let leaves = functions.iter().map(compute_private_function_leaf).collect::<Vec<_>>();
    MerkleTree::new(&leaves, FUNCTION_TREE_HEIGHT).root()
}

/// Returns the leaf of a function in an artifact tree.
pub fn compute_function_artifact_leaf(
    selector: FunctionSelector,
    metadata_hash: B256,
    bytecode: &[u8],
) -> B256 {
    hash_fields(&[selector.to_field(), metadata_hash, hash_bytes(bytecode)])
}

/// Returns the artifact hash of a contract class.
pub fn compute_artifact_hash(
    private_functions_artifact_root: B256,
    utility_functions_artifact_root: B256,
    artifact_metadata_hash: B256,
) -> B256 {
    hash_fields(&[
        private_functions_artifact_root,
        utility_functions_artifact_root,
        artifact_metadata_hash,
    ])
}

/// Returns the commitment to the packed public bytecode of a contract class.
pub fn compute_public_bytecode_commitment(packed_bytecode: &[u8]) -> B256 {
    hash_fields(&bytes_to_fields(packed_bytecode))
}

/// Returns the contract class id.
pub fn compute_contract_class_id(
    artifact_hash: B256,
    private_functions_root: B256,
    public_bytecode_commitment: B256,
) -> B256 {
    hash_fields(&[artifact_hash, private_functions_root, public_bytecode_commitment])
}

/// A private function broadcast along with the proofs of its membership in a class.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct ExecutablePrivateFunctionWithMembershipProof {
    /// The function selector.
    pub selector: FunctionSelector,
    /// The hash of the verification key.
    pub vk_hash: B256,
    /// The function bytecode.
    pub bytecode: Vec<u8>,
    /// The hash of the function metadata.
    pub metadata_hash: B256,
    /// The hash of the class artifact metadata.
    pub artifact_metadata_hash: B256,
    /// The root of the utility functions artifact tree.
    pub utility_functions_artifact_tree_root: B256,
    /// The sibling path of the function in the private functions tree.
    pub private_function_tree_sibling_path: Vec<B256>,
    /// The leaf index of the function in the private functions tree.
    pub private_function_tree_leaf_index: u64,
    /// The sibling path of the function in the private artifact tree.
    pub artifact_tree_sibling_path: Vec<B256>,
    /// The leaf index of the function in the private artifact tree.
    pub artifact_tree_leaf_index: u64,
}

impl ExecutablePrivateFunctionWithMembershipProof {
    /// Returns true if the proofs place the function in the provided class.
    pub fn is_valid_for(&self, class: &ContractClass) -> bool {
        let function = PrivateFunction { selector: self.selector, vk_hash: self.vk_hash };
        let functions_root = compute_root_from_sibling_path(
            compute_private_function_leaf(&function),
            self.private_function_tree_leaf_index,
            &self.private_function_tree_sibling_path,
        );
        if functions_root != class.private_functions_root {
            return false;
        }

        let artifact_root = compute_root_from_sibling_path(
            compute_function_artifact_leaf(self.selector, self.metadata_hash, &self.bytecode),
            self.artifact_tree_leaf_index,
            &self.artifact_tree_sibling_path,
        );
        compute_artifact_hash(
            artifact_root,
            self.utility_functions_artifact_tree_root,
            self.artifact_metadata_hash,
        ) == class.artifact_hash
    }
}

/// A utility function broadcast along with the proof of its membership in a class.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct UtilityFunctionWithMembershipProof {
    /// The function selector.
    pub selector: FunctionSelector,
    /// The hash of the function metadata.
    pub metadata_hash: B256,
    /// The function bytecode.
    pub bytecode: Vec<u8>,
    /// The hash of the class artifact metadata.
    pub artifact_metadata_hash: B256,
    /// The root of the private functions artifact tree.
    pub private_functions_artifact_tree_root: B256,
    /// The sibling path of the function in the utility artifact tree.
    pub artifact_tree_sibling_path: Vec<B256>,
    /// The leaf index of the function in the utility artifact tree.
    pub artifact_tree_leaf_index: u64,
}

impl UtilityFunctionWithMembershipProof {
    /// Returns true if the proof places the function in the provided class.
    pub fn is_valid_for(&self, class: &ContractClass) -> bool {
        let artifact_root = compute_root_from_sibling_path(
            compute_function_artifact_leaf(self.selector, self.metadata_hash, &self.bytecode),
            self.artifact_tree_leaf_index,
            &self.artifact_tree_sibling_path,
        );
        compute_artifact_hash(
            self.private_functions_artifact_tree_root,
            artifact_root,
            self.artifact_metadata_hash,
        ) == class.artifact_hash
    }
}

/// A function broadcast for an already registered class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub enum BroadcastFunction {
    /// A private function.
    Private(ExecutablePrivateFunctionWithMembershipProof),
    /// A utility function.
    Utility(UtilityFunctionWithMembershipProof),
}

impl BroadcastFunction {
    /// Returns the selector of the function.
    pub const fn selector(&self) -> FunctionSelector {
        match self {
            Self::Private(f) => f.selector,
            Self::Utility(f) => f.selector,
        }
    }

    /// Returns true if the function membership proof is valid for the class.
    pub fn is_valid_for(&self, class: &ContractClass) -> bool {
        match self {
            Self::Private(f) => f.is_valid_for(class),
            Self::Utility(f) => f.is_valid_for(class),
        }
    }
}

/// A registered contract class.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct ContractClass {
    /// The class id.
    pub id: B256,
    /// The class version.
    pub version: u64,
    /// The artifact hash.
    pub artifact_hash: B256,
    /// The root of the private functions tree.
    pub private_functions_root: B256,
    /// The packed public bytecode.
    pub packed_bytecode: Vec<u8>,
    /// The private functions broadcast for the class.
    pub private_functions: Vec<ExecutablePrivateFunctionWithMembershipProof>,
    /// The utility functions broadcast for the class.
    pub utility_functions: Vec<UtilityFunctionWithMembershipProof>,
}

impl ContractClass {
    /// Returns the commitment to the public bytecode of the class.
    pub fn public_bytecode_commitment(&self) -> B256 {
        compute_public_bytecode_commitment(&self.packed_bytecode)
    }

    /// Returns the class id computed from the class content.
    pub fn compute_id(&self) -> B256 {
        compute_contract_class_id(
            self.artifact_hash,
            self.private_functions_root,
            self.public_bytecode_commitment(),
        )
    }

    /// Adds the functions to the class, skipping selectors that are already known. Returns the
    /// amount of functions added.
    pub fn add_functions(
        &mut self,
        functions: impl IntoIterator<Item = BroadcastFunction>,
    ) -> usize {
        let mut added = 0;
        for function in functions {
            match function {
                BroadcastFunction::Private(f) => {
                    if !self.private_functions.iter().any(|known| known.selector == f.selector) {
                        self.private_functions.push(f);
                        added += 1;
                    }
                }
                BroadcastFunction::Utility(f) => {
                    if !self.utility_functions.iter().any(|known| known.selector == f.selector) {
                        self.utility_functions.push(f);
                        added += 1;
                    }
                }
            }
        }
        added
    }
}

/// The public keys of a contract instance.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct PublicKeys {
    /// The nullifier public key.
    pub master_nullifier_public_key: B256,
    /// The incoming viewing public key.
    pub master_incoming_viewing_public_key: B256,
    /// The outgoing viewing public key.
    pub master_outgoing_viewing_public_key: B256,
    /// The tagging public key.
    pub master_tagging_public_key: B256,
}

/// A deployed contract instance.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct ContractInstance {
    /// The instance address.
    pub address: L2Address,
    /// The instance version.
    pub version: u64,
    /// The deployment salt.
    pub salt: B256,
    /// The deployer of the instance.
    pub deployer: L2Address,
    /// The class currently backing the instance.
    pub current_contract_class_id: B256,
    /// The class the instance was deployed with.
    pub original_contract_class_id: B256,
    /// The initialization hash.
    pub initialization_hash: B256,
    /// The instance public keys.
    pub public_keys: PublicKeys,
}

/// A scheduled change of the class backing a contract instance.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct ContractInstanceUpdate {
    /// The instance address.
    pub address: L2Address,
    /// The class before the update.
    pub prev_contract_class_id: B256,
    /// The class after the update.
    pub new_contract_class_id: B256,
    /// The L2 block from which the update applies.
    pub block_of_change: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_deduplicate_functions_by_selector() {
        let mut class = ContractClass::default();
        let private = ExecutablePrivateFunctionWithMembershipProof {
            selector: FunctionSelector(1),
            ..Default::default()
        };
        let utility = UtilityFunctionWithMembershipProof {
            selector: FunctionSelector(2),
            ..Default::default()
        };

        let added = class.add_functions([
            BroadcastFunction::Private(private.clone()),
            BroadcastFunction::Utility(utility.clone()),
        ]);
        assert_eq!(added, 2);

        let added = class.add_functions([
            BroadcastFunction::Private(private),
            BroadcastFunction::Utility(utility),
        ]);
        assert_eq!(added, 0);
        assert_eq!(class.private_functions.len(), 1);
        assert_eq!(class.utility_functions.len(), 1);
    }

    #[test]
    fn test_private_functions_root_should_not_depend_on_order() {
        let a = PrivateFunction { selector: FunctionSelector(3), vk_hash: B256::repeat_byte(1) };
        let b = PrivateFunction { selector: FunctionSelector(1), vk_hash: B256::repeat_byte(2) };

        assert_eq!(
            compute_private_functions_root(&[a, b]),
            compute_private_functions_root(&[b, a])
        );
    }
}
