use crate::{
    compute_artifact_hash, compute_contract_class_id, compute_function_artifact_leaf,
    compute_private_function_leaf, compute_public_bytecode_commitment, BroadcastFunction,
    ContractClass, ContractClassRegisteredEvent, ExecutablePrivateFunctionWithMembershipProof,
    FunctionSelector, MerkleTree, PrivateFunction, PrivateFunctionBroadcastedEvent,
    UtilityFunctionBroadcastedEvent, UtilityFunctionWithMembershipProof,
    ARTIFACT_FUNCTION_TREE_HEIGHT, FUNCTION_TREE_HEIGHT,
};
use alloy_primitives::B256;

/// A contract class along with functions carrying valid membership proofs for it.
#[derive(Debug, Clone)]
pub struct ContractClassFixture {
    /// The registered class, without any broadcast function.
    pub class: ContractClass,
    /// The private functions of the class.
    pub private_functions: Vec<ExecutablePrivateFunctionWithMembershipProof>,
    /// The utility functions of the class.
    pub utility_functions: Vec<UtilityFunctionWithMembershipProof>,
}

impl ContractClassFixture {
    /// Returns a deterministic class derived from `seed`.
    pub fn new(seed: u8, private_count: usize, utility_count: usize) -> Self {
        let artifact_metadata_hash = B256::repeat_byte(seed);

        let private = (0..private_count)
            .map(|i| {
                let selector = FunctionSelector(i as u32 + 1);
                let vk_hash = B256::repeat_byte(seed.wrapping_add(i as u8 + 1));
                let metadata_hash = B256::repeat_byte(seed.wrapping_add(0x40 + i as u8));
                let bytecode = vec![seed; 40 + i];
                (selector, vk_hash, metadata_hash, bytecode)
            })
            .collect::<Vec<_>>();
        let utility = (0..utility_count)
            .map(|i| {
                let selector = FunctionSelector(0x1000 + i as u32);
                let metadata_hash = B256::repeat_byte(seed.wrapping_add(0x80 + i as u8));
                let bytecode = vec![seed.wrapping_add(1); 20 + i];
                (selector, metadata_hash, bytecode)
            })
            .collect::<Vec<_>>();

        let function_leaves = private
            .iter()
            .map(|(selector, vk_hash, _, _)| {
                compute_private_function_leaf(&PrivateFunction {
                    selector: *selector,
                    vk_hash: *vk_hash,
                })
            })
            .collect::<Vec<_>>();
        let functions_tree = MerkleTree::new(&function_leaves, FUNCTION_TREE_HEIGHT);

        let private_artifact_leaves = private
            .iter()
            .map(|(selector, _, metadata_hash, bytecode)| {
                compute_function_artifact_leaf(*selector, *metadata_hash, bytecode)
            })
            .collect::<Vec<_>>();
        let private_artifact_tree =
            MerkleTree::new(&private_artifact_leaves, ARTIFACT_FUNCTION_TREE_HEIGHT);

        let utility_artifact_leaves = utility
            .iter()
            .map(|(selector, metadata_hash, bytecode)| {
                compute_function_artifact_leaf(*selector, *metadata_hash, bytecode)
            })
            .collect::<Vec<_>>();
        let utility_artifact_tree =
            MerkleTree::new(&utility_artifact_leaves, ARTIFACT_FUNCTION_TREE_HEIGHT);

        let artifact_hash = compute_artifact_hash(
            private_artifact_tree.root(),
            utility_artifact_tree.root(),
            artifact_metadata_hash,
        );
        let packed_bytecode = vec![seed; 100];
        let private_functions_root = functions_tree.root();
        let id = compute_contract_class_id(
            artifact_hash,
            private_functions_root,
            compute_public_bytecode_commitment(&packed_bytecode),
        );

        let private_functions = private
            .into_iter()
            .enumerate()
            .map(|(i, (selector, vk_hash, metadata_hash, bytecode))| {
                ExecutablePrivateFunctionWithMembershipProof {
                    selector,
                    vk_hash,
                    bytecode,
                    metadata_hash,
                    artifact_metadata_hash,
                    utility_functions_artifact_tree_root: utility_artifact_tree.root(),
                    private_function_tree_sibling_path: functions_tree.sibling_path(i),
                    private_function_tree_leaf_index: i as u64,
                    artifact_tree_sibling_path: private_artifact_tree.sibling_path(i),
                    artifact_tree_leaf_index: i as u64,
                }
            })
            .collect();
        let utility_functions = utility
            .into_iter()
            .enumerate()
            .map(|(i, (selector, metadata_hash, bytecode))| UtilityFunctionWithMembershipProof {
                selector,
                metadata_hash,
                bytecode,
                artifact_metadata_hash,
                private_functions_artifact_tree_root: private_artifact_tree.root(),
                artifact_tree_sibling_path: utility_artifact_tree.sibling_path(i),
                artifact_tree_leaf_index: i as u64,
            })
            .collect();

        Self {
            class: ContractClass {
                id,
                version: 1,
                artifact_hash,
                private_functions_root,
                packed_bytecode,
                private_functions: Vec::new(),
                utility_functions: Vec::new(),
            },
            private_functions,
            utility_functions,
        }
    }

    /// Returns the event registering the class.
    pub fn registered_event(&self) -> ContractClassRegisteredEvent {
        ContractClassRegisteredEvent {
            contract_class_id: self.class.id,
            version: self.class.version,
            artifact_hash: self.class.artifact_hash,
            private_functions_root: self.class.private_functions_root,
            packed_public_bytecode: self.class.packed_bytecode.clone(),
        }
    }

    /// Returns the events broadcasting every private function of the class.
    pub fn private_broadcast_events(&self) -> Vec<PrivateFunctionBroadcastedEvent> {
        self.private_functions
            .iter()
            .cloned()
            .map(|function| PrivateFunctionBroadcastedEvent {
                contract_class_id: self.class.id,
                function,
            })
            .collect()
    }

    /// Returns the events broadcasting every utility function of the class.
    pub fn utility_broadcast_events(&self) -> Vec<UtilityFunctionBroadcastedEvent> {
        self.utility_functions
            .iter()
            .cloned()
            .map(|function| UtilityFunctionBroadcastedEvent {
                contract_class_id: self.class.id,
                function,
            })
            .collect()
    }

    /// Returns every function of the class, as broadcast.
    pub fn broadcast_functions(&self) -> Vec<BroadcastFunction> {
        self.private_functions
            .iter()
            .cloned()
            .map(BroadcastFunction::Private)
            .chain(self.utility_functions.iter().cloned().map(BroadcastFunction::Utility))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolEvent;

    #[test]
    fn test_fixture_functions_should_be_valid_for_class() {
        let fixture = ContractClassFixture::new(7, 3, 2);

        assert_eq!(fixture.class.compute_id(), fixture.class.id);
        for function in fixture.broadcast_functions() {
            assert!(function.is_valid_for(&fixture.class));
        }

        let other = ContractClassFixture::new(8, 3, 2);
        for function in fixture.broadcast_functions() {
            assert!(!function.is_valid_for(&other.class));
        }
    }

    #[test]
    fn test_broadcast_events_should_decode() -> eyre::Result<()> {
        let fixture = ContractClassFixture::new(3, 2, 1);

        for event in fixture.private_broadcast_events() {
            let decoded = ProtocolEvent::from_contract_class_log(&event.to_log())?;
            assert_eq!(decoded, Some(ProtocolEvent::PrivateFunctionBroadcasted(event)));
        }
        for event in fixture.utility_broadcast_events() {
            let decoded = ProtocolEvent::from_contract_class_log(&event.to_log())?;
            assert_eq!(decoded, Some(ProtocolEvent::UtilityFunctionBroadcasted(event)));
        }

        Ok(())
    }
}
