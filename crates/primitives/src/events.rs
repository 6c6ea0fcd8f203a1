//! Protocol events carried in L2 logs.
//!
//! Contract classes and functions are broadcast through contract class logs emitted by the class
//! registerer, instance deployments through private logs tagged by the instance deployer and
//! instance updates through public logs emitted by the instance deployer.

use crate::{
    bytes_to_fields, field_from_u64, ContractClass, ContractClassLog, ContractInstance,
    ContractInstanceUpdate, EventDecodeError, ExecutablePrivateFunctionWithMembershipProof,
    FieldReader, FunctionSelector, L2Address, PrivateLog, PublicKeys, PublicLog,
    UtilityFunctionWithMembershipProof, ARTIFACT_FUNCTION_TREE_HEIGHT, FUNCTION_TREE_HEIGHT,
};
use alloy_primitives::{b256, B256};

/// The address of the contract class registerer.
pub const CONTRACT_CLASS_REGISTERER_ADDRESS: L2Address =
    b256!("0000000000000000000000000000000000000000000000000000000000000003");

/// The address of the contract instance deployer.
pub const CONTRACT_INSTANCE_DEPLOYER_ADDRESS: L2Address =
    b256!("0000000000000000000000000000000000000000000000000000000000000002");

/// The first field of a contract class registered log.
pub const CONTRACT_CLASS_REGISTERED_MAGIC_VALUE: B256 =
    b256!("00a8b0bdd8c40f62a1c4f8f9c1a5a1c0b56f4c0d4ea1a2bd0cb6d1b9b6e7c801");

/// The first field of a private function broadcasted log.
pub const PRIVATE_FUNCTION_BROADCASTED_MAGIC_VALUE: B256 =
    b256!("001c5fd1b6e1a1d3e0a7bd2e46bd0c5d0d7f6f4c6c5ab2b3b5bb1c8e8a3f0e02");

/// The first field of a utility function broadcasted log.
pub const UTILITY_FUNCTION_BROADCASTED_MAGIC_VALUE: B256 =
    b256!("00e9b1f2c35c4a1bb2f1f0a7c6f3d2a2dd8a0c6a9e7e3b4f8b6d0c2a1e4f7b03");

/// The tag of a contract instance deployed private log.
pub const CONTRACT_INSTANCE_DEPLOYED_TAG: B256 =
    b256!("0085864497636cf755ae7bde03f267ce01a520981c21c3682aaf82a631a1a104");

/// The first field of a contract instance updated public log.
pub const CONTRACT_INSTANCE_UPDATED_MAGIC_VALUE: B256 =
    b256!("00d4e1a2b9c3f6e8a7b5c4d3e2f1a0b9c8d7e6f5a4b3c2d1e0f9a8b7c6d5e405");

/// A contract class was registered.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContractClassRegisteredEvent {
    /// The emitted class id.
    pub contract_class_id: B256,
    /// The class version.
    pub version: u64,
    /// The artifact hash.
    pub artifact_hash: B256,
    /// The root of the private functions tree.
    pub private_functions_root: B256,
    /// The packed public bytecode.
    pub packed_public_bytecode: Vec<u8>,
}

impl ContractClassRegisteredEvent {
    const NAME: &'static str = "ContractClassRegistered";

    /// Returns true if the log carries this event.
    pub fn is_event(log: &ContractClassLog) -> bool {
        log.contract_address == CONTRACT_CLASS_REGISTERER_ADDRESS &&
            log.fields.first() == Some(&CONTRACT_CLASS_REGISTERED_MAGIC_VALUE)
    }

    /// Decodes the event from the log fields, magic value included.
    pub fn decode(fields: &[B256]) -> Result<Self, EventDecodeError> {
        let mut reader = FieldReader::new(fields, Self::NAME);
        reader.read_field()?;
        Ok(Self {
            contract_class_id: reader.read_field()?,
            version: reader.read_u64()?,
            artifact_hash: reader.read_field()?,
            private_functions_root: reader.read_field()?,
            packed_public_bytecode: reader.read_bytes()?,
        })
    }

    /// Returns the log carrying the event.
    pub fn to_log(&self) -> ContractClassLog {
        let mut fields = vec![
            CONTRACT_CLASS_REGISTERED_MAGIC_VALUE,
            self.contract_class_id,
            field_from_u64(self.version),
            self.artifact_hash,
            self.private_functions_root,
        ];
        fields.extend(bytes_to_fields(&self.packed_public_bytecode));
        ContractClassLog::new(CONTRACT_CLASS_REGISTERER_ADDRESS, fields)
    }

    /// Converts the event into a [`ContractClass`], checking the emitted id against the class
    /// content.
    pub fn into_contract_class(self) -> Result<ContractClass, EventDecodeError> {
        let class = ContractClass {
            id: self.contract_class_id,
            version: self.version,
            artifact_hash: self.artifact_hash,
            private_functions_root: self.private_functions_root,
            packed_bytecode: self.packed_public_bytecode,
            private_functions: Vec::new(),
            utility_functions: Vec::new(),
        };
        let computed = class.compute_id();
        if computed != class.id {
            return Err(EventDecodeError::ContractClassIdMismatch { emitted: class.id, computed });
        }
        Ok(class)
    }
}

/// A contract instance was deployed.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ContractInstanceDeployedEvent {
    /// The instance address.
    pub address: L2Address,
    /// The instance version.
    pub version: u64,
    /// The deployment salt.
    pub salt: B256,
    /// The class the instance was deployed with.
    pub contract_class_id: B256,
    /// The initialization hash.
    pub initialization_hash: B256,
    /// The instance public keys.
    pub public_keys: PublicKeys,
    /// The deployer.
    pub deployer: L2Address,
}

impl ContractInstanceDeployedEvent {
    const NAME: &'static str = "ContractInstanceDeployed";

    /// Returns true if the log carries this event.
    pub fn is_event(log: &PrivateLog) -> bool {
        log.tag() == Some(&CONTRACT_INSTANCE_DEPLOYED_TAG)
    }

    /// Decodes the event from the log fields, tag included.
    pub fn decode(fields: &[B256]) -> Result<Self, EventDecodeError> {
        let mut reader = FieldReader::new(fields, Self::NAME);
        reader.read_field()?;
        Ok(Self {
            address: reader.read_field()?,
            version: reader.read_u64()?,
            salt: reader.read_field()?,
            contract_class_id: reader.read_field()?,
            initialization_hash: reader.read_field()?,
            public_keys: PublicKeys {
                master_nullifier_public_key: reader.read_field()?,
                master_incoming_viewing_public_key: reader.read_field()?,
                master_outgoing_viewing_public_key: reader.read_field()?,
                master_tagging_public_key: reader.read_field()?,
            },
            deployer: reader.read_field()?,
        })
    }

    /// Returns the log carrying the event.
    pub fn to_log(&self) -> PrivateLog {
        PrivateLog::new(vec![
            CONTRACT_INSTANCE_DEPLOYED_TAG,
            self.address,
            field_from_u64(self.version),
            self.salt,
            self.contract_class_id,
            self.initialization_hash,
            self.public_keys.master_nullifier_public_key,
            self.public_keys.master_incoming_viewing_public_key,
            self.public_keys.master_outgoing_viewing_public_key,
            self.public_keys.master_tagging_public_key,
            self.deployer,
        ])
    }

    /// Converts the event into a [`ContractInstance`].
    pub const fn into_contract_instance(self) -> ContractInstance {
        ContractInstance {
            address: self.address,
            version: self.version,
            salt: self.salt,
            deployer: self.deployer,
            current_contract_class_id: self.contract_class_id,
            original_contract_class_id: self.contract_class_id,
            initialization_hash: self.initialization_hash,
            public_keys: self.public_keys,
        }
    }
}

/// The class of a contract instance was updated.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ContractInstanceUpdatedEvent {
    /// The instance address.
    pub address: L2Address,
    /// The class before the update.
    pub prev_contract_class_id: B256,
    /// The class after the update.
    pub new_contract_class_id: B256,
    /// The L2 block from which the update applies.
    pub block_of_change: u64,
}

impl ContractInstanceUpdatedEvent {
    const NAME: &'static str = "ContractInstanceUpdated";

    /// Returns true if the log carries this event.
    pub fn is_event(log: &PublicLog) -> bool {
        log.contract_address == CONTRACT_INSTANCE_DEPLOYER_ADDRESS &&
            log.fields.first() == Some(&CONTRACT_INSTANCE_UPDATED_MAGIC_VALUE)
    }

    /// Decodes the event from the log fields, magic value included.
    pub fn decode(fields: &[B256]) -> Result<Self, EventDecodeError> {
        let mut reader = FieldReader::new(fields, Self::NAME);
        reader.read_field()?;
        Ok(Self {
            address: reader.read_field()?,
            prev_contract_class_id: reader.read_field()?,
            new_contract_class_id: reader.read_field()?,
            block_of_change: reader.read_u64()?,
        })
    }

    /// Returns the log carrying the event.
    pub fn to_log(&self) -> PublicLog {
        PublicLog::new(
            CONTRACT_INSTANCE_DEPLOYER_ADDRESS,
            vec![
                CONTRACT_INSTANCE_UPDATED_MAGIC_VALUE,
                self.address,
                self.prev_contract_class_id,
                self.new_contract_class_id,
                field_from_u64(self.block_of_change),
            ],
        )
    }

    /// Converts the event into a [`ContractInstanceUpdate`].
    pub const fn into_contract_instance_update(self) -> ContractInstanceUpdate {
        ContractInstanceUpdate {
            address: self.address,
            prev_contract_class_id: self.prev_contract_class_id,
            new_contract_class_id: self.new_contract_class_id,
            block_of_change: self.block_of_change,
        }
    }
}

/// A private function was broadcast for a class.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrivateFunctionBroadcastedEvent {
    /// The class the function belongs to.
    pub contract_class_id: B256,
    /// The function and its membership proofs.
    pub function: ExecutablePrivateFunctionWithMembershipProof,
}

impl PrivateFunctionBroadcastedEvent {
    const NAME: &'static str = "PrivateFunctionBroadcasted";

    /// Returns true if the log carries this event.
    pub fn is_event(log: &ContractClassLog) -> bool {
        log.contract_address == CONTRACT_CLASS_REGISTERER_ADDRESS &&
            log.fields.first() == Some(&PRIVATE_FUNCTION_BROADCASTED_MAGIC_VALUE)
    }

    /// Decodes the event from the log fields, magic value included.
    pub fn decode(fields: &[B256]) -> Result<Self, EventDecodeError> {
        let mut reader = FieldReader::new(fields, Self::NAME);
        reader.read_field()?;
        let contract_class_id = reader.read_field()?;
        let artifact_metadata_hash = reader.read_field()?;
        let utility_functions_artifact_tree_root = reader.read_field()?;
        let private_function_tree_sibling_path = reader.read_fields(FUNCTION_TREE_HEIGHT)?;
        let private_function_tree_leaf_index = reader.read_u64()?;
        let artifact_tree_sibling_path = reader.read_fields(ARTIFACT_FUNCTION_TREE_HEIGHT)?;
        let artifact_tree_leaf_index = reader.read_u64()?;
        let selector = FunctionSelector(reader.read_u32()?);
        let metadata_hash = reader.read_field()?;
        let vk_hash = reader.read_field()?;
        let bytecode = reader.read_bytes()?;

        Ok(Self {
            contract_class_id,
            function: ExecutablePrivateFunctionWithMembershipProof {
                selector,
                vk_hash,
                bytecode,
                metadata_hash,
                artifact_metadata_hash,
                utility_functions_artifact_tree_root,
                private_function_tree_sibling_path,
                private_function_tree_leaf_index,
                artifact_tree_sibling_path,
                artifact_tree_leaf_index,
            },
        })
    }

    /// Returns the log carrying the event. The sibling paths must match the tree heights.
    pub fn to_log(&self) -> ContractClassLog {
        let f = &self.function;
        let mut fields = vec![
            PRIVATE_FUNCTION_BROADCASTED_MAGIC_VALUE,
            self.contract_class_id,
            f.artifact_metadata_hash,
            f.utility_functions_artifact_tree_root,
        ];
        fields.extend_from_slice(&f.private_function_tree_sibling_path);
        fields.push(field_from_u64(f.private_function_tree_leaf_index));
        fields.extend_from_slice(&f.artifact_tree_sibling_path);
        fields.push(field_from_u64(f.artifact_tree_leaf_index));
        fields.push(f.selector.to_field());
        fields.push(f.metadata_hash);
        fields.push(f.vk_hash);
        fields.extend(bytes_to_fields(&f.bytecode));
        ContractClassLog::new(CONTRACT_CLASS_REGISTERER_ADDRESS, fields)
    }
}

/// A utility function was broadcast for a class.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UtilityFunctionBroadcastedEvent {
    /// The class the function belongs to.
    pub contract_class_id: B256,
    /// The function and its membership proof.
    pub function: UtilityFunctionWithMembershipProof,
}

impl UtilityFunctionBroadcastedEvent {
    const NAME: &'static str = "UtilityFunctionBroadcasted";

    /// Returns true if the log carries this event.
    pub fn is_event(log: &ContractClassLog) -> bool {
        log.contract_address == CONTRACT_CLASS_REGISTERER_ADDRESS &&
            log.fields.first() == Some(&UTILITY_FUNCTION_BROADCASTED_MAGIC_VALUE)
    }

    /// Decodes the event from the log fields, magic value included.
    pub fn decode(fields: &[B256]) -> Result<Self, EventDecodeError> {
        let mut reader = FieldReader::new(fields, Self::NAME);
        reader.read_field()?;
        let contract_class_id = reader.read_field()?;
        let artifact_metadata_hash = reader.read_field()?;
        let private_functions_artifact_tree_root = reader.read_field()?;
        let artifact_tree_sibling_path = reader.read_fields(ARTIFACT_FUNCTION_TREE_HEIGHT)?;
        let artifact_tree_leaf_index = reader.read_u64()?;
        let selector = FunctionSelector(reader.read_u32()?);
        let metadata_hash = reader.read_field()?;
        let bytecode = reader.read_bytes()?;

        Ok(Self {
            contract_class_id,
            function: UtilityFunctionWithMembershipProof {
                selector,
                metadata_hash,
                bytecode,
                artifact_metadata_hash,
                private_functions_artifact_tree_root,
                artifact_tree_sibling_path,
                artifact_tree_leaf_index,
            },
        })
    }

    /// Returns the log carrying the event. The sibling path must match the tree height.
    pub fn to_log(&self) -> ContractClassLog {
        let f = &self.function;
        let mut fields = vec![
            UTILITY_FUNCTION_BROADCASTED_MAGIC_VALUE,
            self.contract_class_id,
            f.artifact_metadata_hash,
            f.private_functions_artifact_tree_root,
        ];
        fields.extend_from_slice(&f.artifact_tree_sibling_path);
        fields.push(field_from_u64(f.artifact_tree_leaf_index));
        fields.push(f.selector.to_field());
        fields.push(f.metadata_hash);
        fields.extend(bytes_to_fields(&f.bytecode));
        ContractClassLog::new(CONTRACT_CLASS_REGISTERER_ADDRESS, fields)
    }
}

/// A protocol event extracted from a block log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// A contract class was registered.
    ContractClassRegistered(ContractClassRegisteredEvent),
    /// A contract instance was deployed.
    ContractInstanceDeployed(ContractInstanceDeployedEvent),
    /// A contract instance was updated.
    ContractInstanceUpdated(ContractInstanceUpdatedEvent),
    /// A private function was broadcast.
    PrivateFunctionBroadcasted(PrivateFunctionBroadcastedEvent),
    /// A utility function was broadcast.
    UtilityFunctionBroadcasted(UtilityFunctionBroadcastedEvent),
}

impl ProtocolEvent {
    /// Decodes the event carried by a contract class log, if any.
    pub fn from_contract_class_log(
        log: &ContractClassLog,
    ) -> Result<Option<Self>, EventDecodeError> {
        if ContractClassRegisteredEvent::is_event(log) {
            return ContractClassRegisteredEvent::decode(&log.fields)
                .map(|e| Some(Self::ContractClassRegistered(e)));
        }
        if PrivateFunctionBroadcastedEvent::is_event(log) {
            return PrivateFunctionBroadcastedEvent::decode(&log.fields)
                .map(|e| Some(Self::PrivateFunctionBroadcasted(e)));
        }
        if UtilityFunctionBroadcastedEvent::is_event(log) {
            return UtilityFunctionBroadcastedEvent::decode(&log.fields)
                .map(|e| Some(Self::UtilityFunctionBroadcasted(e)));
        }
        Ok(None)
    }

    /// Decodes the event carried by a private log, if any.
    pub fn from_private_log(log: &PrivateLog) -> Result<Option<Self>, EventDecodeError> {
        if ContractInstanceDeployedEvent::is_event(log) {
            return ContractInstanceDeployedEvent::decode(&log.fields)
                .map(|e| Some(Self::ContractInstanceDeployed(e)));
        }
        Ok(None)
    }

    /// Decodes the event carried by a public log, if any.
    pub fn from_public_log(log: &PublicLog) -> Result<Option<Self>, EventDecodeError> {
        if ContractInstanceUpdatedEvent::is_event(log) {
            return ContractInstanceUpdatedEvent::decode(&log.fields)
                .map(|e| Some(Self::ContractInstanceUpdated(e)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_contract_class_id;

    #[test]
    fn test_should_decode_registered_class() -> eyre::Result<()> {
        // Given
        let bytecode = vec![0xab; 70];
        let artifact_hash = B256::repeat_byte(1);
        let private_functions_root = B256::repeat_byte(2);
        let id = compute_contract_class_id(
            artifact_hash,
            private_functions_root,
            crate::compute_public_bytecode_commitment(&bytecode),
        );
        let event = ContractClassRegisteredEvent {
            contract_class_id: id,
            version: 1,
            artifact_hash,
            private_functions_root,
            packed_public_bytecode: bytecode,
        };

        // When
        let decoded = ProtocolEvent::from_contract_class_log(&event.to_log())?;

        // Then
        let Some(ProtocolEvent::ContractClassRegistered(decoded)) = decoded else {
            eyre::bail!("expected a registered class event")
        };
        assert_eq!(decoded, event);
        assert_eq!(decoded.into_contract_class()?.id, id);

        Ok(())
    }

    #[test]
    fn test_should_reject_mismatching_class_id() {
        let event = ContractClassRegisteredEvent {
            contract_class_id: B256::repeat_byte(9),
            ..Default::default()
        };

        assert!(matches!(
            event.into_contract_class(),
            Err(EventDecodeError::ContractClassIdMismatch { .. })
        ));
    }

    #[test]
    fn test_should_ignore_unrelated_logs() -> eyre::Result<()> {
        let log = PublicLog::new(B256::repeat_byte(7), vec![CONTRACT_INSTANCE_UPDATED_MAGIC_VALUE]);
        assert_eq!(ProtocolEvent::from_public_log(&log)?, None);

        let log = PrivateLog::new(vec![B256::repeat_byte(1)]);
        assert_eq!(ProtocolEvent::from_private_log(&log)?, None);

        Ok(())
    }

    #[test]
    fn test_should_fail_on_truncated_instance_deployment() {
        let mut log = ContractInstanceDeployedEvent::default().to_log();
        log.fields.truncate(5);

        assert_eq!(
            ProtocolEvent::from_private_log(&log),
            Err(EventDecodeError::UnexpectedEnd { event: "ContractInstanceDeployed", position: 5 })
        );
    }
}
