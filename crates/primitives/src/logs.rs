use crate::L2Address;
use alloy_primitives::B256;

/// A log emitted by a private function. The first field is the log tag.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct PrivateLog {
    /// The log fields.
    pub fields: Vec<B256>,
}

impl PrivateLog {
    /// Returns a new [`PrivateLog`].
    pub const fn new(fields: Vec<B256>) -> Self {
        Self { fields }
    }

    /// Returns the tag of the log, if any.
    pub fn tag(&self) -> Option<&B256> {
        self.fields.first()
    }
}

/// A log emitted by a public function.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct PublicLog {
    /// The address of the contract that emitted the log.
    pub contract_address: L2Address,
    /// The log fields.
    pub fields: Vec<B256>,
}

impl PublicLog {
    /// Returns a new [`PublicLog`].
    pub const fn new(contract_address: L2Address, fields: Vec<B256>) -> Self {
        Self { contract_address, fields }
    }
}

/// A log carrying contract class data, emitted by the class registerer.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct ContractClassLog {
    /// The address of the contract that emitted the log.
    pub contract_address: L2Address,
    /// The log fields.
    pub fields: Vec<B256>,
}

impl ContractClassLog {
    /// Returns a new [`ContractClassLog`].
    pub const fn new(contract_address: L2Address, fields: Vec<B256>) -> Self {
        Self { contract_address, fields }
    }
}
