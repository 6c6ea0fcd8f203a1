use alloy_primitives::B256;

/// An error that occurred while decoding a protocol event out of a log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventDecodeError {
    /// The log ended before the event was fully read.
    #[error("unexpected end of log at field {position} while reading {event}")]
    UnexpectedEnd {
        /// The name of the event being decoded.
        event: &'static str,
        /// The position of the missing field.
        position: usize,
    },
    /// A field did not fit in the expected integer type.
    #[error("field {position} overflows a u64 while reading {event}")]
    FieldOverflow {
        /// The name of the event being decoded.
        event: &'static str,
        /// The position of the invalid field.
        position: usize,
    },
    /// The packed bytes length prefix is inconsistent with the log.
    #[error("invalid packed bytes length {length} while reading {event}")]
    InvalidBytesLength {
        /// The name of the event being decoded.
        event: &'static str,
        /// The declared length.
        length: u64,
    },
    /// The contract class id emitted in the event does not match the one computed from its
    /// content.
    #[error("contract class id mismatch: emitted {emitted}, computed {computed}")]
    ContractClassIdMismatch {
        /// The id emitted in the event.
        emitted: B256,
        /// The id computed from the class content.
        computed: B256,
    },
}
