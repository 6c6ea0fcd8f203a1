/// An error occurring while reading from L1.
#[derive(Debug, thiserror::Error)]
pub enum L1Error {
    /// The L1 transport failed.
    #[error("L1 transport error: {0}")]
    Transport(String),
    /// The requested L1 block is unknown to the provider.
    #[error("unknown L1 block {0}")]
    UnknownBlock(u64),
    /// The L1 response could not be decoded.
    #[error("failed to decode L1 response: {0}")]
    Decode(String),
    /// Other error.
    #[error("{0}")]
    Other(&'static str),
}
