//! Driver errors

use std::time::Duration;

use thiserror::Error;

/// Failure modes of driver operations
///
/// All variants are recoverable outcomes returned to the caller. None of
/// them leave the transport locked or the mode-select line asserted.
#[derive(Error, Debug)]
pub enum Hc15Error {
    /// The underlying serial device could not be opened
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The transport token was not acquired within the deadline
    #[error("Transport lock not acquired within {0:?}")]
    LockTimeout(Duration),

    /// The busy-sense line never cleared within the deadline
    #[error("Module busy past the deadline")]
    ModuleBusy,

    /// No matching response line arrived within the deadline
    #[error("No matching response within {0:?}")]
    ResponseTimeout(Duration),

    /// A response line arrived but did not match the expected reply
    #[error("Unexpected response: {0:?}")]
    UnexpectedResponse(String),

    /// A caller-supplied value is outside the protocol's valid domain
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The transport accepted fewer bytes than the command required
    #[error("Serial write accepted {written} of {expected} bytes")]
    Serial {
        /// Bytes the transport reported written
        written: usize,
        /// Bytes the command needed on the wire
        expected: usize,
    },
}
