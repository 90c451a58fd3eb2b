//! Error types for IKE_SA management
//!
//! A single error type covers the manager, the attribute registry, header
//! parsing and the dispatcher. `SaNotFound` is an ordinary outcome of racy
//! lookups, not a corruption signal.

use std::fmt;

/// Result type for IKE operations
pub type Result<T> = std::result::Result<T, Error>;

/// IKE errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No matching IKE SA (deleted, never existed, or manager draining)
    SaNotFound(String),

    /// The calling thread already holds this IKE SA checked out
    ReentrantCheckout(String),

    /// Admission control refused a new half-open IKE SA
    AdmissionDenied(String),

    /// No collision-free SPI could be allocated
    SpiAllocation {
        /// Allocation attempts made
        attempts: u32,
    },

    /// Manager is shutting down and refuses new SAs
    ShuttingDown,

    /// Invalid parameter passed by the caller
    InvalidParameter(String),

    /// Unsupported protocol version
    UnsupportedVersion(u8),

    /// Unsupported exchange type
    UnsupportedExchangeType(u8),

    /// Invalid packet length
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Buffer too short for operation
    BufferTooShort {
        /// Required length
        required: usize,
        /// Available length
        available: usize,
    },

    /// Message too large
    MessageTooLarge(u32),

    /// State machine rejected a transition
    InvalidStateTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Operation not valid in the current state
    InvalidState(String),

    /// I/O error
    Io(String),

    /// Internal error (should not happen)
    Internal(String),
}

impl Error {
    /// Check if this is the "no such SA" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::SaNotFound(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SaNotFound(id) => write!(f, "IKE SA not found: {}", id),
            Error::ReentrantCheckout(id) => {
                write!(f, "IKE SA already checked out by this thread: {}", id)
            }
            Error::AdmissionDenied(id) => {
                write!(f, "Half-open IKE SA refused by admission control: {}", id)
            }
            Error::SpiAllocation { attempts } => {
                write!(f, "No unique SPI found after {} attempts", attempts)
            }
            Error::ShuttingDown => write!(f, "IKE SA manager is shutting down"),
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Error::UnsupportedVersion(v) => {
                write!(f, "Unsupported IKE version: 0x{:02x}", v)
            }
            Error::UnsupportedExchangeType(t) => {
                write!(f, "Unsupported exchange type: {}", t)
            }
            Error::InvalidLength { expected, actual } => {
                write!(
                    f,
                    "Invalid length: expected {}, got {}",
                    expected, actual
                )
            }
            Error::BufferTooShort {
                required,
                available,
            } => {
                write!(
                    f,
                    "Buffer too short: need {} bytes, have {}",
                    required, available
                )
            }
            Error::MessageTooLarge(size) => {
                write!(f, "IKE message too large: {} bytes", size)
            }
            Error::InvalidStateTransition { from, to } => {
                write!(f, "Invalid state transition: {} -> {}", from, to)
            }
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// Convert from std::io::Error
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<Error> for fynx_platform::FynxError {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(msg) => fynx_platform::FynxError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                msg,
            )),
            Error::InvalidParameter(msg) => fynx_platform::FynxError::Config(msg),
            Error::ShuttingDown => fynx_platform::FynxError::Lifecycle {
                module: "ike-sa-manager",
                state: fynx_platform::ModuleState::Draining,
            },
            other => fynx_platform::FynxError::Protocol(other.to_string()),
        }
    }
}
