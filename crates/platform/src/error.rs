//! Error types shared by Fynx modules
//!
//! Module-specific crates keep their own detailed error enums and convert
//! into [`FynxError`] at the [`SecurityModule`](crate::SecurityModule)
//! boundary, where callers only care about the broad category.

use crate::ModuleState;
use std::fmt;

/// Broad error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operating system or socket failure
    Io,
    /// Rejected configuration or parameter
    Config,
    /// Peer or protocol-level failure
    Protocol,
    /// Operation not possible in the module's lifecycle state
    Lifecycle,
    /// Anything else
    Other,
}

/// Error reported across module boundaries
#[derive(Debug)]
pub enum FynxError {
    /// I/O error
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Protocol error
    Protocol(String),

    /// A module refused work because of its lifecycle state
    Lifecycle {
        /// Module identifier (see [`SecurityModule::id`](crate::SecurityModule::id))
        module: &'static str,
        /// State the module was in
        state: ModuleState,
    },

    /// Other error
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl FynxError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FynxError::Io(_) => ErrorKind::Io,
            FynxError::Config(_) => ErrorKind::Config,
            FynxError::Protocol(_) => ErrorKind::Protocol,
            FynxError::Lifecycle { .. } => ErrorKind::Lifecycle,
            FynxError::Other(_) => ErrorKind::Other,
        }
    }

    /// Wrap any error
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        FynxError::Other(Box::new(err))
    }
}

impl fmt::Display for FynxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FynxError::Io(e) => write!(f, "IO error: {}", e),
            FynxError::Config(msg) => write!(f, "Configuration error: {}", msg),
            FynxError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            FynxError::Lifecycle { module, state } => {
                write!(f, "Module {} is {:?}", module, state)
            }
            FynxError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for FynxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FynxError::Io(e) => Some(e),
            FynxError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FynxError {
    fn from(err: std::io::Error) -> Self {
        FynxError::Io(err)
    }
}

/// Result type for Fynx operations
pub type FynxResult<T> = Result<T, FynxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FynxError::Config("max_in_flight must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: max_in_flight must be at least 1"
        );

        let err = FynxError::Lifecycle {
            module: "ike-sa-manager",
            state: ModuleState::Draining,
        };
        assert_eq!(err.to_string(), "Module ike-sa-manager is Draining");
        assert_eq!(err.kind(), ErrorKind::Lifecycle);
    }

    #[test]
    fn test_io_error_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port 500 in use");
        let err: FynxError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_other_wraps_source() {
        let err = FynxError::other(std::fmt::Error);
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(std::error::Error::source(&err).is_some());
    }
}
