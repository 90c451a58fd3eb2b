//! IKE_SA manager and dispatcher configuration
//!
//! Provides configuration structures and builder patterns for
//! [`IkeSaManager`](crate::IkeSaManager) and the datagram dispatcher.

use crate::ikev2::IKE_HEADER_SIZE;
use crate::{Error, Result};

/// Default number of SPI draws before giving up on a collision-free SPI
pub const DEFAULT_MAX_SPI_ATTEMPTS: u32 = 16;

/// Default bound on datagrams processed concurrently by the dispatcher
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Default receive buffer (largest IKE message)
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 65535;

/// Manager configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// SPI draws attempted before `create_and_checkout` fails
    pub max_spi_attempts: u32,

    /// Fail fast when a thread checks out an SA it last checked out itself
    ///
    /// Detection goes by thread: with it on, an SA must be checked in on the
    /// thread that checked it out, or that thread's next checkout of the SA
    /// fails even though another thread now holds it. With it off (the
    /// default) such a checkout blocks until the SA is checked in, and a
    /// thread checking out an SA it still holds blocks forever.
    pub detect_reentrant_checkout: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_spi_attempts: DEFAULT_MAX_SPI_ATTEMPTS,
            detect_reentrant_checkout: false,
        }
    }
}

impl ManagerConfig {
    /// Create builder for manager configuration
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_spi_attempts == 0 {
            return Err(Error::InvalidParameter(
                "max_spi_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for ManagerConfig
#[derive(Default)]
pub struct ManagerConfigBuilder {
    max_spi_attempts: Option<u32>,
    detect_reentrant_checkout: Option<bool>,
}

impl ManagerConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set SPI allocation attempts
    pub fn with_max_spi_attempts(mut self, attempts: u32) -> Self {
        self.max_spi_attempts = Some(attempts);
        self
    }

    /// Enable or disable reentrant checkout detection
    pub fn with_reentrant_detection(mut self, enabled: bool) -> Self {
        self.detect_reentrant_checkout = Some(enabled);
        self
    }

    /// Build ManagerConfig with validation
    pub fn build(self) -> Result<ManagerConfig> {
        let defaults = ManagerConfig::default();
        let config = ManagerConfig {
            max_spi_attempts: self.max_spi_attempts.unwrap_or(defaults.max_spi_attempts),
            detect_reentrant_checkout: self
                .detect_reentrant_checkout
                .unwrap_or(defaults.detect_reentrant_checkout),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Dispatcher configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Datagrams processed concurrently; further datagrams wait in the socket
    pub max_in_flight: usize,

    /// Receive buffer size in bytes
    pub recv_buffer_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl DispatcherConfig {
    /// Create builder for dispatcher configuration
    pub fn builder() -> DispatcherConfigBuilder {
        DispatcherConfigBuilder::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(Error::InvalidParameter(
                "max_in_flight must be at least 1".into(),
            ));
        }
        if self.recv_buffer_size < IKE_HEADER_SIZE {
            return Err(Error::InvalidParameter(format!(
                "recv_buffer_size must hold an IKE header ({} bytes)",
                IKE_HEADER_SIZE
            )));
        }
        Ok(())
    }
}

/// Builder for DispatcherConfig
#[derive(Default)]
pub struct DispatcherConfigBuilder {
    max_in_flight: Option<usize>,
    recv_buffer_size: Option<usize>,
}

impl DispatcherConfigBuilder {
    /// Set concurrent datagram bound
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    /// Set receive buffer size
    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = Some(size);
        self
    }

    /// Build DispatcherConfig with validation
    pub fn build(self) -> Result<DispatcherConfig> {
        let defaults = DispatcherConfig::default();
        let config = DispatcherConfig {
            max_in_flight: self.max_in_flight.unwrap_or(defaults.max_in_flight),
            recv_buffer_size: self.recv_buffer_size.unwrap_or(defaults.recv_buffer_size),
        };
        config.validate()?;
        Ok(config)
    }
}
