//! # Fynx Platform
//!
//! Core platform types and traits shared by the Fynx crates.
//!
//! This crate provides:
//! - Unified error types (`FynxError`, `ErrorKind`, `FynxResult`)
//! - The `SecurityModule` lifecycle trait implemented by long-lived daemon
//!   components such as the IKE_SA manager
//!
//! # Examples
//!
//! ```
//! use fynx_platform::{FynxError, FynxResult};
//!
//! fn load_module(name: &str) -> FynxResult<String> {
//!     if name.is_empty() {
//!         return Err(FynxError::Config("module name is empty".to_string()));
//!     }
//!     Ok(format!("loaded {}", name))
//! }
//!
//! # fn main() -> FynxResult<()> {
//! let result = load_module("ike-sa-manager")?;
//! assert_eq!(result, "loaded ike-sa-manager");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;
pub mod traits;

pub use error::{ErrorKind, FynxError, FynxResult};
pub use traits::{ModuleState, SecurityModule};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
