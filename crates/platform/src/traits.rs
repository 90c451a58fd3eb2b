//! Core traits for Fynx security modules

use crate::FynxResult;

/// Lifecycle state reported by a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModuleState {
    /// Accepting work
    Running,
    /// Refusing new work, waiting for in-flight work to finish
    Draining,
    /// All resources released
    Stopped,
}

impl ModuleState {
    /// Check if the module still accepts new work
    pub fn is_accepting(&self) -> bool {
        matches!(self, ModuleState::Running)
    }
}

/// Security module interface
///
/// All Fynx modules implement this trait to provide unified management.
pub trait SecurityModule: Send + Sync {
    /// Unique module identifier
    fn id(&self) -> &'static str;

    /// Module version
    fn version(&self) -> &'static str;

    /// Module description
    fn description(&self) -> &'static str;

    /// Current lifecycle state
    fn state(&self) -> ModuleState {
        ModuleState::Running
    }

    /// Initialize the module
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails
    fn init(&mut self) -> FynxResult<()> {
        Ok(())
    }

    /// Shutdown the module
    ///
    /// Implementations may block until in-flight work has drained.
    ///
    /// # Errors
    ///
    /// Returns an error if shutdown fails
    fn shutdown(&mut self) -> FynxResult<()> {
        Ok(())
    }
}
