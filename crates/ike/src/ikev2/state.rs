//! IKEv2 state machine
//!
//! The states an IKE SA moves through (RFC 7296). The manager never drives
//! these transitions; it only reads the current state for status output.
//!
//! # State Transitions
//!
//! ```text
//! IDLE
//!   ↓ (send IKE_SA_INIT request)        ↓ (recv IKE_SA_INIT request)
//! INIT_SENT ──(recv response)──→ INIT_DONE
//!   ↓ (send IKE_AUTH request)           ↓ (recv IKE_AUTH request)
//! AUTH_SENT ──(recv response)──→ ESTABLISHED ⇄ REKEYING
//!   ↓ (any state)
//! DELETING → DELETED
//! ```

use crate::{Error, Result};
use std::fmt;

/// IKE SA state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IkeState {
    /// Initial state - no exchange started
    Idle,

    /// IKE_SA_INIT request sent, waiting for response
    InitSent,

    /// IKE_SA_INIT completed, ready for IKE_AUTH
    InitDone,

    /// IKE_AUTH request sent, waiting for response
    AuthSent,

    /// IKE SA established
    Established,

    /// Rekeying in progress
    Rekeying,

    /// Deletion in progress
    Deleting,

    /// IKE SA deleted
    Deleted,
}

impl IkeState {
    /// Check if state is a valid next state
    pub fn can_transition_to(&self, next: IkeState) -> bool {
        use IkeState::*;

        match (self, next) {
            // Initiator
            (Idle, InitSent) => true,
            (InitSent, InitDone) => true,
            (InitDone, AuthSent) => true,
            (AuthSent, Established) => true,

            // Responder
            (Idle, InitDone) => true,
            (InitDone, Established) => true,

            (Established, Rekeying) => true,
            (Rekeying, Established) => true,

            (Deleted, _) => false,
            (_, Deleting) => true,
            (Deleting, Deleted) => true,

            // Retransmissions keep the state
            (s1, s2) if *s1 == s2 => true,

            _ => false,
        }
    }

    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, IkeState::Deleted)
    }

    /// Check if IKE SA is established
    pub fn is_established(&self) -> bool {
        matches!(self, IkeState::Established | IkeState::Rekeying)
    }

    /// Check if the handshake has not completed yet
    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            IkeState::Idle | IkeState::InitSent | IkeState::InitDone | IkeState::AuthSent
        )
    }
}

impl fmt::Display for IkeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IkeState::Idle => "IDLE",
            IkeState::InitSent => "INIT_SENT",
            IkeState::InitDone => "INIT_DONE",
            IkeState::AuthSent => "AUTH_SENT",
            IkeState::Established => "ESTABLISHED",
            IkeState::Rekeying => "REKEYING",
            IkeState::Deleting => "DELETING",
            IkeState::Deleted => "DELETED",
        };
        f.write_str(name)
    }
}

/// IKE SA state machine
#[derive(Debug, Clone)]
pub struct IkeStateMachine {
    state: IkeState,
    is_initiator: bool,
}

impl IkeStateMachine {
    /// Create new state machine for initiator
    pub fn new_initiator() -> Self {
        IkeStateMachine {
            state: IkeState::Idle,
            is_initiator: true,
        }
    }

    /// Create new state machine for responder
    pub fn new_responder() -> Self {
        IkeStateMachine {
            state: IkeState::Idle,
            is_initiator: false,
        }
    }

    /// Get current state
    pub fn state(&self) -> IkeState {
        self.state
    }

    /// Check if this is the initiator
    pub fn is_initiator(&self) -> bool {
        self.is_initiator
    }

    /// Transition to a new state
    ///
    /// # Errors
    ///
    /// Returns error if the transition is not allowed, or if it belongs to
    /// the other role's handshake path.
    pub fn transition(&mut self, new_state: IkeState) -> Result<()> {
        if !self.state.can_transition_to(new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }

        let role_ok = match (self.state, new_state) {
            (IkeState::Idle, IkeState::InitSent) | (IkeState::InitDone, IkeState::AuthSent) => {
                self.is_initiator
            }
            (IkeState::Idle, IkeState::InitDone) | (IkeState::InitDone, IkeState::Established) => {
                !self.is_initiator
            }
            _ => true,
        };
        if !role_ok {
            let role = if self.is_initiator {
                "initiator"
            } else {
                "responder"
            };
            return Err(Error::InvalidState(format!(
                "{} cannot move from {} to {}",
                role, self.state, new_state
            )));
        }

        self.state = new_state;
        Ok(())
    }

    /// Tear down: move through DELETING to DELETED
    pub fn delete(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.transition(IkeState::Deleting)?;
        self.transition(IkeState::Deleted)
    }
}
