//! IKE SA identifier

use crate::ikev2::IkeHeader;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies an IKE SA by its SPI pair
///
/// `is_initiator` records which side of the exchange this daemon plays. It
/// does not take part in equality or hashing: the SPIs are picked
/// independently by each peer, so the pair alone names the SA.
///
/// A zero `responder_spi` marks a half-open SA whose responder has not
/// answered (or, on the responder, whose SPI has not been chosen yet).
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IkeSaId {
    initiator_spi: u64,
    responder_spi: u64,
    is_initiator: bool,
}

impl IkeSaId {
    /// Create a new identifier
    pub fn new(initiator_spi: u64, responder_spi: u64, is_initiator: bool) -> Self {
        Self {
            initiator_spi,
            responder_spi,
            is_initiator,
        }
    }

    /// Identifier of an SA this daemon is answering
    pub fn responder(initiator_spi: u64, responder_spi: u64) -> Self {
        Self::new(initiator_spi, responder_spi, false)
    }

    /// Identifier of an SA this daemon started
    pub fn initiator(initiator_spi: u64, responder_spi: u64) -> Self {
        Self::new(initiator_spi, responder_spi, true)
    }

    /// Identifier of the SA an inbound message belongs to, from our side
    ///
    /// A message with the initiator flag set was sent by the original
    /// initiator, so this daemon is the responder for that SA.
    pub fn from_header(header: &IkeHeader) -> Self {
        Self::new(
            header.initiator_spi,
            header.responder_spi,
            !header.flags.is_initiator(),
        )
    }

    /// Initiator's SPI
    pub fn initiator_spi(&self) -> u64 {
        self.initiator_spi
    }

    /// Responder's SPI (zero while half-open)
    pub fn responder_spi(&self) -> u64 {
        self.responder_spi
    }

    /// Check if this daemon is the original initiator
    pub fn is_initiator(&self) -> bool {
        self.is_initiator
    }

    /// SPI chosen by this daemon
    pub fn local_spi(&self) -> u64 {
        if self.is_initiator {
            self.initiator_spi
        } else {
            self.responder_spi
        }
    }

    /// SPI chosen by the peer
    pub fn remote_spi(&self) -> u64 {
        if self.is_initiator {
            self.responder_spi
        } else {
            self.initiator_spi
        }
    }

    /// Set the responder's SPI, completing the identifier
    pub fn set_responder_spi(&mut self, spi: u64) {
        self.responder_spi = spi;
    }

    /// Check if the responder SPI is still unknown
    pub fn is_half_open(&self) -> bool {
        self.responder_spi == 0
    }
}

impl PartialEq for IkeSaId {
    fn eq(&self, other: &Self) -> bool {
        self.initiator_spi == other.initiator_spi && self.responder_spi == other.responder_spi
    }
}

impl Eq for IkeSaId {}

impl Hash for IkeSaId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.initiator_spi.hash(state);
        self.responder_spi.hash(state);
    }
}

impl fmt::Display for IkeSaId {
    /// `i` and `r` name the SPI owner; `*` marks the local side
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mark_i, mark_r) = if self.is_initiator { ("*", "") } else { ("", "*") };
        write!(
            f,
            "{:016x}_i{} {:016x}_r{}",
            self.initiator_spi, mark_i, self.responder_spi, mark_r
        )
    }
}
