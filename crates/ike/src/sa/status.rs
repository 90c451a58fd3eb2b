//! Status reporting for IKE SAs
//!
//! Each [`IkeSa`](super::IkeSa) publishes a small summary through a shared
//! [`StatusHandle`]. The manager keeps a clone of that handle in the table,
//! so status output can be produced while the SA itself is checked out by
//! another thread.

use super::{HostPair, IkeSaId};
use crate::ikev2::IkeState;
use crate::logging;
use parking_lot::RwLock;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Status summary of one IKE SA
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaSummary {
    /// Protocol state
    pub state: IkeState,
    /// Peer addresses
    pub hosts: HostPair,
    /// Child SAs negotiated under this IKE SA
    pub child_sas: usize,
}

/// Shared, thread-safe view of an SA's summary
#[derive(Debug, Clone)]
pub struct StatusHandle {
    inner: Arc<RwLock<SaSummary>>,
}

impl StatusHandle {
    pub(crate) fn new(summary: SaSummary) -> Self {
        Self {
            inner: Arc::new(RwLock::new(summary)),
        }
    }

    /// Current summary
    pub fn summary(&self) -> SaSummary {
        self.inner.read().clone()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut SaSummary)) {
        f(&mut self.inner.write());
    }
}

/// One line of status output
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusRecord {
    /// SA identifier
    pub id: IkeSaId,
    /// Connection name, if any
    pub name: Option<String>,
    /// Summary read from the SA's status handle
    pub summary: SaSummary,
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {}, {}, {} CHILD_SA(s)",
            self.name.as_deref().unwrap_or("(unnamed)"),
            self.id,
            self.summary.state,
            self.summary.hosts,
            self.summary.child_sas
        )
    }
}

/// Receiver of status output
///
/// Errors are logged by the manager and never propagated.
pub trait StatusSink {
    /// Accept one record
    fn record(&mut self, record: &StatusRecord) -> io::Result<()>;
}

/// Sink that logs each record with `tracing` at INFO
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn record(&mut self, record: &StatusRecord) -> io::Result<()> {
        logging::log_status_line(&record.to_string());
        Ok(())
    }
}

/// Sink that writes one line per record
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> StatusSink for WriterSink<W> {
    fn record(&mut self, record: &StatusRecord) -> io::Result<()> {
        writeln!(self.writer, "{}", record)
    }
}

impl StatusSink for Vec<StatusRecord> {
    fn record(&mut self, record: &StatusRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}
