//! Datagram dispatcher
//!
//! Bridges a tokio UDP socket to the blocking [`IkeSaManager`]. Each
//! datagram is parsed far enough to find its IKE SA, then processed on the
//! blocking thread pool:
//!
//! ```text
//! recv_from ─→ IkeHeader ─→ spawn_blocking {
//!                               checkout(id)
//!                               handler.handle(&mut sa, msg)
//!                               checkin / checkin_and_delete
//!                           }
//! ```
//!
//! Checkout may block on another thread holding the SA, which is why the
//! work never runs on the async executor itself.

use crate::config::DispatcherConfig;
use crate::ikev2::IkeHeader;
use crate::sa::{HostPair, IkeSa, IkeSaId, IkeSaManager};
use crate::{logging, Error, Result};
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;

/// A received IKE message with its parsed header
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Parsed IKE header
    pub header: IkeHeader,
    /// Sender
    pub peer: SocketAddr,
    /// Address the datagram arrived on
    pub local: SocketAddr,
    /// Whole message, header included
    pub data: Bytes,
}

impl InboundMessage {
    /// Parse the header of a received datagram
    ///
    /// # Errors
    ///
    /// Header parse errors, or [`Error::InvalidLength`] if the datagram is
    /// shorter than the length the header announces.
    pub fn parse(data: Bytes, peer: SocketAddr, local: SocketAddr) -> Result<Self> {
        let header = IkeHeader::from_bytes(&data)?;
        if (header.length as usize) > data.len() {
            return Err(Error::InvalidLength {
                expected: header.length as usize,
                actual: data.len(),
            });
        }
        Ok(Self {
            header,
            peer,
            local,
            data,
        })
    }

    /// The SA this message belongs to, seen from our side
    pub fn sa_id(&self) -> IkeSaId {
        IkeSaId::from_header(&self.header)
    }
}

/// What to do with the SA after handling a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Check it back in
    Keep,
    /// Remove and destroy it
    Delete,
}

/// Protocol logic run on a checked-out SA
pub trait MessageHandler: Send + Sync + 'static {
    /// Process one message
    ///
    /// `created` is true when this message created the SA (first
    /// IKE_SA_INIT from a peer). An error on a created SA deletes it.
    fn handle(&self, sa: &mut IkeSa, message: &InboundMessage, created: bool) -> Result<Disposition>;
}

/// Feeds inbound messages to a [`MessageHandler`] through the manager
pub struct Dispatcher<H> {
    manager: Arc<IkeSaManager>,
    handler: Arc<H>,
    config: DispatcherConfig,
    permits: Arc<Semaphore>,
}

impl<H: MessageHandler> Dispatcher<H> {
    /// Create a dispatcher
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn new(manager: Arc<IkeSaManager>, handler: H, config: DispatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            manager,
            handler: Arc::new(handler),
            permits: Arc::new(Semaphore::new(config.max_in_flight)),
            config,
        })
    }

    /// The manager messages are dispatched to
    pub fn manager(&self) -> &Arc<IkeSaManager> {
        &self.manager
    }

    /// Process one message and wait for the outcome
    ///
    /// # Errors
    ///
    /// Lookup errors from the manager, or the handler's error.
    pub async fn dispatch(&self, message: InboundMessage) -> Result<Disposition> {
        let manager = Arc::clone(&self.manager);
        let handler = Arc::clone(&self.handler);
        tokio::task::spawn_blocking(move || process(&manager, handler.as_ref(), &message))
            .await
            .map_err(|e| Error::Internal(format!("dispatch task failed: {}", e)))?
    }

    /// Receive and dispatch datagrams until `shutdown` completes
    ///
    /// At most `max_in_flight` messages are processed at once; receiving
    /// pauses while that many are pending. Unparseable datagrams and
    /// per-message failures are logged and dropped. Waits for in-flight
    /// messages before returning.
    ///
    /// SAs created here record the socket's own address as their local
    /// host. A socket bound to a wildcard address cannot tell which local
    /// address a datagram was sent to, so its SAs carry the unspecified
    /// address and are only found by [`IkeSaManager::checkout_by_hosts`]
    /// with an unspecified local side. Bind one socket per local address to
    /// look SAs up by local address.
    ///
    /// # Errors
    ///
    /// Socket errors.
    pub async fn run_until<F>(&self, socket: UdpSocket, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local = socket.local_addr()?;
        if local.ip().is_unspecified() {
            logging::log_wildcard_bind(&local.to_string());
        }
        let mut buf = vec![0u8; self.config.recv_buffer_size];
        tokio::pin!(shutdown);

        loop {
            let (len, peer) = tokio::select! {
                _ = &mut shutdown => break,
                received = socket.recv_from(&mut buf) => received?,
            };

            let data = Bytes::copy_from_slice(&buf[..len]);
            let message = match InboundMessage::parse(data, peer, local) {
                Ok(message) => message,
                Err(e) => {
                    logging::log_message_dropped(&peer.to_string(), &e.to_string());
                    continue;
                }
            };
            logging::log_message_recv(message.header.exchange_type.name(), &peer.to_string(), len);

            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|e| Error::Internal(e.to_string()))?;
            let manager = Arc::clone(&self.manager);
            let handler = Arc::clone(&self.handler);
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                if let Err(e) = process(&manager, handler.as_ref(), &message) {
                    logging::log_message_dropped(&message.peer.to_string(), &e.to_string());
                }
            });
        }

        let all = u32::try_from(self.config.max_in_flight).unwrap_or(u32::MAX);
        let _drained = self
            .permits
            .acquire_many(all)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        Ok(())
    }
}

fn process<H: MessageHandler>(
    manager: &IkeSaManager,
    handler: &H,
    message: &InboundMessage,
) -> Result<Disposition> {
    let id = message.sa_id();
    // only a fresh IKE_SA_INIT may create a responder SA
    if !id.is_initiator() && id.is_half_open() && !message.header.is_initial_request() {
        return Err(Error::InvalidState(format!(
            "{} without responder SPI",
            message.header.exchange_type.name()
        )));
    }

    let checkout = manager.checkout(&id)?;
    let created = checkout.is_created();
    let mut sa = checkout.into_inner();
    if created {
        sa.set_hosts(HostPair::new(message.local.ip(), message.peer.ip()));
    }

    match handler.handle(&mut sa, message, created) {
        Ok(Disposition::Keep) => {
            manager.checkin(sa)?;
            Ok(Disposition::Keep)
        }
        Ok(Disposition::Delete) => {
            manager.checkin_and_delete(sa)?;
            Ok(Disposition::Delete)
        }
        Err(e) if created => {
            manager.checkin_and_delete(sa)?;
            Err(e)
        }
        Err(e) => {
            manager.checkin(sa)?;
            Err(e)
        }
    }
}
