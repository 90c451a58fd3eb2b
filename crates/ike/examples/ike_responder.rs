//! IKE responder front end
//!
//! Listens for IKE datagrams, keeps one IKE SA per peer exchange in an
//! [`IkeSaManager`] and prints the SA table when stopped with Ctrl-C. The
//! handler only walks the state machine; it does not build replies.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p fynx-ike --example ike_responder -- <bind_addr> [max_half_open]
//! ```
//!
//! **Note**: Binding to port 500 requires root/administrator privileges.

use fynx_ike::config::DispatcherConfig;
use fynx_ike::dispatch::{Disposition, Dispatcher, InboundMessage, MessageHandler};
use fynx_ike::ikev2::{ExchangeType, IkeState};
use fynx_ike::sa::{HalfOpenLimit, TracingSink};
use fynx_ike::{IkeSa, IkeSaManager, ManagerConfig, Result};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Walks the responder states for each exchange
struct StateWalker {
    manager: Arc<IkeSaManager>,
}

impl MessageHandler for StateWalker {
    fn handle(&self, sa: &mut IkeSa, message: &InboundMessage, created: bool) -> Result<Disposition> {
        match message.header.exchange_type {
            ExchangeType::IkeSaInit if created => {
                sa.set_responder_spi(self.manager.allocate_spi()?);
                sa.transition(IkeState::InitDone)?;
            }
            ExchangeType::IkeAuth if sa.state() == IkeState::InitDone => {
                sa.transition(IkeState::Established)?;
            }
            ExchangeType::Informational if message.header.flags.is_response() => {}
            ExchangeType::Informational => return Ok(Disposition::Delete),
            _ => {}
        }
        Ok(Disposition::Keep)
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <bind_addr> [max_half_open]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} 127.0.0.1:5000 1024", args[0]);
        eprintln!();
        eprintln!("Environment variables:");
        eprintln!("  RUST_LOG=fynx_ike=debug    Log every checkout/checkin");
        std::process::exit(1);
    }

    let bind_addr: SocketAddr = args[1].parse()?;
    if bind_addr.ip().is_unspecified() {
        // SAs would record no local host; see Dispatcher::run_until
        eprintln!("Bind to a specific local address, not {}", bind_addr.ip());
        std::process::exit(1);
    }
    let max_half_open: usize = match args.get(2) {
        Some(v) => v.parse()?,
        None => 1024,
    };

    let manager = Arc::new(
        IkeSaManager::new(ManagerConfig::default())
            .with_admission_control(HalfOpenLimit(max_half_open)),
    );
    let handler = StateWalker {
        manager: Arc::clone(&manager),
    };
    let dispatcher = Dispatcher::new(Arc::clone(&manager), handler, DispatcherConfig::default())?;

    let socket = UdpSocket::bind(bind_addr).await?;
    println!("Listening on {}", socket.local_addr()?);

    dispatcher
        .run_until(socket, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    manager.log_status(Some(&mut TracingSink), None);
    let snapshot = manager.metrics().snapshot();
    println!(
        "{} IKE SAs ({} half-open), {} created, {} checkouts ({:.1}% contended)",
        manager.len(),
        manager.half_open_count(),
        snapshot.sa_created_total(),
        snapshot.checkouts_total,
        snapshot.contention_rate() * 100.0
    );

    manager.destroy();
    Ok(())
}
