//! Structured logging for IKE SA management
//!
//! Provides structured, contextual logging using the `tracing` framework.
//! SPIs are rendered as hex so they line up with packet captures.
//!
//! # Log Levels
//!
//! - **TRACE**: Inbound datagrams
//! - **DEBUG**: Checkout/checkin traffic, attribute backend misses
//! - **INFO**: SA creation, deletion, status lines, shutdown
//! - **WARN**: Refused creations, failed status sinks, dropped datagrams
//!
//! # Example
//!
//! ```no_run
//! use fynx_ike::logging;
//!
//! // Initialize tracing subscriber (in tests or applications)
//! tracing_subscriber::fmt()
//!     .with_env_filter("fynx_ike=debug")
//!     .init();
//!
//! logging::log_ike_sa_created(0x0102_0304_0506_0708, 0, "responder");
//! ```

use tracing::{debug, info, trace, warn};

/// Log IKE SA state transition
///
/// # Arguments
///
/// * `spi_i` - Initiator SPI
/// * `spi_r` - Responder SPI
/// * `old_state` - Previous IKE SA state
/// * `new_state` - New IKE SA state
pub fn log_ike_state_transition(spi_i: u64, spi_r: u64, old_state: &str, new_state: &str) {
    info!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        ike_spi_r = %hex::encode(spi_r.to_be_bytes()),
        state_from = old_state,
        state_to = new_state,
        "IKE SA state transition"
    );
}

/// Log IKE SA entering the table
///
/// # Arguments
///
/// * `spi_i` - Initiator SPI
/// * `spi_r` - Responder SPI (zero while half-open)
/// * `role` - "initiator" or "responder"
pub fn log_ike_sa_created(spi_i: u64, spi_r: u64, role: &str) {
    info!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        ike_spi_r = %hex::encode(spi_r.to_be_bytes()),
        role = role,
        "IKE SA created"
    );
}

/// Log IKE SA removal
///
/// # Arguments
///
/// * `spi_i` - Initiator SPI
/// * `spi_r` - Responder SPI
/// * `reason` - e.g. "deleted", "shutdown"
pub fn log_ike_sa_deleted(spi_i: u64, spi_r: u64, reason: &str) {
    info!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        ike_spi_r = %hex::encode(spi_r.to_be_bytes()),
        reason = reason,
        "IKE SA deleted"
    );
}

/// Log a checkout
///
/// # Arguments
///
/// * `spi_i` - Initiator SPI
/// * `spi_r` - Responder SPI
/// * `waited` - Whether the caller had to wait for another holder
pub fn log_checkout(spi_i: u64, spi_r: u64, waited: bool) {
    debug!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        ike_spi_r = %hex::encode(spi_r.to_be_bytes()),
        waited = waited,
        "IKE SA checked out"
    );
}

/// Log a checkin
///
/// # Arguments
///
/// * `spi_i` - Initiator SPI
/// * `spi_r` - Responder SPI
/// * `rekeyed` - Whether the SPI pair changed while checked out
pub fn log_checkin(spi_i: u64, spi_r: u64, rekeyed: bool) {
    debug!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        ike_spi_r = %hex::encode(spi_r.to_be_bytes()),
        rekeyed = rekeyed,
        "IKE SA checked in"
    );
}

/// Log a lookup miss
///
/// # Arguments
///
/// * `key` - What was looked up (SA id or host pair)
pub fn log_not_found(key: &str) {
    debug!(key = key, "IKE SA not found");
}

/// Log a refused half-open SA
///
/// # Arguments
///
/// * `spi_i` - Initiator SPI from the request
/// * `half_open` - Half-open SAs currently held
pub fn log_admission_denied(spi_i: u64, half_open: usize) {
    warn!(
        ike_spi_i = %hex::encode(spi_i.to_be_bytes()),
        half_open = half_open,
        "Half-open IKE SA refused by admission control"
    );
}

/// Log one status line
///
/// # Arguments
///
/// * `line` - Rendered status record
pub fn log_status_line(line: &str) {
    info!("{}", line);
}

/// Log a status sink failure
///
/// # Arguments
///
/// * `error` - Error reported by the sink
pub fn log_status_sink_failed(error: &str) {
    warn!(error = error, "Status sink failed, continuing");
}

/// Log manager shutdown progress
///
/// # Arguments
///
/// * `phase` - "draining" or "stopped"
/// * `ike_sas` - SAs still in the table
pub fn log_shutdown(phase: &str, ike_sas: usize) {
    info!(phase = phase, ike_sas = ike_sas, "IKE SA manager shutdown");
}

/// Log inbound datagram
///
/// # Arguments
///
/// * `exchange` - Exchange type name (e.g. "IKE_SA_INIT")
/// * `peer_addr` - Peer address
/// * `size_bytes` - Datagram size in bytes
pub fn log_message_recv(exchange: &str, peer_addr: &str, size_bytes: usize) {
    trace!(
        exchange = exchange,
        peer = peer_addr,
        size_bytes = size_bytes,
        "Received IKE message"
    );
}

/// Log a dropped datagram
///
/// # Arguments
///
/// * `peer_addr` - Peer address
/// * `error` - Why it was dropped
pub fn log_message_dropped(peer_addr: &str, error: &str) {
    warn!(peer = peer_addr, error = error, "Dropped IKE message");
}

/// Log a dispatcher socket bound to a wildcard address
///
/// SAs created through it carry an unspecified local host.
///
/// # Arguments
///
/// * `local_addr` - Socket address
pub fn log_wildcard_bind(local_addr: &str) {
    warn!(
        local = local_addr,
        "Socket bound to wildcard address; SAs record no local host"
    );
}

/// Log a failed address assignment
///
/// # Arguments
///
/// * `pool` - Address pool name
pub fn log_address_acquire_failed(pool: &str) {
    debug!(pool = pool, "Acquiring address from pool failed");
}

/// Log an attribute no handler accepted
///
/// # Arguments
///
/// * `attribute` - Attribute type name
pub fn log_attribute_unhandled(attribute: &str) {
    debug!(attribute = attribute, "Handling configuration attribute failed");
}
