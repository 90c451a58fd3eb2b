//! Provider/handler registry

use super::types::{AttributeHandler, AttributeProvider, AttributeType, ConfigAttribute};
use crate::logging;
use parking_lot::RwLock;
use std::net::IpAddr;
use std::sync::Arc;

/// Registry of attribute providers and handlers
///
/// Backends are consulted in registration order. Lookups take a read lock,
/// registration a write lock, so backends must not call back into the
/// manager to register or remove themselves.
#[derive(Default)]
pub struct AttributeManager {
    providers: RwLock<Vec<Arc<dyn AttributeProvider>>>,
    handlers: RwLock<Vec<Arc<dyn AttributeHandler>>>,
}

impl AttributeManager {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a virtual IP to peer `id`; the first provider that serves
    /// `pool` wins
    pub fn acquire_address(&self, pool: &str, id: &str, requested: Option<IpAddr>) -> Option<IpAddr> {
        let address = self
            .providers
            .read()
            .iter()
            .find_map(|p| p.acquire_address(pool, id, requested));
        if address.is_none() {
            logging::log_address_acquire_failed(pool);
        }
        address
    }

    /// Return a virtual IP; `false` if no provider took it back
    pub fn release_address(&self, pool: &str, address: IpAddr, id: &str) -> bool {
        self.providers
            .read()
            .iter()
            .any(|p| p.release_address(pool, address, id))
    }

    /// Attributes from every provider for peer `id`
    pub fn responder_attributes(
        &self,
        pool: Option<&str>,
        id: &str,
        vip: Option<IpAddr>,
    ) -> Vec<ConfigAttribute> {
        self.providers
            .read()
            .iter()
            .flat_map(|p| p.attributes(pool, id, vip))
            .collect()
    }

    /// Register a provider
    pub fn add_provider(&self, provider: Arc<dyn AttributeProvider>) {
        self.providers.write().push(provider);
    }

    /// Unregister a provider (by identity)
    pub fn remove_provider(&self, provider: &Arc<dyn AttributeProvider>) {
        self.providers.write().retain(|p| !same_object(p, provider));
    }

    /// Apply an attribute received from `server`
    ///
    /// `preferred` (the handler that requested the attribute) is asked
    /// first, then every other handler. Returns the handler that accepted
    /// it, to be passed to [`release`](Self::release) later.
    pub fn handle(
        &self,
        server: &str,
        preferred: Option<&Arc<dyn AttributeHandler>>,
        kind: AttributeType,
        data: &[u8],
    ) -> Option<Arc<dyn AttributeHandler>> {
        let handlers = self.handlers.read();

        let handled = preferred
            .and_then(|wanted| handlers.iter().find(|h| same_object(*h, wanted)))
            .filter(|h| h.handle(server, kind, data))
            .or_else(|| handlers.iter().find(|h| h.handle(server, kind, data)))
            .cloned();

        if handled.is_none() {
            logging::log_attribute_unhandled(&kind.to_string());
        }
        handled
    }

    /// Undo an attribute on the handler that accepted it
    ///
    /// Does nothing if that handler has been removed.
    pub fn release(
        &self,
        handler: &Arc<dyn AttributeHandler>,
        server: &str,
        kind: AttributeType,
        data: &[u8],
    ) {
        if let Some(h) = self.handlers.read().iter().find(|h| same_object(*h, handler)) {
            h.release(server, kind, data);
        }
    }

    /// Attributes to request from `server`, each tagged with the handler
    /// that wants it
    pub fn initiator_attributes(
        &self,
        server: &str,
        vip: Option<IpAddr>,
    ) -> Vec<(Arc<dyn AttributeHandler>, ConfigAttribute)> {
        self.handlers
            .read()
            .iter()
            .flat_map(|h| {
                h.attributes(server, vip)
                    .into_iter()
                    .map(move |attr| (Arc::clone(h), attr))
            })
            .collect()
    }

    /// Register a handler
    pub fn add_handler(&self, handler: Arc<dyn AttributeHandler>) {
        self.handlers.write().push(handler);
    }

    /// Unregister a handler (by identity)
    pub fn remove_handler(&self, handler: &Arc<dyn AttributeHandler>) {
        self.handlers.write().retain(|h| !same_object(h, handler));
    }

    /// Number of registered providers and handlers
    pub fn counts(&self) -> (usize, usize) {
        (self.providers.read().len(), self.handlers.read().len())
    }
}

/// Pointer identity, ignoring vtables
fn same_object<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
