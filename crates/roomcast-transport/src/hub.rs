//! Reference-counted owner of the process-wide transport connection.
//!
//! The first [`TransportHub::acquire`] connects; every further acquire
//! shares that connection. Each room session holds one [`TransportLease`].
//! When the last lease is dropped the connection is closed, and the next
//! acquire reconnects from scratch.

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{Connector, Transport, TransportError};

struct HubState<T> {
    transport: Option<Arc<T>>,
    leases: usize,
}

impl<T> HubState<T> {
    fn release(&mut self) -> Option<Arc<T>> {
        self.leases = self.leases.saturating_sub(1);
        if self.leases == 0 {
            self.transport.take()
        } else {
            None
        }
    }
}

fn lock<T>(state: &Mutex<HubState<T>>) -> MutexGuard<'_, HubState<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shares one connection among all concurrently active room sessions.
pub struct TransportHub<C: Connector> {
    connector: C,
    state: Arc<Mutex<HubState<C::Transport>>>,
    /// Serializes connects so concurrent first entries share one connection.
    connecting: tokio::sync::Mutex<()>,
}

impl<C: Connector> TransportHub<C> {
    /// Creates a hub. No connection is made until the first acquire.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            state: Arc::new(Mutex::new(HubState {
                transport: None,
                leases: 0,
            })),
            connecting: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns a lease on the shared connection, connecting if needed.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectFailed`] (or whatever the connector
    /// reports) when no connection exists and connecting fails. Safe to
    /// retry.
    pub async fn acquire(&self) -> Result<TransportLease<C::Transport>, TransportError> {
        let _connecting = self.connecting.lock().await;

        let existing = {
            let mut state = lock(&self.state);
            let existing = state.transport.clone();
            if existing.is_some() {
                state.leases += 1;
            }
            existing
        };
        if let Some(transport) = existing {
            tracing::trace!("sharing existing transport connection");
            return Ok(self.lease(transport));
        }

        tracing::info!("connecting shared transport");
        let transport = Arc::new(self.connector.connect().await?);
        {
            let mut state = lock(&self.state);
            state.transport = Some(Arc::clone(&transport));
            state.leases += 1;
        }
        Ok(self.lease(transport))
    }

    fn lease(&self, transport: Arc<C::Transport>) -> TransportLease<C::Transport> {
        TransportLease {
            transport,
            state: Arc::clone(&self.state),
        }
    }

    /// Number of outstanding leases.
    pub fn active_leases(&self) -> usize {
        lock(&self.state).leases
    }

    /// Returns `true` while a connection is held.
    pub fn is_connected(&self) -> bool {
        lock(&self.state).transport.is_some()
    }
}

/// A counted handle to the shared transport. Dereferences to the transport.
pub struct TransportLease<T: Transport> {
    transport: Arc<T>,
    state: Arc<Mutex<HubState<T>>>,
}

impl<T: Transport> Deref for TransportLease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Clone for TransportLease<T> {
    fn clone(&self) -> Self {
        lock(&self.state).leases += 1;
        Self {
            transport: Arc::clone(&self.transport),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Transport> Drop for TransportLease<T> {
    fn drop(&mut self) {
        let Some(transport) = lock(&self.state).release() else {
            return;
        };
        tracing::info!("last lease released, closing shared transport");
        // Drop is synchronous; close on the runtime if there is one.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = transport.close().await {
                        tracing::warn!(error = %e, "closing shared transport failed");
                    }
                });
            }
            Err(_) => {
                tracing::debug!("no runtime available, dropping transport without close");
            }
        }
    }
}
