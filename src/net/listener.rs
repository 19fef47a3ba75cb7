//! Accepting endpoint producing connection implementation objects.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Wrap each accepted resource in the configured implementation variant,
//!   running the accept fix-up before application code sees it

use std::net::SocketAddr;
use std::os::fd::IntoRawFd;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::schema::{ImplKind, ListenerConfig};
use crate::net::conn::{ConnectionResource, EndpointPair, NetError};
use crate::net::impls::{ConnectionImpl, InstrumentedConnection, PlatformConnection};
use crate::net::native::{NativeIo, PlatformNative};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
    /// Accepted connection could not be fixed up or migrated; it was
    /// discarded.
    Handoff(NetError),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
            ListenerError::Handoff(e) => write!(f, "Failed to hand off accepted connection: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// A bounded accepting endpoint that hands out connection implementation
/// objects of the configured variant.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is
/// reached, new connections wait until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Address the listener is bound to.
    local_addr: SocketAddr,
    /// Which implementation variant accepted connections are wrapped in.
    implementation: ImplKind,
    /// Native layer shared by every produced implementation object.
    native: Arc<dyn NativeIo>,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
    /// Configured maximum connections.
    max_connections: usize,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            implementation = ?config.implementation,
            max_connections = config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            local_addr,
            implementation: config.implementation,
            native: Arc::new(PlatformNative),
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Returns the implementation object, the peer address, and a permit
    /// that must be held for the connection's lifetime. The object is
    /// already fixed up: its state matches what the connect path would
    /// have produced, whichever variant is configured.
    pub async fn accept(
        &self,
    ) -> Result<(Box<dyn ConnectionImpl>, SocketAddr, ConnectionPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore closed unexpectedly");

        let (stream, peer) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        let std_stream = stream.into_std().map_err(ListenerError::Accept)?;
        // The non-blocking flag belongs to the accept loop, not the new
        // owner; accepted resources are handed out blocking.
        std_stream
            .set_nonblocking(false)
            .map_err(ListenerError::Accept)?;
        let resource = ConnectionResource::from_raw(std_stream.into_raw_fd());

        let conn = self
            .install(resource, peer)
            .map_err(ListenerError::Handoff)?;

        metrics::counter!("socket_connections_accepted_total").increment(1);
        tracing::debug!(
            peer_addr = %peer,
            conn = %conn.id(),
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((conn, peer, ConnectionPermit { _permit: permit }))
    }

    /// Wrap a freshly accepted resource in the configured implementation.
    fn install(
        &self,
        resource: ConnectionResource,
        peer: SocketAddr,
    ) -> Result<Box<dyn ConnectionImpl>, NetError> {
        match self.implementation {
            ImplKind::Platform => {
                // The platform accept path records the local endpoint up
                // front; the instance is already consistent and the fix-up
                // stays a safe no-op.
                let endpoints = EndpointPair {
                    local: Some(self.local_addr),
                    remote: peer,
                };
                Ok(Box::new(PlatformConnection::from_accepted(
                    self.native.clone(),
                    resource,
                    endpoints,
                )))
            }
            ImplKind::Instrumented => {
                // The substitute path skips the connect-path bookkeeping;
                // the fix-up backfills it, then the platform-produced
                // instance is migrated into the substitute object.
                let endpoints = EndpointPair {
                    local: None,
                    remote: peer,
                };
                let mut platform =
                    PlatformConnection::from_accepted(self.native.clone(), resource, endpoints);
                platform.finalize_after_accept()?;

                let mut substitute =
                    InstrumentedConnection::with_native("accepted", self.native.clone());
                platform.transfer_ownership_to(&mut substitute)?;
                Ok(Box::new(substitute))
            }
        }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get configured maximum connections.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the slot is released back to the listener. This keeps
/// backpressure intact even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
