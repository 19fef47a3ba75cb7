//! Connection implementation core: state machine and ownership handoff.
//!
//! # Responsibilities
//! - Track connection state (Unconnected → Connected → Closed)
//! - Hold the native connection resource, exactly one owner at a time
//! - Move resource ownership between implementation objects
//! - Repair accept-created state so it matches the connect path
//!
//! # Design Decisions
//! - `ConnectionResource` is move-only; aliasing a live descriptor is
//!   unrepresentable
//! - The connect-path-only local endpoint is an explicit `Option`,
//!   populated by the connect path or by `finalize_after_accept`, never by
//!   constructor-order side effects
//! - Inside a transfer, the target's prior resource is released strictly
//!   before the source's resource becomes visible

use std::fmt;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::net::native::NativeIo;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is sufficient since we only need uniqueness.
static CONN_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection implementation instance, used for
/// log correlation across a handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl ConnId {
    /// Allocate the next unique ID.
    pub fn next() -> Self {
        Self(CONN_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sock-{}", self.0)
    }
}

/// Native handle to an established connection.
///
/// Move-only: exactly one implementation object can hold a given resource,
/// and releasing it consumes the value.
#[derive(Debug, PartialEq, Eq)]
pub struct ConnectionResource(RawFd);

impl ConnectionResource {
    pub(crate) fn from_raw(raw: RawFd) -> Self {
        Self(raw)
    }

    pub(crate) fn as_raw(&self) -> RawFd {
        self.0
    }

    pub(crate) fn into_raw(self) -> RawFd {
        self.0
    }
}

/// Connection implementation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Created but never connected; holds no resource.
    Unconnected,
    /// Holds a live resource and valid endpoints.
    Connected,
    /// Resource released or transferred away; permanently inert.
    Closed,
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnState::Unconnected => write!(f, "unconnected"),
            ConnState::Connected => write!(f, "connected"),
            ConnState::Closed => write!(f, "closed"),
        }
    }
}

/// Local/remote address information for a connected implementation object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointPair {
    /// Local address. Unset on a freshly accepted instance until the
    /// finalize step backfills it.
    pub local: Option<SocketAddr>,
    /// Remote peer address.
    pub remote: SocketAddr,
}

/// Errors surfaced by connection implementation operations.
#[derive(Debug, Error)]
pub enum NetError {
    /// Operation invoked while the instance's state makes it meaningless.
    /// Always a caller programming error; never retried.
    #[error("{operation} on a {state} connection")]
    IllegalState {
        operation: &'static str,
        state: ConnState,
    },

    /// Native connect failed (refused, unreachable, reset).
    #[error("connect to {remote} failed: {source}")]
    Connect {
        remote: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Native connect did not complete within the caller's timeout. No
    /// partially-established resource is left behind.
    #[error("connect to {remote} timed out after {timeout:?}")]
    ConnectTimeout {
        remote: SocketAddr,
        timeout: Duration,
    },

    /// The native release primitive reported a failure during close. The
    /// instance still transitioned to `Closed`; the descriptor is presumed
    /// gone.
    #[error("failed to release connection resource: {0}")]
    ResourceRelease(#[source] std::io::Error),

    /// The native layer could not report the state needed to repair an
    /// accept-created instance. The connection was discarded.
    #[error("failed to finalize accepted connection: {0}")]
    AcceptFinalize(#[source] std::io::Error),
}

/// Result type for connection operations.
pub type NetResult<T> = Result<T, NetError>;

/// Shared state machine behind every connection implementation variant.
///
/// Invariants:
/// - `resource` is `Some` if and only if `state == Connected`
/// - a `Closed` core never holds a resource
/// - at most one core references a given resource at any point in time
///
/// A single core is not safe for concurrent mutation; the `&mut self`
/// receivers make the caller serialize access. Distinct cores may be used
/// from different threads with no coordination, except when one is the
/// source or target of a transfer involving the other.
#[derive(Debug)]
pub struct ConnCore {
    id: ConnId,
    native: Arc<dyn NativeIo>,
    resource: Option<ConnectionResource>,
    state: ConnState,
    endpoints: Option<EndpointPair>,
    created_via_accept: bool,
}

impl ConnCore {
    /// Fresh unconnected core over the given native layer.
    pub fn new(native: Arc<dyn NativeIo>) -> Self {
        Self {
            id: ConnId::next(),
            native,
            resource: None,
            state: ConnState::Unconnected,
            endpoints: None,
            created_via_accept: false,
        }
    }

    /// Core adopting a resource produced by a listening-endpoint accept.
    ///
    /// The accept path may leave `endpoints.local` unset; it is the
    /// listening endpoint's job to run [`ConnCore::finalize_after_accept`]
    /// before the instance reaches application code.
    pub(crate) fn from_accepted(
        native: Arc<dyn NativeIo>,
        resource: ConnectionResource,
        endpoints: EndpointPair,
    ) -> Self {
        Self {
            id: ConnId::next(),
            native,
            resource: Some(resource),
            state: ConnState::Connected,
            endpoints: Some(endpoints),
            created_via_accept: true,
        }
    }

    /// This instance's log-correlation ID.
    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Endpoint information; `None` unless connected.
    pub fn endpoints(&self) -> Option<EndpointPair> {
        self.endpoints
    }

    /// Whether this instance's resource arrived through an accept rather
    /// than an explicit connect.
    pub fn created_via_accept(&self) -> bool {
        self.created_via_accept
    }

    fn illegal(&self, operation: &'static str) -> NetError {
        NetError::IllegalState {
            operation,
            state: self.state,
        }
    }

    /// Establish a connection to `remote`, optionally bounded by `timeout`.
    ///
    /// Fails with `IllegalState` unless the core is `Unconnected`. Timeout
    /// expiry releases any partially-established resource before the error
    /// surfaces.
    pub fn connect(&mut self, remote: SocketAddr, timeout: Option<Duration>) -> NetResult<()> {
        if self.state != ConnState::Unconnected {
            return Err(self.illegal("connect"));
        }

        let (resource, endpoints) =
            self.native
                .connect(remote, timeout)
                .map_err(|source| match (source.kind(), timeout) {
                    (std::io::ErrorKind::TimedOut, Some(timeout)) => {
                        NetError::ConnectTimeout { remote, timeout }
                    }
                    _ => NetError::Connect { remote, source },
                })?;

        self.resource = Some(resource);
        self.endpoints = Some(endpoints);
        self.state = ConnState::Connected;
        tracing::debug!(id = %self.id, %remote, "Connection established");
        Ok(())
    }

    /// Release the resource, if any, and mark the core `Closed`.
    ///
    /// Idempotent: closing an already-closed core is a no-op, and the
    /// second call never attempts another release. A failed release is
    /// surfaced as [`NetError::ResourceRelease`] but the core still ends up
    /// `Closed`.
    pub fn close(&mut self) -> NetResult<()> {
        self.endpoints = None;
        self.state = ConnState::Closed;
        match self.resource.take() {
            Some(resource) => match self.native.release(resource) {
                Ok(()) => {
                    tracing::trace!(id = %self.id, "Connection closed");
                    Ok(())
                }
                Err(err) => {
                    metrics::counter!("socket_resource_release_failures_total").increment(1);
                    tracing::warn!(id = %self.id, error = %err, "Releasing connection resource failed");
                    Err(NetError::ResourceRelease(err))
                }
            },
            None => Ok(()),
        }
    }

    /// Repair the state of an accept-created core so it matches what the
    /// connect path would have produced.
    ///
    /// The accept path skips the connect-path bookkeeping, so the cached
    /// local endpoint may be unset; this queries it from the native layer.
    /// Repeated calls are no-ops once the field is populated. Calling this
    /// on a core not produced by an accept is a programming error.
    ///
    /// If the native layer cannot report the endpoint, the accepted
    /// connection is discarded: the resource is released best-effort, the
    /// core ends up `Closed`, and [`NetError::AcceptFinalize`] is returned.
    pub fn finalize_after_accept(&mut self) -> NetResult<()> {
        if !self.created_via_accept || self.state != ConnState::Connected {
            return Err(self.illegal("finalize_after_accept"));
        }

        let needs_local = match &self.endpoints {
            Some(pair) => pair.local.is_none(),
            None => return Err(self.illegal("finalize_after_accept")),
        };
        if !needs_local {
            return Ok(());
        }

        let queried = match &self.resource {
            Some(resource) => self.native.local_endpoint(resource),
            None => return Err(self.illegal("finalize_after_accept")),
        };
        match queried {
            Ok(local) => {
                if let Some(pair) = self.endpoints.as_mut() {
                    pair.local = Some(local);
                }
                tracing::debug!(id = %self.id, %local, "Accepted connection finalized");
                Ok(())
            }
            Err(err) => {
                metrics::counter!("socket_accept_finalize_failures_total").increment(1);
                // Discard the accepted connection; close() reports any
                // release failure on its own.
                let _ = self.close();
                Err(NetError::AcceptFinalize(err))
            }
        }
    }

    /// Move the resource and associated state into `target`.
    ///
    /// Contract, in order:
    /// 1. fails with `IllegalState` unless this core is `Connected`, and
    ///    then mutates neither side;
    /// 2. a target holding a live resource is closed first, so its prior
    ///    resource is released strictly before the new one is visible;
    /// 3. `target` adopts resource, endpoints and accept provenance
    ///    verbatim and becomes `Connected`;
    /// 4. this core is marked `Closed` without a native release; the
    ///    resource now belongs to `target`.
    pub fn transfer_ownership_to(&mut self, target: &mut ConnCore) -> NetResult<()> {
        if self.state != ConnState::Connected {
            return Err(self.illegal("transfer_ownership_to"));
        }

        if target.state == ConnState::Connected {
            if let Err(err) = target.close() {
                // Release failures are non-fatal here, same as close().
                tracing::warn!(
                    id = %target.id,
                    error = %err,
                    "Transfer target reported an error while releasing its prior resource"
                );
            }
        }

        target.resource = self.resource.take();
        target.endpoints = self.endpoints.take();
        target.created_via_accept = self.created_via_accept;
        target.state = ConnState::Connected;

        // Closed without releasing: the single resource must only ever be
        // released by its one current owner.
        self.state = ConnState::Closed;

        metrics::counter!("socket_ownership_transfers_total").increment(1);
        tracing::debug!(
            from = %self.id,
            to = %target.id,
            "Connection ownership transferred"
        );
        Ok(())
    }
}

impl Drop for ConnCore {
    fn drop(&mut self) {
        // Backstop so a leaked implementation object cannot leak the
        // descriptor; close() reports release failures on its own.
        if self.state == ConnState::Connected {
            tracing::trace!(id = %self.id, "Connection dropped while connected");
            let _ = self.close();
        }
    }
}
