//! Concrete connection implementation variants.
//!
//! # Responsibilities
//! - Define the capability interface every variant satisfies
//! - Provide the platform-native variant used by default
//! - Provide a substitute variant with instrumentation layered on top
//!
//! # Design Decisions
//! - All lifecycle semantics live in `ConnCore`; variants only add
//!   construction paths and observability
//! - The trait is object-safe so listeners can hand out boxed variants and
//!   a transfer can cross variant boundaries

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::net::conn::{ConnCore, ConnId, ConnState, ConnectionResource, EndpointPair, NetResult};
use crate::net::native::{NativeIo, PlatformNative};

/// Capability interface satisfied by every connection implementation
/// variant.
///
/// The provided methods delegate to the shared [`ConnCore`]; variants
/// override them only to layer behavior (e.g. instrumentation) on top.
/// A single implementation object is not safe for concurrent mutation;
/// the `&mut self` receivers make the caller serialize access.
pub trait ConnectionImpl: Send + std::fmt::Debug {
    /// Shared state machine backing this variant.
    fn core(&self) -> &ConnCore;

    /// Mutable access to the backing state machine.
    fn core_mut(&mut self) -> &mut ConnCore;

    /// Establish a connection to `remote`, optionally bounded by `timeout`.
    fn connect(&mut self, remote: SocketAddr, timeout: Option<Duration>) -> NetResult<()> {
        self.core_mut().connect(remote, timeout)
    }

    /// Release the resource, if any, and mark this object closed.
    fn close(&mut self) -> NetResult<()> {
        self.core_mut().close()
    }

    /// Repair accept-created state; see [`ConnCore::finalize_after_accept`].
    fn finalize_after_accept(&mut self) -> NetResult<()> {
        self.core_mut().finalize_after_accept()
    }

    /// Move the resource and associated state into `target`, leaving this
    /// object permanently inert; see [`ConnCore::transfer_ownership_to`].
    fn transfer_ownership_to(&mut self, target: &mut dyn ConnectionImpl) -> NetResult<()> {
        self.core_mut().transfer_ownership_to(target.core_mut())
    }

    /// Current lifecycle state.
    fn state(&self) -> ConnState {
        self.core().state()
    }

    /// Endpoint information; `None` unless connected.
    fn endpoints(&self) -> Option<EndpointPair> {
        self.core().endpoints()
    }

    /// Log-correlation ID of this object.
    fn id(&self) -> ConnId {
        self.core().id()
    }
}

/// Platform-native implementation variant, backed directly by the real
/// socket layer.
#[derive(Debug)]
pub struct PlatformConnection {
    core: ConnCore,
}

impl PlatformConnection {
    /// Fresh unconnected instance over the platform native layer.
    pub fn new() -> Self {
        Self::with_native(Arc::new(PlatformNative))
    }

    /// Fresh unconnected instance over a caller-supplied native layer.
    pub fn with_native(native: Arc<dyn NativeIo>) -> Self {
        Self {
            core: ConnCore::new(native),
        }
    }

    /// Instance adopting a resource produced by a native accept.
    pub(crate) fn from_accepted(
        native: Arc<dyn NativeIo>,
        resource: ConnectionResource,
        endpoints: EndpointPair,
    ) -> Self {
        Self {
            core: ConnCore::from_accepted(native, resource, endpoints),
        }
    }
}

impl Default for PlatformConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionImpl for PlatformConnection {
    fn core(&self) -> &ConnCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ConnCore {
        &mut self.core
    }
}

/// Substitute implementation variant: same lifecycle semantics with
/// tracing spans and metrics layered over every operation.
#[derive(Debug)]
pub struct InstrumentedConnection {
    core: ConnCore,
    label: String,
}

impl InstrumentedConnection {
    /// Fresh unconnected instance over the platform native layer.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_native(label, Arc::new(PlatformNative))
    }

    /// Fresh unconnected instance over a caller-supplied native layer.
    pub fn with_native(label: impl Into<String>, native: Arc<dyn NativeIo>) -> Self {
        Self {
            core: ConnCore::new(native),
            label: label.into(),
        }
    }

    /// The label this instance reports in spans and log events.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl ConnectionImpl for InstrumentedConnection {
    fn core(&self) -> &ConnCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ConnCore {
        &mut self.core
    }

    fn connect(&mut self, remote: SocketAddr, timeout: Option<Duration>) -> NetResult<()> {
        let span = tracing::debug_span!("connect", id = %self.core.id(), label = %self.label);
        let _guard = span.enter();
        let result = self.core.connect(remote, timeout);
        if result.is_ok() {
            metrics::counter!("socket_instrumented_connects_total").increment(1);
        }
        result
    }

    fn close(&mut self) -> NetResult<()> {
        let span = tracing::debug_span!("close", id = %self.core.id(), label = %self.label);
        let _guard = span.enter();
        self.core.close()
    }

    fn transfer_ownership_to(&mut self, target: &mut dyn ConnectionImpl) -> NetResult<()> {
        let span = tracing::debug_span!(
            "transfer",
            from = %self.core.id(),
            to = %target.id(),
            label = %self.label,
        );
        let _guard = span.enter();
        self.core.transfer_ownership_to(target.core_mut())
    }
}
