//! Pluggable socket implementation layer with connection ownership handoff.

pub mod config;
pub mod net;
pub mod observability;

pub use config::schema::SocketLayerConfig;
pub use net::conn::{ConnCore, ConnState, EndpointPair, NetError};
pub use net::impls::{ConnectionImpl, InstrumentedConnection, PlatformConnection};
pub use net::listener::Listener;
