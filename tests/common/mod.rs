//! Shared utilities for integration testing.

use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Install the tracing stack and metric descriptions for a test run.
/// Safe to call from every test; only the first call takes effect.
pub fn init_observability() {
    socket_layer::observability::logging::init_logging("debug");
    socket_layer::observability::metrics::describe_metrics();
}

/// Open a client connection to `addr` and keep it alive until dropped.
pub async fn dial(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.expect("client connect failed")
}

/// Bind a throwaway listener just to reserve a port, then free it.
///
/// The returned address has no listener behind it, so a connect to it is
/// refused (barring an unlucky reuse race, which loopback tests tolerate).
pub fn vacant_addr() -> SocketAddr {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").expect("probe bind failed");
    probe.local_addr().expect("probe addr")
}
