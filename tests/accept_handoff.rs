//! End-to-end accept and ownership handoff over real sockets.

use std::time::Duration;

use socket_layer::config::schema::{ImplKind, ListenerConfig};
use socket_layer::{ConnState, ConnectionImpl, Listener, NetError, PlatformConnection};

mod common;

fn listener_config(kind: ImplKind) -> ListenerConfig {
    ListenerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        implementation: kind,
        max_connections: 4,
    }
}

#[tokio::test]
async fn platform_accept_has_consistent_endpoints() {
    common::init_observability();
    let listener = Listener::bind(&listener_config(ImplKind::Platform))
        .await
        .unwrap();
    let addr = listener.local_addr();
    let _client = common::dial(addr).await;

    let (mut conn, peer, _permit) = listener.accept().await.unwrap();

    assert_eq!(conn.state(), ConnState::Connected);
    let endpoints = conn.endpoints().unwrap();
    assert_eq!(endpoints.local, Some(addr));
    assert_eq!(endpoints.remote, peer);

    // The fix-up on an already-consistent instance stays a safe no-op.
    conn.finalize_after_accept().unwrap();
    assert_eq!(conn.endpoints().unwrap().local, Some(addr));

    conn.close().unwrap();
    conn.close().unwrap();
    assert_eq!(conn.state(), ConnState::Closed);
}

#[tokio::test]
async fn substitute_accept_is_finalized_and_migrated() {
    common::init_observability();
    let listener = Listener::bind(&listener_config(ImplKind::Instrumented))
        .await
        .unwrap();
    let addr = listener.local_addr();
    let _client = common::dial(addr).await;

    let (mut conn, peer, _permit) = listener.accept().await.unwrap();

    // The application-visible object is the substitute, already carrying
    // the backfilled local endpoint.
    assert_eq!(conn.state(), ConnState::Connected);
    let endpoints = conn.endpoints().unwrap();
    assert_eq!(endpoints.local, Some(addr));
    assert_eq!(endpoints.remote, peer);

    conn.close().unwrap();
}

#[tokio::test]
async fn accepted_connection_migrates_into_a_fresh_implementation() {
    common::init_observability();
    let listener = Listener::bind(&listener_config(ImplKind::Platform))
        .await
        .unwrap();
    let addr = listener.local_addr();
    let _client = common::dial(addr).await;

    let (mut conn, _peer, _permit) = listener.accept().await.unwrap();
    let endpoints = conn.endpoints();

    let mut replacement = PlatformConnection::new();
    conn.transfer_ownership_to(&mut replacement).unwrap();

    assert_eq!(conn.state(), ConnState::Closed);
    assert_eq!(conn.endpoints(), None);
    assert_eq!(replacement.state(), ConnState::Connected);
    assert_eq!(replacement.endpoints(), endpoints);

    // The migrated descriptor is live and closes cleanly exactly once.
    replacement.close().unwrap();

    // The inert source rejects further use.
    assert!(matches!(
        conn.connect(addr, None),
        Err(NetError::IllegalState { .. })
    ));
}

#[tokio::test]
async fn connect_path_populates_endpoints() {
    common::init_observability();
    let listener = Listener::bind(&listener_config(ImplKind::Platform))
        .await
        .unwrap();
    let addr = listener.local_addr();
    let accept_task = tokio::spawn(async move { listener.accept().await });

    let mut conn = tokio::task::spawn_blocking(move || {
        let mut conn = PlatformConnection::new();
        conn.connect(addr, Some(Duration::from_secs(5))).unwrap();
        conn
    })
    .await
    .unwrap();

    let (accepted, peer, _permit) = accept_task.await.unwrap().unwrap();
    let endpoints = conn.endpoints().unwrap();
    assert_eq!(endpoints.remote, addr);
    assert_eq!(endpoints.local, Some(peer));

    conn.close().unwrap();
    drop(accepted);
}

#[test]
fn connect_to_vacant_port_is_a_connection_error() {
    common::init_observability();
    let addr = common::vacant_addr();
    let mut conn = PlatformConnection::new();
    let err = conn
        .connect(addr, Some(Duration::from_secs(5)))
        .unwrap_err();
    assert!(matches!(
        err,
        NetError::Connect { .. } | NetError::ConnectTimeout { .. }
    ));
    assert_eq!(conn.state(), ConnState::Unconnected);
}
