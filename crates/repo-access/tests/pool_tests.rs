//! Integration tests for the session pool.
//!
//! These tests require the `mock` feature to be enabled.

#![cfg(feature = "mock")]

use std::sync::Arc;
use std::time::Duration;

use repo_access::mock::MockConnector;
use repo_access::{AccessError, ConnectError, HostConfig, PoolConfig, SessionPool};

fn host(user: &str) -> HostConfig {
    HostConfig::new("svn.example.com").username(user)
}

fn manual_eviction(idle: Duration) -> PoolConfig {
    PoolConfig::new()
        .purge_interval(Duration::ZERO)
        .idle_timeout(idle)
}

/// Concurrent first opens share one handshake.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_opens_share_one_handshake() {
    let connector = MockConnector::new().handshake_delay(Duration::from_millis(50));
    let pool = Arc::new(SessionPool::with_defaults(connector));

    let opens = (0..16).map(|_| {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.open(&host("alice")).await })
    });
    let sessions: Vec<_> = futures::future::join_all(opens)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(pool.connector().handshakes(), 1);
    assert_eq!(pool.stats().active_sessions, 16);

    let mut ids: Vec<_> = sessions.iter().map(|s| s.channel().id()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 16, "every session gets its own channel");
    assert!(sessions.iter().all(|s| !s.is_closed()));
}

/// Distinct principals on the same host are pooled separately.
#[tokio::test]
async fn targets_are_keyed_by_principal_and_port() {
    let pool = SessionPool::with_defaults(MockConnector::new());

    let _a = pool.open(&host("alice")).await.unwrap();
    let _b = pool.open(&host("bob")).await.unwrap();
    let _c = pool.open(&host("alice").port(2222)).await.unwrap();
    let _d = pool.open(&host("alice")).await.unwrap();

    assert_eq!(pool.connector().handshakes(), 3);
    assert_eq!(pool.stats().hosts, 3);
}

/// Opening after shutdown connects afresh.
#[tokio::test]
async fn shutdown_forces_fresh_handshake() {
    let pool = SessionPool::with_defaults(MockConnector::new());
    let before = pool.open(&host("alice")).await.unwrap();

    pool.shutdown().await;
    assert!(before.is_closed());
    assert!(pool.stats().is_empty());

    let after = pool.open(&host("alice")).await.unwrap();
    assert!(!after.is_closed());
    assert_eq!(pool.connector().handshakes(), 2);
    assert_eq!(pool.connector().closed(), 1);
}

/// Opens overtaken by a shutdown are retried against a new connection.
#[tokio::test(start_paused = true)]
async fn open_racing_shutdown_is_retried() {
    let connector = MockConnector::new()
        .handshake_delay(Duration::from_secs(1))
        .channel_delay(Duration::from_millis(1));
    let pool = Arc::new(SessionPool::new(connector, manual_eviction(Duration::from_secs(60))));

    let first = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.open(&host("alice")).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let shutdown = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.shutdown().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let second = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.open(&host("alice")).await })
    };

    let first = first.await.unwrap().unwrap();
    shutdown.await.unwrap();
    let second = second.await.unwrap().unwrap();

    assert!(!first.is_closed());
    assert!(!second.is_closed());
    assert_eq!(pool.connector().handshakes(), 2);
    assert_eq!(pool.connector().closed(), 1);
    assert_eq!(pool.stats().hosts, 1);
}

/// Handshake failures reach the caller with their classification.
#[tokio::test]
async fn handshake_failure_is_surfaced() {
    let pool = SessionPool::with_defaults(MockConnector::new().fail_next(1));

    let err = pool.open(&host("alice")).await.unwrap_err();
    assert!(matches!(
        err,
        AccessError::Connect(ConnectError::Connection { ref host, port: 22, .. }) if host == "svn.example.com"
    ));
    assert!(pool.open(&host("alice")).await.is_ok());
}

/// A link severed by the peer is replaced on the next open.
#[tokio::test]
async fn closed_link_is_reestablished() {
    let pool = SessionPool::with_defaults(MockConnector::new());
    drop(pool.open(&host("alice")).await.unwrap());

    pool.connector().drop_links();
    let session = pool.open(&host("alice")).await.unwrap();

    assert!(!session.is_closed());
    assert_eq!(pool.connector().handshakes(), 2);
    assert_eq!(pool.stats().hosts, 1);
}

/// Eviction spares busy and recently used connections.
#[tokio::test(start_paused = true)]
async fn eviction_spares_busy_and_recent_hosts() {
    let pool = SessionPool::new(MockConnector::new(), manual_eviction(Duration::from_secs(30)));

    let busy = pool.open(&host("busy")).await.unwrap();
    drop(pool.open(&host("idle")).await.unwrap());
    tokio::time::advance(Duration::from_secs(20)).await;
    drop(pool.open(&host("recent")).await.unwrap());
    tokio::time::advance(Duration::from_secs(15)).await;

    assert_eq!(pool.purge_idle().await, 1);
    assert_eq!(pool.stats().hosts, 2);
    assert_eq!(pool.connector().closed(), 1);

    drop(busy);
    tokio::time::advance(Duration::from_secs(31)).await;
    assert_eq!(pool.purge_idle().await, 2);
    assert!(pool.stats().is_empty());

    // Evicted targets reconnect transparently.
    drop(pool.open(&host("idle")).await.unwrap());
    assert_eq!(pool.connector().handshakes(), 4);
}

/// The background task sweeps on its interval and stops with the pool.
#[tokio::test(start_paused = true)]
async fn background_eviction_runs_on_interval() {
    let connector = MockConnector::new();
    let pool = SessionPool::new(
        connector.clone(),
        PoolConfig::new()
            .purge_interval(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(25)),
    );
    drop(pool.open(&host("alice")).await.unwrap());

    tokio::time::sleep(Duration::from_secs(21)).await;
    assert_eq!(pool.stats().hosts, 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(pool.stats().is_empty());
    assert_eq!(connector.closed(), 1);

    drop(pool);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.closed(), 1);
}
