//! Lifecycle tests: eager connect, bounded graceful close, the forced
//! fallback, and cooperative cancellation of the shutdown wait.

use std::sync::Arc;
use std::time::Duration;

use plinth_cassandra::{Error, ManagedCluster};
use plinth_cql::{ClusterBuilder, NodeInfo};
use plinth_cql_mock::{CloseBehavior, MockCluster, MockClusterBuilder};
use tokio::time::Instant;

fn cluster(behavior: CloseBehavior) -> (MockCluster, ManagedCluster<MockCluster>) {
    cluster_with_timeout(behavior, Duration::from_secs(30))
}

fn cluster_with_timeout(
    behavior: CloseBehavior,
    shutdown_timeout: Duration,
) -> (MockCluster, ManagedCluster<MockCluster>) {
    let client = MockClusterBuilder::new()
        .with_close_behavior(behavior)
        .build()
        .unwrap();

    let managed = ManagedCluster::new(client.clone(), shutdown_timeout);

    (client, managed)
}

#[tokio::test]
async fn start_connects_eagerly() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let client = MockClusterBuilder::new()
        .with_reported_name("prod-eu")
        .with_node(NodeInfo {
            address: "10.1.0.1:9042".parse().unwrap(),
            datacenter: Some("dc1".to_owned()),
            rack: Some("r1".to_owned()),
            version: Some("4.1.4".to_owned()),
        })
        .build()
        .unwrap();
    let managed = ManagedCluster::new(client.clone(), Duration::from_secs(30));

    assert!(!client.is_connected());

    managed.start().await.unwrap();

    assert!(client.is_connected());
    assert_eq!(client.connect_calls(), 1);
    assert_eq!(managed.cluster_name(), "prod-eu");
}

#[tokio::test]
async fn connect_failure_aborts_startup() {
    let client = MockClusterBuilder::new()
        .with_connect_error("no reachable contact points")
        .build()
        .unwrap();
    let managed = ManagedCluster::new(client.clone(), Duration::from_secs(30));

    let result = managed.start().await;

    assert!(matches!(result, Err(Error::Connect(_))));
    assert!(!client.is_connected());

    // A failed start leaves nothing to stop.
    assert!(matches!(managed.stop().await, Err(Error::NotStarted)));
}

#[tokio::test]
async fn lifecycle_misuse_is_detected() {
    let (_client, managed) = cluster(CloseBehavior::Immediate);

    assert!(matches!(managed.stop().await, Err(Error::NotStarted)));

    managed.start().await.unwrap();
    assert!(matches!(managed.start().await, Err(Error::AlreadyStarted)));

    managed.stop().await.unwrap();
    assert!(matches!(managed.stop().await, Err(Error::AlreadyClosed)));
    assert!(matches!(managed.start().await, Err(Error::AlreadyClosed)));
}

#[tokio::test(start_paused = true)]
async fn graceful_close_within_the_grace_period() {
    let (client, managed) = cluster(CloseBehavior::After(Duration::from_millis(50)));

    managed.start().await.unwrap();

    let started = Instant::now();
    managed.stop().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(100));
    assert!(client.is_closed());
    assert!(!client.was_forced());
    assert_eq!(client.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn forced_close_after_the_grace_period() {
    let (client, managed) =
        cluster_with_timeout(CloseBehavior::Hang, Duration::from_millis(100));

    managed.start().await.unwrap();

    let started = Instant::now();
    managed.stop().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(200));
    assert!(client.was_forced());
    assert!(client.is_closed());
}

#[tokio::test(start_paused = true)]
async fn cancellation_abandons_the_wait_without_forcing() {
    let (client, managed) = cluster(CloseBehavior::Hang);

    managed.start().await.unwrap();

    let managed = Arc::new(managed);
    let token = managed.shutdown_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });

    let started = Instant::now();
    managed.stop().await.unwrap();
    let elapsed = started.elapsed();

    // Returned promptly, long before the 30s grace period.
    assert!(elapsed < Duration::from_millis(100));
    // The close was neither forced nor finished; it drains in the
    // background.
    assert!(!client.was_forced());
    assert!(!client.is_closed());
    assert!(managed.shutdown_token().is_cancelled());
}

#[tokio::test]
async fn close_failure_surfaces_as_shutdown_error() {
    let (client, managed) = cluster(CloseBehavior::Fail);

    managed.start().await.unwrap();

    let result = managed.stop().await;

    assert!(matches!(result, Err(Error::Shutdown(_))));
    assert!(!client.was_forced());
}
