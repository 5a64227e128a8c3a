// Tests for the discovery engine

use fabricmap_scanner::{
    CancelToken, DeviceStatus, DiscoveryEngine, DocumentFormat, ExpansionMode, MemorySource,
    Role, RoleTable,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const X1: &str = "iad12-12-es-c1";
const A: &str = "iad12-12-np-cor-r1";
const B: &str = "iad12-56-es-c1";
const C: &str = "nrt5-5-es-c1";
const D: &str = "iad12-57-es-c1";

const ROOT_DOC: &str = r#"
name: iad12-12-es-c1
site:
  topology: bfc
neighbors:
  iad12-12-np-cor-r1: { type: core }
  iad12-56-es-c1-b1: { type: bfc }
  nrt5-5-es-c1-b1: { type: bfc }
bricks:
  b1:
    neighbors:
      iad12-56-es-c1-b1: {}
      nrt5-5-es-c1-b1: {}
"#;

const B_DOC: &str = r#"
name: iad12-56-es-c1
bricks:
  b1:
    neighbors:
      iad12-12-es-c1-b1: {}
      iad12-57-es-c1-b3: {}
"#;

const C_DOC: &str = r#"
name: nrt5-5-es-c1
bricks:
  b1:
    neighbors:
      iad12-12-es-c1-b2: {}
      nrt5-6-es-c1-b1: {}
"#;

const D_DOC: &str = r#"
name: iad12-57-es-c1
bricks:
  b1:
    neighbors:
      iad12-56-es-c1-b3: {}
"#;

fn scenario_source() -> MemorySource {
    MemorySource::new()
        .with_document(X1, DocumentFormat::NeighborList, ROOT_DOC)
        .with_document(B, DocumentFormat::NeighborList, B_DOC)
        .with_document(C, DocumentFormat::NeighborList, C_DOC)
        .with_document(D, DocumentFormat::NeighborList, D_DOC)
}

fn pairs(records: &[fabricmap_scanner::ConnectionRecord]) -> BTreeSet<(String, String)> {
    records
        .iter()
        .map(|r| {
            let (a, b) = if r.source <= r.target {
                (&r.source, &r.target)
            } else {
                (&r.target, &r.source)
            };
            (a.clone(), b.clone())
        })
        .collect()
}

fn pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

// ============================================================================
// Pruned Expansion
// ============================================================================

#[tokio::test]
async fn test_scenario_node_set() {
    let engine = DiscoveryEngine::new(scenario_source(), RoleTable::default());
    let discovery = engine.discover(X1).await.unwrap();

    let names: Vec<&str> = discovery.devices.keys().map(String::as_str).collect();
    let mut expected = vec![X1, A, B, C, D];
    expected.sort();
    assert_eq!(names, expected);
    assert!(!discovery.cancelled);
}

#[tokio::test]
async fn test_scenario_edges() {
    let engine = DiscoveryEngine::new(scenario_source(), RoleTable::default());
    let discovery = engine.discover(X1).await.unwrap();

    let expected: BTreeSet<_> = [pair(X1, A), pair(X1, B), pair(X1, C), pair(B, D)]
        .into_iter()
        .collect();
    assert_eq!(pairs(&discovery.records), expected);
}

#[tokio::test]
async fn test_scenario_fetches() {
    let engine = DiscoveryEngine::new(scenario_source(), RoleTable::default());
    let discovery = engine.discover(X1).await.unwrap();

    let fetched = engine.source().fetched().await;
    assert_eq!(fetched, vec![X1, B, D]);
    assert_eq!(discovery.fetch_count, 3);

    // No-config core and the different-zone neighbor are leaves.
    let core = discovery.device(A).unwrap();
    assert_eq!(core.status, DeviceStatus::Leaf);
    assert_eq!(core.role, Role::Core);
    assert!(!core.has_fetchable_config);
    assert_eq!(discovery.device(C).unwrap().status, DeviceStatus::Leaf);
    assert_eq!(discovery.device(D).unwrap().status, DeviceStatus::Expanded);
    assert_eq!(discovery.device(D).unwrap().depth, 2);
}

#[tokio::test]
async fn test_declared_no_config_role_is_never_fetched() {
    let root = r#"
neighbors:
  iad12-12-gw-r1: { type: core }
"#;
    let source = MemorySource::new()
        .with_document(X1, DocumentFormat::NeighborList, root)
        .with_document("iad12-12-gw-r1", DocumentFormat::NeighborList, "{}");
    let engine = DiscoveryEngine::new(source, RoleTable::default());
    let discovery = engine.discover(X1).await.unwrap();

    assert_eq!(engine.source().fetched().await, vec![X1]);
    let gateway = discovery.device("iad12-12-gw-r1").unwrap();
    assert_eq!(gateway.role, Role::Core);
    assert_eq!(gateway.status, DeviceStatus::Leaf);
}

// ============================================================================
// Full Expansion
// ============================================================================

#[tokio::test]
async fn test_full_mode_disables_pruning() {
    let engine =
        DiscoveryEngine::new(scenario_source(), RoleTable::default()).with_mode(ExpansionMode::Full);
    let discovery = engine.discover(X1).await.unwrap();

    let fetched = engine.source().fetched().await;
    assert!(fetched.contains(&C.to_string()));
    // C's neighbor has no document of its own.
    let far = discovery.device("nrt5-6-es-c1").unwrap();
    assert!(far.missing_config());
    assert!(pairs(&discovery.records).contains(&pair(C, "nrt5-6-es-c1")));
}

// ============================================================================
// Termination and Fetch-Once
// ============================================================================

fn mesh_source() -> MemorySource {
    let doc = |others: [&str; 2]| {
        format!(
            "bricks:\n  b1:\n    neighbors:\n      {}: {{}}\n      {}: {{}}\n",
            others[0], others[1]
        )
    };
    MemorySource::new()
        .with_document("iad1-1-es-c1", DocumentFormat::NeighborList, doc(["iad1-2-es-c1", "iad1-3-es-c1"]))
        .with_document("iad1-2-es-c1", DocumentFormat::NeighborList, doc(["iad1-1-es-c1", "iad1-3-es-c1"]))
        .with_document("iad1-3-es-c1", DocumentFormat::NeighborList, doc(["iad1-1-es-c1", "iad1-2-es-c1"]))
}

#[tokio::test]
async fn test_cyclic_mesh_fetches_each_device_once() {
    for concurrency in [1, 2, 8] {
        let engine =
            DiscoveryEngine::new(mesh_source(), RoleTable::default()).with_concurrency(concurrency);
        let discovery = engine.discover("iad1-1-es-c1").await.unwrap();

        let fetched = engine.source().fetched().await;
        let unique: BTreeSet<_> = fetched.iter().collect();
        assert_eq!(fetched.len(), 3, "concurrency {concurrency}");
        assert_eq!(unique.len(), 3);
        assert_eq!(discovery.devices.len(), 3);
        assert!(discovery.devices.values().all(|d| d.status == DeviceStatus::Expanded));
    }
}

// ============================================================================
// Node-Scoped Failures
// ============================================================================

#[tokio::test]
async fn test_missing_neighbor_becomes_stub() {
    let source = MemorySource::new().with_document(X1, DocumentFormat::NeighborList, ROOT_DOC);
    let engine = DiscoveryEngine::new(source, RoleTable::default());
    let discovery = engine.discover(X1).await.unwrap();

    let stub = discovery.device(B).unwrap();
    assert!(stub.missing_config());
    assert!(matches!(&stub.status, DeviceStatus::Failed(reason) if reason.contains("not found")));
    assert_eq!(discovery.failed().count(), 1);
    assert_eq!(discovery.device(X1).unwrap().status, DeviceStatus::Expanded);
}

#[tokio::test]
async fn test_unparseable_neighbor_fails_only_itself() {
    let source = MemorySource::new()
        .with_document(X1, DocumentFormat::NeighborList, ROOT_DOC)
        .with_document(B, DocumentFormat::NodeInterfaces, "{ broken");
    let engine = DiscoveryEngine::new(source, RoleTable::default());
    let discovery = engine.discover(X1).await.unwrap();

    assert!(matches!(
        &discovery.device(B).unwrap().status,
        DeviceStatus::Failed(reason) if reason.starts_with("unparseable document")
    ));
    assert_eq!(discovery.devices.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_times_out() {
    let source = scenario_source().with_delay(B, Duration::from_secs(60));
    let engine = DiscoveryEngine::new(source, RoleTable::default())
        .with_fetch_timeout(Duration::from_secs(5));
    let discovery = engine.discover(X1).await.unwrap();

    assert!(matches!(
        &discovery.device(B).unwrap().status,
        DeviceStatus::Failed(reason) if reason.contains("timed out")
    ));
    // D is only known through B.
    assert!(discovery.device(D).is_none());
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancel_leaves_partial_discovery() {
    let token = CancelToken::new();
    let trigger = token.clone();
    let engine = DiscoveryEngine::new(scenario_source(), RoleTable::default())
        .with_cancel_token(token)
        .with_progress_callback(Arc::new(move |name: &str, status: &DeviceStatus| {
            if name == X1 && *status == DeviceStatus::Expanded {
                trigger.cancel();
            }
        }));
    let discovery = engine.discover(X1).await.unwrap();

    assert!(discovery.cancelled);
    assert_eq!(discovery.fetch_count, 1);
    assert_eq!(discovery.device(X1).unwrap().status, DeviceStatus::Expanded);
    assert_eq!(discovery.device(B).unwrap().status, DeviceStatus::Queued);
    assert!(pairs(&discovery.records).contains(&pair(X1, B)));
}

#[tokio::test]
async fn test_cancel_before_start_fetches_nothing() {
    let engine = DiscoveryEngine::new(scenario_source(), RoleTable::default());
    engine.cancel_token().cancel();
    let discovery = engine.discover(X1).await.unwrap();

    assert!(discovery.cancelled);
    assert_eq!(discovery.fetch_count, 0);
    assert!(engine.source().fetched().await.is_empty());
}
