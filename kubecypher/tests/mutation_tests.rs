//! CREATE, SET and DELETE tests

#[path = "testutils/mod.rs"]
mod testutils;

use kubecypher::gateway::memory::GatewayCall;
use kubecypher::{ExecutionError, GatewayError};
use serde_json::json;
use testutils::test_fixture::TestFixture;

#[tokio::test]
async fn test_delete_then_match_is_empty() {
    let fixture = TestFixture::with_sample_cluster();
    let result = fixture
        .assert_query_succeeds(r#"DELETE (d:Deployment {name: "web"})"#)
        .await;
    assert_eq!(result.binding("d").unwrap().len(), 1);
    assert_eq!(fixture.delete_calls(), 1);
    assert!(fixture.gateway().calls().iter().any(|c| matches!(
        c,
        GatewayCall::Delete { namespace: Some(ns), name, .. } if ns == "default" && name == "web"
    )));

    let result = fixture
        .assert_query_succeeds(r#"MATCH (d:Deployment {name: "web"})"#)
        .await;
    assert!(result.binding("d").unwrap().is_empty());

    // The staging copy is untouched
    fixture.coordinator().set_namespace("staging");
    let names = fixture.names("MATCH (d:Deployment)", "d").await;
    assert_eq!(names, vec!["web"]);
}

#[tokio::test]
async fn test_delete_without_matches_sends_nothing() {
    let fixture = TestFixture::with_sample_cluster();
    let result = fixture
        .assert_query_succeeds(r#"DELETE (p:Pod {app: "missing"})"#)
        .await;
    assert!(result.is_empty());
    assert_eq!(fixture.delete_calls(), 0);
}

#[tokio::test]
async fn test_delete_along_relationship() {
    let fixture = TestFixture::with_sample_cluster();
    let before = fixture.gateway().objects().len();
    fixture
        .assert_query_succeeds(r#"DELETE (rs:ReplicaSet {name: "api-5f9"})-[:OWN]->(p:Pod)"#)
        .await;
    assert_eq!(fixture.delete_calls(), 2);
    assert_eq!(fixture.gateway().objects().len(), before - 2);

    let pods = fixture.names("MATCH (p:Pod)", "p").await;
    assert_eq!(pods, vec!["web-7d4-a", "web-7d4-b", "db-0"]);
}

#[tokio::test]
async fn test_delete_cluster_scoped() {
    let fixture = TestFixture::with_sample_cluster();
    fixture
        .assert_query_succeeds(r#"DELETE (n:Node {name: "node-1"})"#)
        .await;
    assert!(fixture.gateway().calls().iter().any(|c| matches!(
        c,
        GatewayCall::Delete { namespace: None, name, .. } if name == "node-1"
    )));
}

#[tokio::test]
async fn test_create_then_match() {
    let fixture = TestFixture::with_sample_cluster();
    let result = fixture
        .assert_query_succeeds(
            r#"CREATE (c:ConfigMap {name: "settings", tier: "front", data.mode: "fast"})"#,
        )
        .await;
    let created = &result.binding("c").unwrap()[0];
    assert_eq!(created["metadata"]["namespace"], "default");
    assert!(created["metadata"]["uid"].is_string());

    let result = fixture
        .assert_query_succeeds(r#"MATCH (c:cm {tier: "front"}) RETURN c.metadata.name, c.data"#)
        .await;
    assert_eq!(
        result.binding("c").unwrap(),
        &[json!({"metadata": {"name": "settings"}, "data": {"mode": "fast"}})]
    );
}

#[tokio::test]
async fn test_create_uses_namespace_scope() {
    let fixture = TestFixture::empty();
    fixture.coordinator().set_namespace("staging");
    let result = fixture
        .assert_query_succeeds(r#"CREATE (s:Secret {name: "token"})"#)
        .await;
    assert_eq!(result.binding("s").unwrap()[0]["metadata"]["namespace"], "staging");

    fixture.coordinator().set_namespace("all");
    let result = fixture
        .assert_query_succeeds(r#"CREATE (s:Secret {name: "token"})"#)
        .await;
    assert_eq!(result.binding("s").unwrap()[0]["metadata"]["namespace"], "default");
}

#[tokio::test]
async fn test_create_cluster_scoped_has_no_namespace() {
    let fixture = TestFixture::empty();
    let result = fixture
        .assert_query_succeeds(r#"CREATE (n:Namespace {name: "team-a"})"#)
        .await;
    let created = &result.binding("n").unwrap()[0];
    assert_eq!(created["apiVersion"], "v1");
    assert!(created["metadata"].get("namespace").is_none());
}

#[tokio::test]
async fn test_create_duplicate_surfaces_api_error() {
    let fixture = TestFixture::with_sample_cluster();
    let err = fixture
        .assert_query_fails(r#"CREATE (d:Deployment {name: "web"})"#, "Already exists")
        .await;
    match err {
        ExecutionError::Api { binding, kind, source } => {
            assert_eq!(binding, "d");
            assert_eq!(kind, "Deployment");
            assert!(matches!(source, GatewayError::AlreadyExists(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_create_rejects_relationships() {
    let fixture = TestFixture::empty();
    fixture
        .assert_query_fails(
            "CREATE (d:Deployment)-[:OWN]->(rs:ReplicaSet)",
            "Invalid mutation",
        )
        .await;
    assert_eq!(
        fixture.count_calls(|c| matches!(c, GatewayCall::Create { .. })),
        0
    );
}

#[tokio::test]
async fn test_set_then_match() {
    let fixture = TestFixture::with_sample_cluster();
    let result = fixture
        .assert_query_succeeds(
            r#"SET (d:Deployment {name: "api"}) {spec.replicas: 4, spec.paused: true}"#,
        )
        .await;
    let updated = &result.binding("d").unwrap()[0];
    assert_eq!(updated["metadata"]["uid"], "d-api");

    let result = fixture
        .assert_query_succeeds(r#"MATCH (d:Deployment {name: "api"}) RETURN d.spec"#)
        .await;
    assert_eq!(
        result.binding("d").unwrap(),
        &[json!({"spec": {
            "replicas": 4,
            "paused": true,
            "selector": {"matchLabels": {"app": "api"}}
        }})]
    );
}

#[tokio::test]
async fn test_set_targets_one_binding() {
    let fixture = TestFixture::with_sample_cluster();
    fixture
        .assert_query_succeeds(
            r#"SET (d:Deployment {name: "web"})-[:OWN]->(rs:ReplicaSet) {rs.metadata.labels.touched: "yes"}"#,
        )
        .await;
    let updates: Vec<GatewayCall> = fixture
        .gateway()
        .calls()
        .into_iter()
        .filter(|c| matches!(c, GatewayCall::Update { .. }))
        .collect();
    assert_eq!(updates.len(), 1);
    assert!(matches!(
        &updates[0],
        GatewayCall::Update { name, .. } if name == "web-7d4"
    ));

    let names = fixture
        .names(r#"MATCH (rs:ReplicaSet {touched: "yes"})"#, "rs")
        .await;
    assert_eq!(names, vec!["web-7d4"]);
}

#[tokio::test]
async fn test_set_without_matches_updates_nothing() {
    let fixture = TestFixture::with_sample_cluster();
    let result = fixture
        .assert_query_succeeds(r#"SET (d:Deployment {name: "missing"}) {spec.replicas: 0}"#)
        .await;
    assert!(result.is_empty());
    assert_eq!(
        fixture.count_calls(|c| matches!(c, GatewayCall::Update { .. })),
        0
    );
}
