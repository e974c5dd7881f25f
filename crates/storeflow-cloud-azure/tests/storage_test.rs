use serde_json::json;
use storeflow_cloud::{
    CreateOutcome, DesiredResource, ErrorKind, PendingOperation, PollStatus, ProviderContext,
    ProviderKind, Reconciler, ResourceOperations, StateSnapshot, WaitConfig,
};
use std::time::Duration;
use storeflow_cloud_azure::{
    AzureConfig, AzureError, AzureStorageOperations, DEFAULT_REQUEST_TIMEOUT,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT: &str = "tenant-1";
const SUBSCRIPTION: &str = "sub-1";
const GROUP: &str = "rg-storage";

fn config(server: &MockServer) -> AzureConfig {
    let mut config = AzureConfig::new(TENANT, "client-1", "secret-1", SUBSCRIPTION);
    config.management_endpoint = server.uri();
    config.authority_host = server.uri();
    config
}

fn account_path(name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}",
        SUBSCRIPTION, GROUP, name
    )
}

fn accounts_path() -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts",
        SUBSCRIPTION, GROUP
    )
}

fn account_json(name: &str, state: &str, tags: serde_json::Value) -> serde_json::Value {
    json!({
        "id": account_path(name),
        "name": name,
        "location": "eastus",
        "tags": tags,
        "properties": {
            "provisioningState": state,
            "creationTime": "2024-03-01T10:00:00.0000000Z"
        }
    })
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/{}/oauth2/v2.0/token", TENANT)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "test-token"
        })))
        .mount(server)
        .await;
}

async fn connected(server: &MockServer) -> AzureStorageOperations {
    mount_token(server).await;
    AzureStorageOperations::connect(&config(server))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_connect_fails_closed_on_rejected_secret() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/{}/oauth2/v2.0/token", TENANT)))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&server)
        .await;

    let result = AzureStorageOperations::connect(&config(&server)).await;

    match result {
        Err(AzureError::TokenRequest { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("AADSTS7000215"));
        }
        other => panic!("expected token failure, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_token_is_cached_between_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/{}/oauth2/v2.0/token", TENANT)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": 3599,
            "access_token": "test-token"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!(
            "/subscriptions/{}/resourcegroups/{}",
            SUBSCRIPTION, GROUP
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": GROUP})))
        .expect(2)
        .mount(&server)
        .await;

    let ops = AzureStorageOperations::connect(&config(&server))
        .await
        .unwrap();
    ops.create_parent(GROUP, "eastus").await.unwrap();
    ops.create_parent(GROUP, "eastus").await.unwrap();
}

#[tokio::test]
async fn test_create_parent_puts_resource_group() {
    let server = MockServer::start().await;
    let ops = connected(&server).await;
    Mock::given(method("PUT"))
        .and(path(format!(
            "/subscriptions/{}/resourcegroups/{}",
            SUBSCRIPTION, GROUP
        )))
        .and(query_param("api-version", "2021-04-01"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({"location": "westeurope"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": GROUP})))
        .expect(1)
        .mount(&server)
        .await;

    ops.create_parent(GROUP, "westeurope").await.unwrap();
}

#[tokio::test]
async fn test_create_parent_failure_is_denied() {
    let server = MockServer::start().await;
    let ops = connected(&server).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": "AuthorizationFailed",
                "message": "The client does not have authorization to perform action"
            }
        })))
        .mount(&server)
        .await;

    let err = ops.create_parent(GROUP, "eastus").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Denied);
    assert!(err.message.starts_with("AuthorizationFailed:"));
}

#[tokio::test]
async fn test_begin_create_accepted_is_pending() {
    let server = MockServer::start().await;
    let ops = connected(&server).await;
    let monitor = format!("{}/operations/op-1", server.uri());
    Mock::given(method("PUT"))
        .and(path(account_path("acct01")))
        .and(query_param("api-version", "2023-01-01"))
        .and(body_partial_json(json!({
            "kind": "StorageV2",
            "sku": {"name": "Standard_LRS"},
            "properties": {"accessTier": "Cool"}
        })))
        .respond_with(
            ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", monitor.as_str()),
        )
        .mount(&server)
        .await;

    let outcome = ops.begin_create("acct01", Some(GROUP)).await.unwrap();

    match outcome {
        CreateOutcome::Pending(operation) => {
            assert_eq!(operation.name, "acct01");
            assert_eq!(operation.monitor, monitor);
            assert!(operation.target.unwrap().contains("/storageAccounts/acct01"));
        }
        other => panic!("expected pending create, got {:?}", other),
    }
}

#[tokio::test]
async fn test_begin_create_synchronous_success() {
    let server = MockServer::start().await;
    let ops = connected(&server).await;
    Mock::given(method("PUT"))
        .and(path(account_path("acct01")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(account_json("acct01", "Succeeded", json!({}))),
        )
        .mount(&server)
        .await;

    let outcome = ops.begin_create("acct01", Some(GROUP)).await.unwrap();

    match outcome {
        CreateOutcome::Completed(resource) => {
            assert_eq!(resource.name, "acct01");
            assert_eq!(resource.id, account_path("acct01"));
            assert_eq!(resource.parent_group.as_deref(), Some(GROUP));
        }
        other => panic!("expected completed create, got {:?}", other),
    }
}

#[tokio::test]
async fn test_begin_create_name_taken_is_conflict() {
    let server = MockServer::start().await;
    let ops = connected(&server).await;
    Mock::given(method("PUT"))
        .and(path(account_path("taken01")))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {
                "code": "StorageAccountAlreadyTaken",
                "message": "The storage account named taken01 is already taken."
            }
        })))
        .mount(&server)
        .await;

    let err = ops.begin_create("taken01", Some(GROUP)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(
        err.message,
        "StorageAccountAlreadyTaken: The storage account named taken01 is already taken."
    );
}

#[tokio::test]
async fn test_poll_reports_operation_failure() {
    let server = MockServer::start().await;
    let ops = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/operations/op-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": {"code": "InternalError", "message": "Provisioning failed"}
        })))
        .mount(&server)
        .await;

    let operation = PendingOperation::new("acct09", format!("{}/operations/op-9", server.uri()));
    let status = ops.poll_create(&operation).await.unwrap();

    match status {
        PollStatus::Failed(err) => assert_eq!(err.message, "InternalError: Provisioning failed"),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_waits_for_async_operation_then_tags() {
    let server = MockServer::start().await;
    let ops = connected(&server).await;
    let monitor = format!("{}/operations/op-1", server.uri());

    Mock::given(method("PUT"))
        .and(path(format!(
            "/subscriptions/{}/resourcegroups/{}",
            SUBSCRIPTION, GROUP
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": GROUP})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(account_path("acct01")))
        .respond_with(
            ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", monitor.as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(account_path("acct01")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(account_json("acct01", "Succeeded", json!({}))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(account_path("acct01")))
        .and(body_partial_json(json!({"tags": {"storeflow": "team-a"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_json(
            "acct01",
            "Succeeded",
            json!({"storeflow": "team-a"}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = ProviderContext::new(ProviderKind::Azure, SUBSCRIPTION, "eastus")
        .with_parent_group(GROUP);
    let wait = WaitConfig {
        initial_delay_ms: 10,
        max_delay_ms: 20,
        multiplier: 2.0,
        timeout_secs: 30,
    };
    let reconciler = Reconciler::new(&ops, &ctx).with_wait(wait);

    let result = reconciler
        .create(&[DesiredResource::new("acct01", "team-a")])
        .await
        .unwrap();

    assert!(result.is_success(), "{:?}", result.errors);
    let item = result.snapshot.get("acct01").unwrap();
    assert_eq!(item.id, account_path("acct01"));
    assert_eq!(item.tags, "team-a");
    assert_eq!(item.parent_group.as_deref(), Some(GROUP));
}

#[tokio::test]
async fn test_read_follows_next_link() {
    let server = MockServer::start().await;
    let ops = connected(&server).await;
    let next = format!("{}/page-2?$skiptoken=abc", server.uri());

    Mock::given(method("GET"))
        .and(path(accounts_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                account_json("acct01", "Succeeded", json!({"storeflow": "a"})),
                account_json("acct02", "Succeeded", json!(null))
            ],
            "nextLink": next
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page-2"))
        .and(query_param("$skiptoken", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                account_json("acct03", "Succeeded", json!({"storeflow": "c", "owner": "ops"})),
                account_json("acct04", "Succeeded", json!({"owner": "ops"}))
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = ProviderContext::new(ProviderKind::Azure, SUBSCRIPTION, "eastus")
        .with_parent_group(GROUP);
    let reconciler = Reconciler::new(&ops, &ctx);

    let snapshot = reconciler
        .read(&StateSnapshot::empty(ctx.clone()))
        .await
        .unwrap();

    let names: Vec<&str> = snapshot.names().collect();
    // acct02 and acct04 belong to someone else in the same group
    assert_eq!(names, vec!["acct01", "acct03"]);
    assert_eq!(snapshot.get("acct01").unwrap().tags, "a");
    assert_eq!(snapshot.get("acct03").unwrap().tags, "c");
}

#[tokio::test]
async fn test_stalled_request_times_out() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("DELETE"))
        .and(path(account_path("slow01")))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;
    let mut config = config(&server);
    config.request_timeout = Duration::from_millis(200);
    let ops = AzureStorageOperations::connect(&config).await.unwrap();

    let started = std::time::Instant::now();
    let err = ops.delete_one("slow01", Some(GROUP)).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_default_request_timeout() {
    let config = AzureConfig::new(TENANT, "client-1", "secret-1", SUBSCRIPTION);
    assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_delete_outcomes() {
    let server = MockServer::start().await;
    let ops = connected(&server).await;
    Mock::given(method("DELETE"))
        .and(path(account_path("gone01")))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(account_path("acct01")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(account_path("busy01")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    ops.delete_one("gone01", Some(GROUP)).await.unwrap();
    ops.delete_one("acct01", Some(GROUP)).await.unwrap();
    let err = ops.delete_one("busy01", Some(GROUP)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transient);
    assert_eq!(err.message, "HTTP 503");
}

#[tokio::test]
async fn test_operations_require_group() {
    let server = MockServer::start().await;
    let ops = connected(&server).await;

    let err = ops.delete_one("acct01", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unknown);
}
