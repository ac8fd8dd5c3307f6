//! End-to-end operation lifecycle against a mock HTTP operations API

#![cfg(feature = "http")]

use lro_client::{
    persist_state, prune_terminal, recover_operations, AnyPayload, HttpOperationsClient,
    HttpTransport, InMemoryJournal, LongRunningOperation, LroError, Message, OperationFailure,
    OperationStats, OperationStatus, Phase, PollConfig, RpcStatus, TracingObserver, TypeRegistry,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct ExportRequest {
    table: String,
}

impl Message for ExportRequest {
    const TYPE_NAME: &'static str = "export.v1.ExportRequest";
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ExportResponse {
    row_count: u64,
    uri: String,
}

impl Message for ExportResponse {
    const TYPE_NAME: &'static str = "export.v1.ExportResponse";
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lro_client=debug")
        .with_test_writer()
        .try_init();
}

fn fast_config() -> PollConfig {
    PollConfig::from_json_str(
        r#"{"retry": {"initial_delay_millis": 5, "max_delay_millis": 20}, "await_timeout_millis": 5000}"#,
    )
    .unwrap()
}

fn client(server: &MockServer) -> HttpOperationsClient<ExportRequest> {
    HttpOperationsClient::new(
        HttpTransport::new(reqwest::Client::new()),
        format!("{}/v1/exports", server.uri()),
        format!("{}/v1", server.uri()),
    )
}

fn registry() -> Arc<TypeRegistry> {
    Arc::new(TypeRegistry::new().with::<ExportResponse>())
}

async fn mount_trigger(server: &MockServer, status: &OperationStatus) {
    Mock::given(method("POST"))
        .and(path("/v1/exports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn operation_completes_after_polling() {
    init_tracing();
    let server = MockServer::start().await;
    mount_trigger(&server, &OperationStatus::pending("operations/export-1")).await;

    Mock::given(method("GET"))
        .and(path("/v1/operations/export-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(OperationStatus::pending("operations/export-1")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    let response = AnyPayload::pack(&ExportResponse {
        row_count: 42,
        uri: "gs://bucket/export.csv".into(),
    })
    .unwrap();
    Mock::given(method("GET"))
        .and(path("/v1/operations/export-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(OperationStatus::succeeded("operations/export-1", response)),
        )
        .mount(&server)
        .await;

    let stats = Arc::new(OperationStats::new());
    let mut op = LongRunningOperation::<_, _, ExportResponse>::new(
        client(&server),
        registry(),
        ExportRequest {
            table: "orders".into(),
        },
    )
    .with_observer(Arc::new(TracingObserver))
    .with_stats(stats.clone());

    let resp = op.await_with_config(&fast_config()).await.unwrap();
    assert_eq!(resp.row_count, 42);
    assert_eq!(resp.uri, "gs://bucket/export.csv");
    assert_eq!(op.name(), "operations/export-1");
    assert_eq!(op.phase(), Phase::Succeeded);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.triggers, 1);
    assert_eq!(snapshot.polls, 3);
    assert_eq!(snapshot.succeeded, 1);
}

#[tokio::test]
async fn remote_error_is_surfaced_verbatim() {
    init_tracing();
    let server = MockServer::start().await;
    mount_trigger(
        &server,
        &OperationStatus::failed("operations/export-2", RpcStatus::new(3, "bad input")),
    )
    .await;

    let mut op = LongRunningOperation::<_, _, ExportResponse>::new(
        client(&server),
        registry(),
        ExportRequest::default(),
    );
    let err = op.await_with_config(&fast_config()).await.unwrap_err();
    assert_eq!(err.to_string(), "code: 3, message: bad input");
    assert_eq!(op.phase(), Phase::Failed);
}

#[tokio::test]
async fn http_failure_during_poll_is_terminal() {
    init_tracing();
    let server = MockServer::start().await;
    mount_trigger(&server, &OperationStatus::pending("operations/export-3")).await;
    Mock::given(method("GET"))
        .and(path("/v1/operations/export-3"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let mut op = LongRunningOperation::<_, _, ExportResponse>::new(
        client(&server),
        registry(),
        ExportRequest::default(),
    );
    let err = op.await_with_config(&fast_config()).await.unwrap_err();
    match err {
        LroError::Failed(OperationFailure::Transport { message }) => {
            assert!(message.contains("status 500"));
            assert!(message.contains("backend exploded"));
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn journaled_operation_resumes_after_restart() {
    init_tracing();
    let server = MockServer::start().await;
    mount_trigger(&server, &OperationStatus::pending("operations/export-4")).await;
    Mock::given(method("GET"))
        .and(path("/v1/operations/export-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(OperationStatus::pending("operations/export-4")))
        .mount(&server)
        .await;

    let journal = Arc::new(InMemoryJournal::new());
    let mut op = LongRunningOperation::<_, _, ExportResponse>::new(
        client(&server),
        registry(),
        ExportRequest {
            table: "users".into(),
        },
    )
    .with_journal(journal.clone());

    let err = op
        .await_completion(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    persist_state(journal.as_ref(), op.state()).unwrap();
    drop(op);

    // The remote side finishes while nobody is watching
    server.reset().await;
    let response = AnyPayload::pack(&ExportResponse {
        row_count: 7,
        uri: "gs://bucket/users.csv".into(),
    })
    .unwrap();
    Mock::given(method("GET"))
        .and(path("/v1/operations/export-4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(OperationStatus::succeeded("operations/export-4", response)),
        )
        .mount(&server)
        .await;

    let mut recovered =
        recover_operations::<ExportRequest, ExportResponse>(journal.as_ref()).unwrap();
    assert_eq!(recovered.len(), 1);
    let state = recovered.remove(0);
    assert_eq!(state.request().table, "users");

    let mut op = LongRunningOperation::resume(client(&server), registry(), state)
        .with_journal(journal.clone());
    let resp = op.await_with_config(&fast_config()).await.unwrap();
    assert_eq!(resp.row_count, 7);

    let recovered = recover_operations::<ExportRequest, ExportResponse>(journal.as_ref()).unwrap();
    assert!(recovered.is_empty());

    let pruned = prune_terminal::<ExportRequest, ExportResponse>(journal.as_ref()).unwrap();
    assert_eq!(pruned, 1);
}
