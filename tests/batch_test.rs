//! Batch submission integration tests using wiremock
//!
//! Verifies that a batch runs as independent submissions: one rejected
//! message produces one error outcome and never disturbs the others, and
//! outcomes come back in input order regardless of completion order.

mod common;

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fhir_courier::batch::{load_messages, send_batch, MessagePayload};
use fhir_courier::client::MessageClient;

use common::{client_config, smart_configuration_body};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Runs the full probe + authorize flow against `server` and returns the
/// authorized session.
async fn session_for(server: &MockServer) -> fhir_courier::client::AuthorizedSession {
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/.well-known/smart-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(smart_configuration_body(
            &base_url,
            &["system/$process-message"],
        )))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "FAKE"})),
        )
        .mount(server)
        .await;

    let mut client = MessageClient::new(client_config(&base_url)).unwrap();
    assert!(client.can_send_messages().await.unwrap());
    client.authorize().await.unwrap()
}

fn payload(file_name: &str, marker: &str) -> MessagePayload {
    MessagePayload {
        file_name: file_name.to_string(),
        body: format!(r#"{{"resourceType": "Bundle", "id": "{marker}"}}"#),
    }
}

// ---------------------------------------------------------------------------
// Outcome independence
// ---------------------------------------------------------------------------

/// Three messages, one of which the server rejects with a 500: the batch
/// reports two successes and one error outcome, in input order, without
/// any batch-level failure.
#[tokio::test]
async fn test_one_rejected_message_does_not_fail_the_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/$process-message"))
        .and(body_string_contains("msg-poison"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({"resourceType": "OperationOutcome"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/$process-message"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"resourceType": "Bundle"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let session = session_for(&server).await;
    let messages = vec![
        payload("a.json", "msg-a"),
        payload("b.json", "msg-poison"),
        payload("c.json", "msg-c"),
    ];

    let outcomes = send_batch(&session, &messages).await;

    assert_eq!(outcomes.len(), 3);
    let names: Vec<&str> = outcomes.iter().map(|o| o.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.json", "b.json", "c.json"]);

    assert!(outcomes[0].is_success());
    assert!(!outcomes[1].is_success());
    assert!(outcomes[2].is_success());

    let reason = outcomes[1].result.as_ref().unwrap_err();
    assert!(reason.contains("500"), "reason should carry the status: {reason}");
}

/// Every submission carries the session's bearer token.
#[tokio::test]
async fn test_every_submission_carries_the_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/$process-message"))
        .and(header("authorization", "Bearer FAKE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let session = session_for(&server).await;
    let messages = vec![
        payload("a.json", "msg-a"),
        payload("b.json", "msg-b"),
        payload("c.json", "msg-c"),
    ];

    let outcomes = send_batch(&session, &messages).await;
    assert!(outcomes.iter().all(|o| o.is_success()));
}

/// A server accepting with 202 counts as success; the receipt keeps the
/// exact status and body.
#[tokio::test]
async fn test_receipt_preserves_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/$process-message"))
        .respond_with(ResponseTemplate::new(202).set_body_string(r#"{"queued": true}"#))
        .mount(&server)
        .await;

    let session = session_for(&server).await;
    let outcomes = send_batch(&session, &[payload("a.json", "msg-a")]).await;

    let receipt = outcomes[0].result.as_ref().unwrap();
    assert_eq!(receipt.status, 202);
    assert_eq!(receipt.body, r#"{"queued": true}"#);
}

// ---------------------------------------------------------------------------
// Folder loading glued to submission
// ---------------------------------------------------------------------------

/// Messages loaded from a folder (skipping `config.json`) are submitted
/// exactly as read from disk.
#[tokio::test]
async fn test_folder_contents_are_submitted_verbatim() {
    let server = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.json"), "{}").unwrap();
    std::fs::write(
        dir.path().join("admission.json"),
        r#"{"resourceType": "Bundle", "id": "admission-1"}"#,
    )
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/$process-message"))
        .and(body_string_contains("admission-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server).await;
    let messages = load_messages(dir.path()).unwrap();
    assert_eq!(messages.len(), 1);

    let outcomes = send_batch(&session, &messages).await;
    assert!(outcomes[0].is_success());
}
