//! Integration tests for the assistant orchestrator
//!
//! Drives the full stack (orchestrator, remote client, Gemini backend) against a
//! mock Gemini server.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use medassist_engine::assistant::{AssistantOrchestrator, AssistantState, CLINICAL_DISCLAIMER};
use medassist_engine::config::Config;
use medassist_engine::secrets::CredentialSource;
use sdk::MessageRole;

const KEY: &str = "AIzaSyA-integration-0123456789";
const GENERATE_PATH: &str = "/models/gemini-1.5-flash:generateContent";

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.assistant.base_url = server.uri();
    config
}

fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{"text": text}]
            },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_remote_reply_with_history() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            "The last chest X-ray shows clear lung fields.",
        )))
        .mount(&server)
        .await;

    let orchestrator = AssistantOrchestrator::with_credentials(
        &config_for(&server),
        CredentialSource::fixed(Some(KEY)),
    );

    let first = orchestrator
        .submit_utterance("Summarize last Chest X-Ray")
        .await
        .unwrap();
    assert!(first
        .text()
        .starts_with("The last chest X-ray shows clear lung fields."));
    assert!(first.text().ends_with(CLINICAL_DISCLAIMER));

    orchestrator
        .submit_utterance("Any pleural effusion?")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    // opening pair + new utterance
    let body: Value = requests[0].body_json().unwrap();
    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[2]["parts"][0]["text"], "Summarize last Chest X-Ray");
    assert!(body["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("AI Clinical Assistant"));

    // the first exchange is now part of the hidden history
    let body: Value = requests[1].body_json().unwrap();
    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 5);
    assert_eq!(contents[2]["parts"][0]["text"], "Summarize last Chest X-Ray");
    assert_eq!(contents[3]["role"], "model");
    assert_eq!(contents[4]["parts"][0]["text"], "Any pleural effusion?");

    assert_eq!(orchestrator.conversation().len(), 5);
    assert_eq!(orchestrator.state(), AssistantState::Idle);
}

#[tokio::test]
async fn test_server_error_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let orchestrator = AssistantOrchestrator::with_credentials(
        &config_for(&server),
        CredentialSource::fixed(Some(KEY)),
    );

    let reply = orchestrator
        .submit_utterance("Summarize last Chest X-Ray")
        .await
        .unwrap();

    assert!(reply.text().starts_with("Based on clinical protocols"));
    assert!(reply.text().ends_with(CLINICAL_DISCLAIMER));
    assert!(!orchestrator.is_typing());
}

#[tokio::test]
async fn test_rate_limit_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let orchestrator = AssistantOrchestrator::with_credentials(
        &config_for(&server),
        CredentialSource::fixed(Some(KEY)),
    );

    let reply = orchestrator
        .submit_utterance("Symptom check protocols")
        .await
        .unwrap();
    assert!(reply.text().contains("Current Clinical Protocol for Symptom Checking"));
}

#[tokio::test]
async fn test_slow_backend_times_out_to_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(gemini_reply("too late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.assistant.request_timeout_secs = 1;
    let orchestrator =
        AssistantOrchestrator::with_credentials(&config, CredentialSource::fixed(Some(KEY)));

    let reply = orchestrator.submit_utterance("hello").await.unwrap();
    assert!(reply.text().contains("Clinical Fallback mode"));
}

#[tokio::test]
async fn test_missing_credential_never_calls_backend() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("unexpected")))
        .mount(&server)
        .await;

    let orchestrator = AssistantOrchestrator::with_credentials(
        &config_for(&server),
        CredentialSource::fixed(Some("your_gemini_api_key_here")),
    );

    orchestrator
        .submit_utterance("Check Patient P-8429 status")
        .await
        .unwrap();
    orchestrator
        .submit_utterance("Set medication reminder")
        .await
        .unwrap();

    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(orchestrator.conversation().len(), 5);
}

#[tokio::test]
async fn test_patient_status_scenario_with_backend_down() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let orchestrator = AssistantOrchestrator::with_credentials(
        &config_for(&server),
        CredentialSource::fixed(Some(KEY)),
    );

    let log = orchestrator.conversation();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].role(), MessageRole::Assistant);
    assert!(log[0].text().starts_with("Hello, Dr. Doe."));

    orchestrator
        .submit_utterance("Check Patient P-8429 status")
        .await
        .unwrap();

    let log = orchestrator.conversation();
    assert_eq!(log.len(), 3);
    assert_eq!(log[1].role(), MessageRole::User);
    assert_eq!(log[1].text(), "Check Patient P-8429 status");
    assert_eq!(log[2].role(), MessageRole::Assistant);
    assert!(log[2].text().contains("Accessing local patient database"));
    assert!(log[2].text().ends_with(CLINICAL_DISCLAIMER));
}

#[tokio::test]
async fn test_clear_then_continue_same_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Noted.")))
        .mount(&server)
        .await;

    let orchestrator = AssistantOrchestrator::with_credentials(
        &config_for(&server),
        CredentialSource::fixed(Some(KEY)),
    );

    orchestrator.submit_utterance("first").await.unwrap();
    orchestrator.clear().unwrap();
    assert_eq!(orchestrator.conversation().len(), 1);
    assert!(orchestrator.conversation()[0]
        .text()
        .starts_with("Chat cleared."));

    orchestrator.submit_utterance("second").await.unwrap();

    // the backend still remembers the first exchange
    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[1].body_json().unwrap();
    assert_eq!(body["contents"].as_array().unwrap().len(), 5);

    // after a reset it does not
    orchestrator.reset();
    orchestrator.submit_utterance("third").await.unwrap();
    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[2].body_json().unwrap();
    assert_eq!(body["contents"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_concurrent_submissions_yield_one_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(gemini_reply("Single answer."))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let orchestrator = AssistantOrchestrator::with_credentials(
        &config_for(&server),
        CredentialSource::fixed(Some(KEY)),
    );

    let (first, second) = tokio::join!(
        orchestrator.submit_utterance("first"),
        orchestrator.submit_utterance("second"),
    );

    // exactly one of them ran
    assert!(first.is_ok() != second.is_ok());
    assert_eq!(orchestrator.conversation().len(), 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_submission_dropped_by_caller_timeout_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(gemini_reply("late answer"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let orchestrator = AssistantOrchestrator::with_credentials(
        &config_for(&server),
        CredentialSource::fixed(Some(KEY)),
    );

    let dropped = tokio::time::timeout(
        Duration::from_millis(100),
        orchestrator.submit_utterance("first"),
    )
    .await;
    assert!(dropped.is_err());

    assert_eq!(orchestrator.state(), AssistantState::Idle);
    assert!(!orchestrator.is_typing());
    assert_eq!(orchestrator.conversation().len(), 3);

    let reply = orchestrator.submit_utterance("second").await.unwrap();
    assert!(reply.text().starts_with("late answer"));
    assert_eq!(orchestrator.conversation().len(), 5);

    // the abandoned request never made it into the session history
    let requests = server.received_requests().await.unwrap();
    let body: Value = requests.last().unwrap().body_json().unwrap();
    assert_eq!(body["contents"].as_array().unwrap().len(), 3);
}
