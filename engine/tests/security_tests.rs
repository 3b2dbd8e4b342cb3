use medassist_engine::assistant::AssistantOrchestrator;
use medassist_engine::config::Config;
use medassist_engine::secrets::CredentialSource;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const KEY: &str = "AIzaSyA0123456789abcdefghijklmnopqrstu";
const UTTERANCE: &str = "Check Patient Jane Roe status";

/// Collects everything the fmt layer writes
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `scenario` with every log line captured
fn with_captured_logs<F>(scenario: F) -> String
where
    F: std::future::Future<Output = ()>,
{
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    tracing::subscriber::with_default(subscriber, || runtime.block_on(scenario));
    logs.contents()
}

#[test]
fn test_backend_failure_logs_never_carry_utterance_or_key() {
    let logs = with_captured_logs(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_string(format!("internal error for key={}", KEY)),
            )
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.assistant.base_url = server.uri();
        let orchestrator =
            AssistantOrchestrator::with_credentials(&config, CredentialSource::fixed(Some(KEY)));

        let reply = orchestrator.submit_utterance(UTTERANCE).await.unwrap();
        assert!(reply.text().contains("Accessing local patient database"));
    });

    assert!(logs.contains("answering from fallback rules"));
    assert!(logs.contains("utterance_len"));
    assert!(!logs.contains("Jane Roe"), "utterance leaked into logs");
    assert!(!logs.contains(KEY), "API key leaked into logs");
}

#[test]
fn test_backend_echoing_request_does_not_leak_utterance() {
    let logs = with_captured_logs(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": 400,
                    "message": format!("Invalid value at contents[2]: {}", UTTERANCE),
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.assistant.base_url = server.uri();
        let orchestrator =
            AssistantOrchestrator::with_credentials(&config, CredentialSource::fixed(Some(KEY)));

        orchestrator.submit_utterance(UTTERANCE).await.unwrap();
    });

    assert!(logs.contains("INVALID_ARGUMENT"));
    assert!(!logs.contains("Jane Roe"), "echoed utterance leaked into logs");
}

#[test]
fn test_missing_configuration_warns_once_per_session() {
    let logs = with_captured_logs(async {
        let orchestrator = AssistantOrchestrator::with_credentials(
            &Config::default(),
            CredentialSource::fixed(None),
        );

        orchestrator.submit_utterance(UTTERANCE).await.unwrap();
        orchestrator.submit_utterance(UTTERANCE).await.unwrap();
        orchestrator.submit_utterance(UTTERANCE).await.unwrap();

        // a reset starts a new session lifetime
        orchestrator.reset();
        orchestrator.submit_utterance(UTTERANCE).await.unwrap();
    });

    let warnings = logs
        .lines()
        .filter(|line| line.contains("WARN") && line.contains("not configured"))
        .count();
    assert_eq!(warnings, 2);
    assert!(!logs.contains("Jane Roe"));
}
