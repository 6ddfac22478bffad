use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use timescribe_ai::{MockAgentService, MockLlmClient, MockStep, TranscriptionClient};
use timescribe_core::testing::{InMemoryEntryStore, InMemoryMappingStore};
use timescribe_core::{AgentDefaults, Journal};
use timescribe_storage::Storage;
use timescribe_traits::{DateRange, EntryStore};

use super::*;

fn march_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

struct TestApp {
    state: AppState,
    storage: Arc<Storage>,
    agents: MockAgentService,
    llm: MockLlmClient,
    _tmp: TempDir,
}

impl TestApp {
    fn new() -> Self {
        Self::with_transcriber(None)
    }

    fn with_transcriber(transcriber: Option<TranscriptionClient>) -> Self {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("test.db");
        let storage = Arc::new(Storage::new(db_path.to_str().unwrap()).unwrap());
        let agents = MockAgentService::new();
        let llm = MockLlmClient::new("mock");

        let journal = Journal::new(
            Arc::new(storage.entries.clone()),
            Arc::new(storage.agents.clone()),
            Arc::new(agents.clone()),
            Arc::new(llm.clone()),
            AgentDefaults::default(),
        )
        .with_clock(Arc::new(march_first));

        let state = Arc::new(ServerState {
            journal,
            transcriber,
            default_user: "default".to_string(),
        });

        Self {
            state,
            storage,
            agents,
            llm,
            _tmp: tmp,
        }
    }

    fn router(&self) -> Router {
        router(self.state.clone())
    }
}

fn json_request(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "timescribe is working!");
}

#[tokio::test]
async fn test_chat_logs_entry() {
    let app = TestApp::new();
    app.llm.push_step(MockStep::text("ran 5k"));

    let response = app
        .router()
        .oneshot(json_request(
            "/chat",
            Some("sid"),
            json!({"message": "Went for a 5k run"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({"response": "logged entry for 2024-03-01", "timestamp": "2024-03-01"})
    );

    let stored = app
        .storage
        .entries
        .list_entries_in_range("sid", DateRange::day(march_first()))
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "Went for a 5k run");
    assert_eq!(stored[0].timestamp, march_first());

    app.state.journal.drain_relays().await;
    assert_eq!(
        app.agents.delivered_messages(),
        vec![("agent-1".to_string(), "ran 5k".to_string())]
    );
}

#[tokio::test]
async fn test_chat_without_header_uses_default_user() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(json_request("/chat", None, json!({"message": "slept early"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let texts = app
        .storage
        .entries
        .query_range("default", DateRange::day(march_first()))
        .await
        .unwrap();
    assert_eq!(texts, vec!["slept early".to_string()]);
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(json_request("/chat", Some("sid"), json!({"message": "  "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(response).await["error"].is_string());
    assert_eq!(app.llm.call_count(), 0);
}

#[tokio::test]
async fn test_chat_relay_failure_keeps_response() {
    let app = TestApp::new();
    app.agents.fail_message(true);

    let response = app
        .router()
        .oneshot(json_request("/chat", Some("sid"), json!({"message": "ran 5k"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await["response"],
        "logged entry for 2024-03-01"
    );
    app.state.journal.drain_relays().await;
    assert!(app.agents.delivered_messages().is_empty());
}

#[tokio::test]
async fn test_chat_store_outage_is_bad_gateway() {
    let entries = Arc::new(InMemoryEntryStore::new());
    entries.fail_appends(true);
    let llm = MockLlmClient::new("mock");
    let journal = Journal::new(
        entries,
        Arc::new(InMemoryMappingStore::new()),
        Arc::new(MockAgentService::new()),
        Arc::new(llm.clone()),
        AgentDefaults::default(),
    );
    let state = Arc::new(ServerState {
        journal,
        transcriber: None,
        default_user: "default".to_string(),
    });

    let response = router(state)
        .oneshot(json_request("/chat", Some("sid"), json!({"message": "ran 5k"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(read_json(response).await["error"].is_string());
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_summarize_without_memories_is_not_found() {
    let app = TestApp::new();
    app.agents.fail_context(true);

    let response = app
        .router()
        .oneshot(json_request(
            "/summarize",
            Some("sid"),
            json!({"date_start": "2024-03-01", "date_end": "2024-03-07"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        read_json(response).await,
        json!({"error": "No memories found"})
    );
    assert_eq!(app.llm.call_count(), 0);
}

#[tokio::test]
async fn test_summarize_logged_entries() {
    let app = TestApp::new();
    app.llm.push_step(MockStep::text("ran 5k"));
    app.llm.push_step(MockStep::text("You went for a run."));

    let logged = app
        .router()
        .oneshot(json_request(
            "/chat",
            Some("sid"),
            json!({"message": "Went for a 5k run"}),
        ))
        .await
        .unwrap();
    assert_eq!(logged.status(), StatusCode::OK);
    app.state.journal.drain_relays().await;

    let response = app
        .router()
        .oneshot(json_request(
            "/summarize",
            Some("sid"),
            json!({"date_start": "2024-03-01", "date_end": "2024-03-01"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({"summary": "You went for a run."})
    );
    let summary_request = &app.llm.requests()[1];
    assert_eq!(summary_request.temperature, Some(0.0));
    assert!(
        summary_request.messages[1]
            .content
            .contains("[stored-entry] Went for a 5k run")
    );
}

#[tokio::test]
async fn test_summarize_rejects_bad_dates() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(json_request(
            "/summarize",
            Some("sid"),
            json!({"date_start": "March 1st", "date_end": "2024-03-07"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        read_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("date_start")
    );
}

#[tokio::test]
async fn test_chat_stream_returns_plain_text() {
    let app = TestApp::new();
    app.llm.push_step(MockStep::text("Hello from the journal"));

    let response = app
        .router()
        .oneshot(json_request("/chat/stream", None, json!({"message": "hi"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"Hello from the journal");

    let request = &app.llm.requests()[0];
    assert_eq!(request.temperature, Some(1.0));
    assert_eq!(request.max_tokens, Some(1024));
    let texts = app
        .storage
        .entries
        .query_range("default", DateRange::day(march_first()))
        .await
        .unwrap();
    assert!(texts.is_empty());
}

fn multipart_request(field: &str) -> Request<Body> {
    multipart_request_with(field, "RIFF....WAVE")
}

fn multipart_request_with(field: &str, payload: &str) -> Request<Body> {
    let boundary = "timescribe-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"note.wav\"\r\n\
         Content-Type: audio/wav\r\n\r\n{p}\r\n--{b}--\r\n",
        b = boundary,
        f = field,
        p = payload
    );
    Request::builder()
        .method("POST")
        .uri("/transcribe")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_transcribe_without_key_is_unavailable() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(multipart_request("audio"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_transcribe_requires_audio_field() {
    let transcriber = TranscriptionClient::new("key").with_base_url("http://127.0.0.1:9");
    let app = TestApp::with_transcriber(Some(transcriber));

    let response = app
        .router()
        .oneshot(multipart_request("file"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await,
        json!({"error": "No audio file provided"})
    );
}

#[tokio::test]
async fn test_transcribe_rejects_empty_audio() {
    let transcriber = TranscriptionClient::new("key").with_base_url("http://127.0.0.1:9");
    let app = TestApp::with_transcriber(Some(transcriber));

    let response = app
        .router()
        .oneshot(multipart_request_with("audio", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await,
        json!({"error": "Audio file is empty"})
    );
}

#[tokio::test]
async fn test_chat_wrong_field_type_is_bad_request() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(json_request("/chat", Some("sid"), json!({"message": 5})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(response).await["error"].is_string());
    let stored = app
        .storage
        .entries
        .list_entries_in_range("sid", DateRange::day(march_first()))
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_chat_without_content_type_is_bad_request() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .body(Body::from(r#"{"message": "ran 5k"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_summarize_missing_field_is_bad_request() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(json_request(
            "/summarize",
            Some("sid"),
            json!({"date_start": "2024-03-01"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        read_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("date_end")
    );
    assert_eq!(app.llm.call_count(), 0);
}
