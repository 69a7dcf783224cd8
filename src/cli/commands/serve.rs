//! HTTP API server.
//!
//! `POST /api/chat` streams the answer as `text/plain`. Failures before the
//! first byte become a JSON error response; failures after it abort the body
//! so the client sees an incomplete transfer rather than a short answer.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::{ErrorKind, SvarError};
use crate::orchestrator::Orchestrator;
use crate::pdf::PdfSource;
use crate::rag::{AnswerStream, ChatMessage, StreamEvent};
use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, trace, warn};

/// Shared application state.
pub struct AppState {
    orchestrator: Orchestrator,
    max_request: Duration,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let max_request = Duration::from_secs(orchestrator.settings().server.max_request_seconds);
        Self {
            orchestrator,
            max_request,
        }
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    preflight::check_or_report(&settings, Operation::Serve)?;

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings)?;
    let app = router(Arc::new(AppState::new(orchestrator)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Svar API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Chat", "POST /api/chat");
    Output::kv("Ingest", "POST /api/ingest");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/ingest", post(ingest))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct IngestRequest {
    url: String,
}

#[derive(Serialize)]
struct IngestResponse {
    chunks: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Map an error to the response a caller may see. Detail stays in the log.
fn failure_response(e: &SvarError) -> Response {
    match e {
        SvarError::EmptyInput(message) => error_response(StatusCode::BAD_REQUEST, message),
        SvarError::InvalidInput(message) => error_response(StatusCode::BAD_REQUEST, message),
        _ => {
            error!("Request failed ({:?}): {}", e.kind(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal.public_message())
        }
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected chat request body: {}", rejection);
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let deadline = Instant::now() + state.max_request;

    let prepared = match timeout_at(deadline, state.orchestrator.handle_messages(&request.messages)).await {
        Ok(Ok(prepared)) => prepared,
        Ok(Err(e)) => return failure_response(&e),
        Err(_) => {
            return failure_response(&SvarError::ModelUnavailable(
                "request deadline exceeded before the answer started".to_string(),
            ))
        }
    };

    info!(
        "Streaming answer (template '{}', {} passages)",
        prepared.language, prepared.passages
    );

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(answer_body(prepared.stream, deadline)),
    )
        .into_response()
}

/// Forward fragments in order until the end, an error, or the deadline.
///
/// Dropping the body (client disconnect) drops the answer stream and with it
/// the model request.
fn answer_body(
    answer: AnswerStream,
    deadline: Instant,
) -> impl Stream<Item = Result<Bytes, SvarError>> + Send + 'static {
    stream::unfold(Some(answer), move |state| async move {
        let mut answer = state?;

        match timeout_at(deadline, answer.next_event()).await {
            Ok(StreamEvent::Fragment(text)) => {
                trace!(fragment = %text, "forwarding fragment");
                Some((Ok(Bytes::from(text)), Some(answer)))
            }
            Ok(StreamEvent::End) => None,
            Ok(StreamEvent::Error(e)) => {
                error!("Answer stream interrupted: {}", e);
                Some((Err(e), None))
            }
            Err(_) => {
                error!("Answer stream exceeded the request deadline");
                Some((
                    Err(SvarError::StreamInterrupted("request deadline exceeded".to_string())),
                    None,
                ))
            }
        }
    })
}

async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected ingest request body: {}", rejection);
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let source = match PdfSource::from_url(&request.url) {
        Ok(source) => source,
        Err(e) => return failure_response(&e),
    };

    match state.orchestrator.ingest(&source).await {
        Ok(result) => Json(IngestResponse {
            chunks: result.stored,
        })
        .into_response(),
        Err(e) => failure_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::test_support::{hashing_embedder, RecordingIndex, ScriptedChatModel};
    use crate::chunking::TextChunk;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn state_with(model: ScriptedChatModel, with_context: bool) -> Arc<AppState> {
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(model),
            hashing_embedder(32),
            Arc::new(RecordingIndex::new()),
        );
        if with_context {
            let chunk = TextChunk {
                text: "Finland service charge is BDT 50,000.".to_string(),
                page: 1,
            };
            orchestrator.index_chunks(&[chunk], "guide.pdf").await.unwrap();
        }
        Arc::new(AppState::new(orchestrator))
    }

    fn chat_request(messages: Vec<ChatMessage>) -> Result<Json<ChatRequest>, JsonRejection> {
        Ok(Json(ChatRequest { messages }))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_answer_is_streamed_as_plain_text() {
        let state = state_with(
            ScriptedChatModel::new()
                .with_completion("Finland cost")
                .with_fragments(&["The service charge ", "is BDT 50,000."]),
            true,
        )
        .await;

        let response = chat(State(state), chat_request(vec![ChatMessage::user("Finland cost?")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "The service charge is BDT 50,000.");
    }

    #[tokio::test]
    async fn test_fallback_without_context() {
        let state = state_with(ScriptedChatModel::new().with_completion("q"), false).await;

        let response = chat(State(state), chat_request(vec![ChatMessage::user("Finland?")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, Prompts::default().fallback.message);
    }

    #[tokio::test]
    async fn test_empty_input_is_a_client_error() {
        let state = state_with(ScriptedChatModel::new(), false).await;

        let response = chat(State(state.clone()), chat_request(vec![])).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, r#"{"error":"No messages provided"}"#);

        let response = chat(State(state), chat_request(vec![ChatMessage::user("  ")])).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, r#"{"error":"Empty question"}"#);
    }

    #[tokio::test]
    async fn test_internal_errors_are_generic() {
        let state = state_with(ScriptedChatModel::new().with_failing_completion(), true).await;

        let response = chat(State(state), chat_request(vec![ChatMessage::user("Finland?")])).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_text(response).await;
        assert_eq!(body, r#"{"error":"An unexpected error occurred"}"#);
        assert!(!body.contains("scripted"));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_aborts_the_body() {
        let state = state_with(
            ScriptedChatModel::new()
                .with_completion("Finland")
                .with_fragments(&["partial ", "answer"])
                .with_stream_error_after(1),
            true,
        )
        .await;

        let response = chat(State(state), chat_request(vec![ChatMessage::user("Finland?")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(axum::body::to_bytes(response.into_body(), usize::MAX).await.is_err());
    }

    #[tokio::test]
    async fn test_deadline_interrupts_a_stalled_stream() {
        let stalled = AnswerStream::new(stream::pending::<crate::error::Result<String>>().boxed());
        let deadline = Instant::now() + Duration::from_millis(20);

        let items: Vec<_> = answer_body(stalled, deadline).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(SvarError::StreamInterrupted(_))));
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_dropping_the_body_drops_the_model_stream() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(dropped.clone());
        let fragments = stream::iter(vec![Ok("first ".to_string())])
            .chain(stream::pending::<crate::error::Result<String>>())
            .map(move |item| {
                let _held = &flag;
                item
            })
            .boxed();

        let deadline = Instant::now() + Duration::from_secs(30);
        let mut body = Box::pin(answer_body(AnswerStream::new(fragments), deadline));

        let first = body.next().await.unwrap().unwrap();
        assert_eq!(first, Bytes::from("first "));
        assert!(!dropped.load(Ordering::SeqCst));

        // Client went away mid-answer
        drop(body);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_ingest_rejects_non_http_urls() {
        let state = state_with(ScriptedChatModel::new(), false).await;

        let response = ingest(
            State(state),
            Ok(Json(IngestRequest {
                url: "ftp://example.com/guide.pdf".to_string(),
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_router_builds() {
        let state = state_with(ScriptedChatModel::new(), false).await;
        let _app = router(state);
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
