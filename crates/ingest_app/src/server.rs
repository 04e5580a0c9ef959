use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::routing::{get, post};
use axum::Router;
use ingest_core::BatchRequest;
use ingest_engine::Ingestor;
use ingest_logging::{ingest_info, ingest_warn};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Clone)]
struct AppState {
    ingestor: Arc<Ingestor>,
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    #[serde(default)]
    urls: Vec<String>,
    chatbot_id: Option<String>,
}

pub(crate) fn router(ingestor: Arc<Ingestor>) -> Router {
    Router::new()
        .route("/test", get(health_handler))
        .route("/health", get(health_handler))
        .route("/download_document", post(download_handler))
        .with_state(AppState { ingestor })
}

pub(crate) async fn serve(ingestor: Arc<Ingestor>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    ingest_info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(ingestor))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    ingest_info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        ingest_warn!("Could not listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({"success": true, "message": "OK"}))
}

// Errors are reported in the body; the status is always 200.
async fn download_handler(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Json<Value> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => {
            return error_body("Request must be JSON");
        }
        Err(rejection) => {
            ingest_warn!("Rejected download request: {}", rejection);
            return error_body("Request params invalid");
        }
    };
    let Some(chatbot_id) = request.chatbot_id else {
        return error_body("Request params invalid");
    };
    if request.urls.is_empty() {
        return error_body("Request params invalid");
    }

    let batch = match BatchRequest::new(&chatbot_id, &request.urls) {
        Ok(batch) => batch,
        Err(err) => return error_body(&err.to_string()),
    };
    let result = match state.ingestor.run_batch(&batch).await {
        Ok(result) => result,
        Err(err) => return error_body(&err.to_string()),
    };
    match serde_json::to_value(&result.slots) {
        Ok(slots) => Json(json!({ "documents_downloaded": slots })),
        Err(err) => error_body(&err.to_string()),
    }
}

fn error_body(message: &str) -> Json<Value> {
    Json(json!({"error": true, "message": message}))
}
