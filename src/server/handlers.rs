use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::envelope::ApiError;
use super::AppState;
use crate::config::DecodingOverride;
use crate::error::GenerationError;
use crate::pipeline::collector::{self, CatalogField, Selection};
use crate::pipeline::normalizer::PromptItem;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: String,
    pub status: &'static str,
}

pub async fn root(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        message: format!(
            "Training prompt generator is running (provider: {})",
            state.generator.provider_name()
        ),
        status: "ok",
    })
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub fields: Vec<CatalogField>,
}

pub async fn options() -> Json<OptionsResponse> {
    Json(OptionsResponse {
        fields: collector::catalog(),
    })
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub selection: Selection,
    #[serde(default)]
    pub decoding: Option<DecodingOverride>,
}

#[derive(Debug, Serialize)]
pub struct PromptsResponse {
    pub prompts: Vec<PromptItem>,
}

pub async fn generate_prompts(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<PromptsResponse> {
    let Json(request) = payload?;
    let prompts = state
        .generator
        .generate_prompts(&request.selection, request.decoding.as_ref())
        .await?;
    Ok(Json(PromptsResponse { prompts }))
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    #[serde(flatten)]
    pub selection: Selection,
    pub prompts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SummariesResponse {
    pub summaries: Vec<String>,
}

pub async fn summarize_prompts(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> ApiResult<SummariesResponse> {
    let Json(request) = payload?;
    let summaries = state
        .generator
        .summarize_prompts(&request.selection, &request.prompts)
        .await?;
    Ok(Json(SummariesResponse { summaries }))
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub content: Vec<String>,
}

pub async fn generate_content(
    State(state): State<AppState>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> ApiResult<ContentResponse> {
    let Json(request) = payload?;
    let content = state.generator.generate_content(&request.prompt).await?;
    Ok(Json(ContentResponse { content }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(alias = "prompt")]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatResponse> {
    let Json(request) = payload?;
    if request.message.trim().is_empty() {
        return Err(GenerationError::invalid_input("message must not be blank").into());
    }

    let (session_id, session) = state
        .sessions
        .checkout(request.session_id.as_deref())
        .await;
    let reply = {
        let mut guard = session.lock().await;
        state.generator.chat(&mut guard, &request.message).await?
    };
    state.sessions.commit(&session_id, session).await;
    Ok(Json(ChatResponse { reply, session_id }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.sessions.remove(&id).await;
    info!("Delete session {}: {}", id, deleted);
    Json(DeleteResponse { deleted })
}
