use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::generation_dto::{CreateTextQuery, GenerateQuestionsPayload},
    error::Result,
    services::llm_service::ReasoningEffort,
    AppState,
};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[utoipa::path(
    get,
    path = "/create",
    params(
        ("prompt" = String, Query, description = "User input"),
        ("system" = Option<String>, Query, description = "System instructions"),
        ("effort" = Option<String>, Query, description = "Reasoning effort: low, medium or high"),
        ("model" = Option<String>, Query, description = "Model override")
    ),
    responses(
        (status = 200, description = "Generated text", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid query"),
        (status = 401, description = "Missing or invalid token"),
        (status = 502, description = "LLM provider failure")
    )
)]
#[axum::debug_handler]
pub async fn create_text(
    State(state): State<AppState>,
    Query(query): Query<CreateTextQuery>,
) -> Result<impl IntoResponse> {
    query.validate()?;
    let effort = match query.effort.as_deref() {
        Some(raw) => raw.parse::<ReasoningEffort>()?,
        None => ReasoningEffort::default(),
    };
    let model = query
        .model
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(state.defaults.llm_model.as_str());
    let system = query.system.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let text = state
        .completer
        .complete(system, &query.prompt, model, effort)
        .await?;
    Ok(Json(json!({ "text": text })))
}

#[utoipa::path(
    post,
    path = "/generate_questions",
    request_body = GenerateQuestionsPayload,
    responses(
        (status = 200, description = "Generated questions in order", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing or invalid token"),
        (status = 502, description = "Error generating questions and feedback")
    )
)]
#[axum::debug_handler]
pub async fn generate_questions(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuestionsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let persist = payload.persist;
    let request = payload.into_request(&state.defaults);
    tracing::info!(
        topic = request.topic,
        academy = request.academy,
        num_of_q = request.num_of_q,
        batch_size = request.batch_size,
        model = %request.llm_model,
        "Generating questions"
    );

    let questions = state
        .question_service
        .generate_questions_and_feedback(&request)
        .await?;

    let questions = if persist {
        state.question_service.persist(&questions).await?
    } else {
        questions
    };
    Ok(Json(questions))
}
