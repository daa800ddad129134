// src/handlers/ai.rs

use axum::{
    Json,
    extract::{Extension, State},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    ai::{self, AiError, SharedGenerator},
    error::AppError,
    models::ai::{AnalyzeContentRequest, DraftQuestionRequest},
    state::AppState,
    store::{self, QUESTIONS},
    utils::jwt::Claims,
};

/// Course tag for saved drafts that did not name one.
const DEFAULT_DRAFT_COURSE: &str = "General";

fn generator(state: &AppState) -> Result<SharedGenerator, AppError> {
    state.generator.clone().ok_or(AppError::from(AiError::NotConfigured))
}

/// Drafts a subjective question. With `save`, the draft is also stored in
/// the question bank. Lecturer or admin.
pub async fn draft_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<DraftQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let generator = generator(&state)?;

    let draft = ai::draft_question(generator.as_ref(), &payload).await?;

    let question_id = if payload.save {
        let course = payload.course.as_deref().unwrap_or(DEFAULT_DRAFT_COURSE);
        let question = draft
            .clone()
            .into_question(course, payload.difficulty, &claims.sub);
        question.check_invariants().map_err(AppError::Upstream)?;

        let id = store::create_from(state.store.as_ref(), QUESTIONS, &question).await?;
        tracing::info!(question = %id, "Generated question saved");
        Some(id)
    } else {
        None
    };

    Ok(Json(json!({
        "draft": draft,
        "question_id": question_id,
    })))
}

/// Summarizes study material. Lecturer or admin.
pub async fn analyze_content(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let generator = generator(&state)?;

    let analysis = ai::analyze_content(generator.as_ref(), &payload.content).await?;
    Ok(Json(analysis))
}
