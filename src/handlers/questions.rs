// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::question::{Question, QuestionListParams, QuestionRequest},
    store::{self, Filter, QUESTIONS, SharedStore},
    utils::jwt::Claims,
};

/// Lists the question bank, optionally narrowed by course and topic.
/// Lecturer or admin.
pub async fn list_questions(
    State(store): State<SharedStore>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.course.as_deref().map(|c| Filter::eq("course", c));
    let mut questions: Vec<Question> =
        store::list_as(store.as_ref(), QUESTIONS, filter.as_ref()).await?;

    if let Some(topic) = params.topic.as_deref() {
        questions.retain(|q| q.topic == topic);
    }

    Ok(Json(questions))
}

/// Adds a question to the bank.
/// Lecturer or admin.
pub async fn create_question(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut question = payload.into_question(&claims.sub)?;
    question.id = store::create_from(store.as_ref(), QUESTIONS, &question).await?;

    tracing::info!(question = %question.id, kind = question.kind.label(), "Question created");
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn get_question(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let question: Question = store::get_as(store.as_ref(), QUESTIONS, &id).await?;
    Ok(Json(question))
}

/// Replaces a question. The original author is kept.
/// Exams already generated keep their `total_marks`.
pub async fn update_question(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing: Question = store::get_as(store.as_ref(), QUESTIONS, &id).await?;

    let mut question = payload.into_question(&existing.created_by)?;
    question.id = id;
    store::update_from(store.as_ref(), QUESTIONS, &question.id, &question).await?;

    Ok(Json(question))
}

/// Removes a question from the bank. Running attempts keep their snapshot.
pub async fn delete_question(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete(QUESTIONS, &id).await?;

    tracing::info!(question = %id, by = %claims.sub, "Question deleted");
    Ok(StatusCode::NO_CONTENT)
}
