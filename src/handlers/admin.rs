// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::auth::create_account,
    models::user::{AdminCreateUserRequest, PublicUser, User},
    store::{self, EXAMS, QUESTIONS, RESULTS, SharedStore, USERS},
    utils::jwt::Claims,
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(store): State<SharedStore>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = store::list_as(store.as_ref(), USERS, None).await?;
    let users: Vec<PublicUser> = users.into_iter().map(PublicUser::from).collect();
    Ok(Json(users))
}

/// Creates a new user with a specific role.
/// Admin only.
pub async fn create_user(
    State(store): State<SharedStore>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = create_account(
        store.as_ref(),
        &payload.username,
        &payload.password,
        payload.role,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.sub {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    store.delete(USERS, &id).await?;
    tracing::info!(user = %id, admin = %claims.sub, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Deletes a question from the bank. Exams referencing it keep the id.
/// Admin only.
pub async fn delete_question(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete(QUESTIONS, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Admin only.
pub async fn delete_exam(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete(EXAMS, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Admin only.
pub async fn delete_result(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete(RESULTS, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Document counts per collection.
/// Admin only.
pub async fn stats(State(store): State<SharedStore>) -> Result<impl IntoResponse, AppError> {
    let users = store.list(USERS, None).await?.len();
    let questions = store.list(QUESTIONS, None).await?.len();
    let exams = store.list(EXAMS, None).await?.len();
    let results = store.list(RESULTS, None).await?.len();

    Ok(Json(json!({
        "users": users,
        "questions": questions,
        "exams": exams,
        "results": results,
    })))
}

/// Dumps questions, exams and results as one JSON document.
/// Admin only.
pub async fn export(State(store): State<SharedStore>) -> Result<impl IntoResponse, AppError> {
    let questions = store.list(QUESTIONS, None).await?;
    let exams = store.list(EXAMS, None).await?;
    let results = store.list(RESULTS, None).await?;

    tracing::info!(
        questions = questions.len(),
        exams = exams.len(),
        results = results.len(),
        "Data exported"
    );

    Ok(Json(json!({
        "questions": questions,
        "exams": exams,
        "results": results,
        "exported_at": Utc::now(),
    })))
}
