// src/handlers/sessions.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    identity::IdentityProvider,
    models::session::{AnswerRequest, SessionView, StartSessionRequest},
    session::{ExamSession, SessionHandle, SessionState, spawn_countdown},
    state::AppState,
    utils::jwt::Claims,
};

fn find_session(state: &AppState, id: &Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))
}

fn ensure_owner(session: &ExamSession, claims: &Claims) -> Result<(), AppError> {
    if session.student_id() != claims.principal().id {
        return Err(AppError::Forbidden(
            "This attempt belongs to another student".to_string(),
        ));
    }
    Ok(())
}

/// Starts an attempt and its countdown. Students only.
///
/// A session that fails to load is not registered.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut session = ExamSession::new(claims.principal().id);
    session
        .start(state.store.as_ref(), &payload.exam_id)
        .await?;

    let view = SessionView::from(&session);
    let handle = state.sessions.insert(session);
    spawn_countdown(
        handle,
        state.store.clone(),
        state.sessions.clone(),
        state.config.tick_interval,
    );

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = find_session(&state, &id)?;
    let session = handle.lock().await;
    ensure_owner(&session, &claims)?;

    Ok(Json(SessionView::from(&*session)))
}

/// Records or replaces one answer. Late answers to a finished attempt are
/// ignored and the current view is returned.
pub async fn record_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let handle = find_session(&state, &id)?;
    let mut session = handle.lock().await;
    ensure_owner(&session, &claims)?;

    session.record_answer(&payload.question_id, payload.answer)?;
    Ok(Json(SessionView::from(&*session)))
}

/// Submits the attempt. After a 503 the same call may be repeated; the
/// answers captured by the first attempt are the ones stored.
pub async fn submit_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = find_session(&state, &id)?;
    let mut session = handle.lock().await;
    ensure_owner(&session, &claims)?;

    session.submit(state.store.as_ref()).await?;
    if session.state() == SessionState::Submitted {
        state.sessions.remove(&id);
    }

    Ok(Json(SessionView::from(&*session)))
}

/// Drops the attempt without storing a result.
pub async fn abandon_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = find_session(&state, &id)?;
    let mut session = handle.lock().await;
    ensure_owner(&session, &claims)?;

    session.abandon();
    if session.state().is_terminal() {
        state.sessions.remove(&id);
    }

    Ok(Json(SessionView::from(&*session)))
}
