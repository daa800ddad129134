// src/handlers/exams.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::{CreateExamRequest, Exam, ExamDetail, ExamSummary, MarkingGuide, total_marks},
        question::{PublicQuestion, Question},
    },
    store::{self, DocumentStore, EXAMS, Filter, MARKING_GUIDES, QUESTIONS, SharedStore, StoreError},
    utils::jwt::Claims,
};

/// Fetches questions by id, keeping the given order.
pub(crate) async fn resolve_questions(
    store: &dyn DocumentStore,
    ids: &[String],
) -> Result<Vec<Question>, StoreError> {
    let mut questions = Vec::with_capacity(ids.len());
    for id in ids {
        questions.push(store::get_as(store, QUESTIONS, id).await?);
    }
    Ok(questions)
}

/// Lists available exams. Any authenticated user.
pub async fn list_exams(State(store): State<SharedStore>) -> Result<impl IntoResponse, AppError> {
    let exams: Vec<Exam> = store::list_as(store.as_ref(), EXAMS, None).await?;
    let summaries: Vec<ExamSummary> = exams.iter().map(ExamSummary::from).collect();
    Ok(Json(summaries))
}

/// Exam overview with its questions, answer keys removed.
pub async fn get_exam(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam: Exam = store::get_as(store.as_ref(), EXAMS, &id).await?;
    let questions = resolve_questions(store.as_ref(), &exam.questions).await?;

    Ok(Json(ExamDetail {
        summary: ExamSummary::from(&exam),
        questions: questions.iter().map(PublicQuestion::from).collect(),
    }))
}

/// Generates an exam from selected questions.
///
/// `total_marks` is the sum of the selected questions' marks at this moment.
pub async fn create_exam(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_staff()?;
    payload.validate()?;

    let questions = resolve_questions(store.as_ref(), &payload.questions)
        .await
        .map_err(|e| match e {
            StoreError::NotFound { id, .. } => {
                AppError::BadRequest(format!("Unknown question '{}'", id))
            }
            other => AppError::from(other),
        })?;

    let mut exam = Exam {
        id: String::new(),
        title: payload.title,
        course: payload.course,
        questions: payload.questions,
        total_marks: total_marks(&questions),
        duration: payload.duration,
        created_by: claims.sub,
        created_at: Utc::now(),
    };
    exam.id = store::create_from(store.as_ref(), EXAMS, &exam).await?;

    tracing::info!(
        exam = %exam.id,
        questions = exam.questions.len(),
        total_marks = exam.total_marks,
        "Exam generated"
    );
    Ok((StatusCode::CREATED, Json(exam)))
}

/// Builds and stores a marking guide for an exam. Lecturer or admin.
pub async fn create_marking_guide(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_staff()?;

    let exam: Exam = store::get_as(store.as_ref(), EXAMS, &id).await?;
    let questions = resolve_questions(store.as_ref(), &exam.questions).await?;

    let mut guide = MarkingGuide::build(&exam, &questions);
    guide.id = store::create_from(store.as_ref(), MARKING_GUIDES, &guide).await?;

    Ok((StatusCode::CREATED, Json(guide)))
}

/// Marking guides generated for an exam, oldest first. Lecturer or admin.
pub async fn list_marking_guides(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_staff()?;

    let filter = Filter::eq("exam_id", id);
    let guides: Vec<MarkingGuide> =
        store::list_as(store.as_ref(), MARKING_GUIDES, Some(&filter)).await?;
    Ok(Json(guides))
}
