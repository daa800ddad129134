// src/handlers/results.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        question::Question,
        result::{ExamResult, GradeRequest, ResultDetail, ResultListParams, objective_score},
    },
    store::{self, EXAMS, Filter, QUESTIONS, RESULTS, SharedStore, StoreError},
    utils::jwt::Claims,
};

/// The caller's own results, oldest first.
pub async fn my_results(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let filter = Filter::eq("student_id", claims.sub);
    let results: Vec<ExamResult> = store::list_as(store.as_ref(), RESULTS, Some(&filter)).await?;
    Ok(Json(results))
}

/// All results, optionally for one exam. Lecturer or admin.
pub async fn list_results(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ResultListParams>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_staff()?;

    let filter = params.exam_id.map(|id| Filter::eq("exam_id", id));
    let results: Vec<ExamResult> =
        store::list_as(store.as_ref(), RESULTS, filter.as_ref()).await?;
    Ok(Json(results))
}

/// One result with the objective auto-score. Owner or staff.
///
/// Questions deleted since the attempt are left out of the auto-score.
pub async fn get_result(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result: ExamResult = store::get_as(store.as_ref(), RESULTS, &id).await?;
    if !claims.role.is_staff() && result.student_id != claims.sub {
        return Err(AppError::Forbidden("Not your result".to_string()));
    }

    let exam: Exam = store::get_as(store.as_ref(), EXAMS, &result.exam_id).await?;
    let mut questions = Vec::with_capacity(exam.questions.len());
    for question_id in &exam.questions {
        match store::get_as::<Question>(store.as_ref(), QUESTIONS, question_id).await {
            Ok(q) => questions.push(q),
            Err(StoreError::NotFound { .. }) => {
                tracing::warn!(result = %id, question = %question_id, "Question missing from auto-score");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let (objective_correct, objective_score) = objective_score(&result.answers, &questions);
    Ok(Json(ResultDetail {
        result,
        total_marks: exam.total_marks,
        objective_correct,
        objective_score,
    }))
}

/// Records a grade. The score may not exceed the exam's total marks.
/// Lecturer or admin.
pub async fn grade_result(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<GradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_staff()?;
    payload.validate()?;

    let mut result: ExamResult = store::get_as(store.as_ref(), RESULTS, &id).await?;
    let exam: Exam = store::get_as(store.as_ref(), EXAMS, &result.exam_id).await?;

    if payload.score > exam.total_marks {
        return Err(AppError::BadRequest(format!(
            "Score {} exceeds the exam's total of {} marks",
            payload.score, exam.total_marks
        )));
    }

    result.graded = true;
    result.score = Some(payload.score);
    store::update_from(store.as_ref(), RESULTS, &id, &result).await?;

    tracing::info!(result = %id, score = payload.score, grader = %claims.sub, "Result graded");
    Ok(Json(result))
}
