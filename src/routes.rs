// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, ai, auth, exams, questions, results, sessions},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, staff_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, questions, exams, sessions, results, ai, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let authenticated = || middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(authenticated()),
        );

    let question_routes = Router::new()
        .route(
            "/",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/{id}",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .layer(middleware::from_fn(staff_middleware))
        .layer(authenticated());

    // Reads are open to every role; writes check for staff in the handler.
    let exam_routes = Router::new()
        .route("/", get(exams::list_exams).post(exams::create_exam))
        .route("/{id}", get(exams::get_exam))
        .route("/{id}/marking-guide", post(exams::create_marking_guide))
        .route("/{id}/marking-guides", get(exams::list_marking_guides))
        .layer(authenticated());

    let session_routes = Router::new()
        .route("/", post(sessions::start_session))
        .route("/{id}", get(sessions::get_session))
        .route("/{id}/answers", put(sessions::record_answer))
        .route("/{id}/submit", post(sessions::submit_session))
        .route("/{id}/abandon", post(sessions::abandon_session))
        .layer(middleware::from_fn(student_middleware))
        .layer(authenticated());

    let result_routes = Router::new()
        .route("/", get(results::list_results))
        .route("/mine", get(results::my_results))
        .route("/{id}", get(results::get_result))
        .route("/{id}/grade", post(results::grade_result))
        .layer(authenticated());

    let ai_routes = Router::new()
        .route("/questions", post(ai::draft_question))
        .route("/analysis", post(ai::analyze_content))
        .layer(middleware::from_fn(staff_middleware))
        .layer(authenticated());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/questions/{id}", delete(admin::delete_question))
        .route("/exams/{id}", delete(admin::delete_exam))
        .route("/results/{id}", delete(admin::delete_result))
        .route("/stats", get(admin::stats))
        .route("/export", get(admin::export))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(authenticated());

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/results", result_routes)
        .nest("/api/ai", ai_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
