use crate::handlers;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::header::COOKIE,
            axum::http::HeaderName::from_static("x-csrf-token"),
            axum::http::HeaderName::from_static("x-request-id"),
        ]);
    match HeaderValue::from_str(cors_origin) {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(err) => tracing::warn!("ignoring invalid CORS origin {:?}: {}", cors_origin, err),
    }

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/faculty/login", post(handlers::faculty_login))
        .route("/api/v1/faculty/logout", post(handlers::faculty_logout))
        .route("/api/v1/faculty/questions", post(handlers::upload_questions))
        .route("/api/v1/faculty/exam-code", post(handlers::generate_exam_code))
        .route("/api/v1/faculty/results", get(handlers::results))
        .route("/api/v1/faculty/results.csv", get(handlers::results_csv))
        .route("/api/v1/student/start", post(handlers::start_exam))
        .route("/api/v1/student/sessions/:id", get(handlers::view_session))
        .route("/api/v1/student/sessions/:id/answer", post(handlers::select_answer))
        .route("/api/v1/student/sessions/:id/navigate", post(handlers::navigate))
        .route("/api/v1/student/sessions/:id/submit", post(handlers::submit_exam))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
}
