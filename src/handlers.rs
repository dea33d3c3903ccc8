use crate::error::AppError;
use crate::models::{OptionLabel, RankedRow};
use crate::scoring;
use crate::session::Direction;
use crate::state::{timer_settings, AppState, FacultySession, StudentAction, StudentView};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;
use validator::Validate;

const SESSION_COOKIE: &str = "faculty_session";
const CSRF_COOKIE: &str = "csrf_token";

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

async fn require_faculty(jar: &CookieJar, state: &AppState, req_id: &str) -> Result<FacultySession, AppError> {
    let unauthorized = || AppError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "not logged in", req_id);
    let sid = jar.get(SESSION_COOKIE).ok_or_else(unauthorized)?.value().to_string();
    state.faculty_session(&sid).await.ok_or_else(unauthorized)
}

/// Mutating faculty requests must echo the CSRF token in `x-csrf-token`.
async fn require_faculty_csrf(
    headers: &HeaderMap,
    jar: &CookieJar,
    state: &AppState,
    req_id: &str,
) -> Result<FacultySession, AppError> {
    let session = require_faculty(jar, state, req_id).await?;
    let header = headers.get("x-csrf-token").and_then(|h| h.to_str().ok());
    if header != Some(session.csrf_token.as_str()) {
        return Err(AppError::new(StatusCode::FORBIDDEN, "FORBIDDEN", "csrf token invalid", req_id));
    }
    Ok(session)
}

#[derive(Debug, Deserialize, Validate)]
pub struct FacultyLoginPayload {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct FacultyOut {
    pub email: String,
}

pub async fn faculty_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(payload): Json<FacultyLoginPayload>,
) -> Result<(CookieJar, Json<FacultyOut>), AppError> {
    let req_id = request_id_from_headers(&headers);
    payload
        .validate()
        .map_err(|e| AppError::validation(e, req_id.clone()))?;
    let email = payload.email;
    let login = state
        .faculty_login(&email, &payload.password)
        .await
        .map_err(|e| e.into_app_error(req_id))?;

    let cookie = Cookie::build((SESSION_COOKIE, login.session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    let csrf_cookie = Cookie::build((CSRF_COOKIE, login.csrf_token))
        .http_only(false)
        .same_site(SameSite::Lax)
        .path("/")
        .build();

    Ok((jar.add(cookie).add(csrf_cookie), Json(FacultyOut { email })))
}

pub async fn faculty_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), AppError> {
    let req_id = request_id_from_headers(&headers);
    let sid = jar
        .get(SESSION_COOKIE)
        .map(|v| v.value().to_string())
        .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "no session", req_id))?;
    state.faculty_logout(&sid).await;
    Ok((
        jar.remove(Cookie::from(SESSION_COOKIE)).remove(Cookie::from(CSRF_COOKIE)),
        StatusCode::NO_CONTENT,
    ))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuestionsPayload {
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadQuestionsResponse {
    pub count: usize,
}

pub async fn upload_questions(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(payload): Json<UploadQuestionsPayload>,
) -> Result<Json<UploadQuestionsResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    require_faculty_csrf(&headers, &jar, &state, &req_id).await?;
    let count = state.upload_questions(&payload.paragraphs).await;
    Ok(Json(UploadQuestionsResponse { count }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamCodePayload {
    #[serde(default)]
    pub timer_enabled: bool,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamCodeResponse {
    pub code: String,
    pub timer_enabled: bool,
    pub duration_minutes: Option<u32>,
}

pub async fn generate_exam_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(payload): Json<ExamCodePayload>,
) -> Result<(StatusCode, Json<ExamCodeResponse>), AppError> {
    let req_id = request_id_from_headers(&headers);
    require_faculty_csrf(&headers, &jar, &state, &req_id).await?;
    let timer = timer_settings(payload.timer_enabled, payload.duration_minutes)
        .map_err(|e| e.into_app_error(req_id.clone()))?;
    let config = state.generate_exam_code(timer).await;
    Ok((
        StatusCode::CREATED,
        Json(ExamCodeResponse {
            timer_enabled: config.timer_enabled(),
            duration_minutes: config.timer.map(|t| t.duration_minutes),
            code: config.code,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub items: Vec<RankedRow>,
    pub total: usize,
}

pub async fn results(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Json<ResultsResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    require_faculty(&jar, &state, &req_id).await?;
    let items = state.ranked_results().await;
    Ok(Json(ResultsResponse { total: items.len(), items }))
}

pub async fn results_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let req_id = request_id_from_headers(&headers);
    require_faculty(&jar, &state, &req_id).await?;
    let rows = state.ranked_results().await;
    let body = scoring::export_csv(&rows).map_err(|err| {
        error!("failed to render results csv: {}", err);
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "export failed", req_id)
    })?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"results.csv\""),
        ],
        body,
    ))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartExamPayload {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub roll_number: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    pub code: String,
}

pub async fn start_exam(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<StartExamPayload>,
) -> Result<(StatusCode, Json<StudentView>), AppError> {
    let req_id = request_id_from_headers(&headers);
    payload
        .validate()
        .map_err(|e| AppError::validation(e, req_id.clone()))?;
    let view = state
        .start_exam(
            &payload.code,
            payload.roll_number.trim(),
            payload.name.trim(),
            Utc::now(),
        )
        .await
        .map_err(|e| e.into_app_error(req_id))?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn act(state: &AppState, headers: &HeaderMap, id: Uuid, action: StudentAction) -> Result<Json<StudentView>, AppError> {
    let req_id = request_id_from_headers(headers);
    state
        .student_action(id, action, Utc::now())
        .await
        .map(Json)
        .map_err(|e| e.into_app_error(req_id))
}

pub async fn view_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<StudentView>, AppError> {
    act(&state, &headers, id, StudentAction::Poll).await
}

#[derive(Debug, Deserialize)]
pub struct AnswerPayload {
    pub letter: OptionLabel,
    pub index: Option<usize>,
}

pub async fn select_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerPayload>,
) -> Result<Json<StudentView>, AppError> {
    let action = StudentAction::Answer {
        index: payload.index,
        letter: payload.letter,
    };
    act(&state, &headers, id, action).await
}

#[derive(Debug, Deserialize)]
pub struct NavigatePayload {
    pub direction: Direction,
}

pub async fn navigate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<NavigatePayload>,
) -> Result<Json<StudentView>, AppError> {
    act(&state, &headers, id, StudentAction::Navigate(payload.direction)).await
}

pub async fn submit_exam(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<StudentView>, AppError> {
    act(&state, &headers, id, StudentAction::Submit).await
}
