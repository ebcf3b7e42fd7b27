//! HTTP surface for the student service.
//!
//! - `POST /students` – Create a student. `201` with the record, `409` on a duplicate email.
//! - `GET /students` – List every student.
//! - `GET /students/{id}` – Fetch one student, `404` when absent.
//! - `PUT /students/{id}` – Partially update a student, `404` when absent, `409` on conflict.
//! - `DELETE /students/{id}` – Remove a student, `204` or `404`.
//! - `GET /students/{id}/summary` – Ask the summary client for a narrative profile. Upstream
//!   failures become `502`; a disabled client yields `503`.
//! - `GET /ping` – Health check.
//!
//! Request bodies are validated here before the service is invoked. Every error response is
//! a JSON object with a single `detail` string.

use crate::logging::log_requests;
use crate::models::{NewStudent, Student, StudentPatch, ValidationError};
use crate::service::{StudentError, StudentService};
use crate::summary::{SummaryClient, SummaryOutcome};
use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Student CRUD operations.
    pub students: StudentService,
    /// Provider used by the summary endpoint.
    pub summaries: Arc<dyn SummaryClient>,
}

/// Build the HTTP router exposing the student API.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(ping))
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route("/students/:id/summary", get(get_student_summary))
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(state)
}

/// Response body for `GET /ping`.
#[derive(Serialize)]
struct PingResponse {
    message: &'static str,
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        message: "Server is up and running!",
    })
}

/// Response body for `GET /students/{id}/summary`.
#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

async fn create_student(
    State(state): State<AppState>,
    payload: Result<Json<NewStudent>, JsonRejection>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let Json(input) = payload?;
    let student = state.students.create(input.validate()?)?;
    tracing::info!(id = student.id, "Student created");
    Ok((StatusCode::CREATED, Json(student)))
}

async fn list_students(State(state): State<AppState>) -> Json<Vec<Student>> {
    Json(state.students.list_all())
}

async fn get_student(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Student>, AppError> {
    let id = student_id(id)?;
    state
        .students
        .get_by_id(id)
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn update_student(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<StudentPatch>, JsonRejection>,
) -> Result<Json<Student>, AppError> {
    let id = student_id(id)?;
    let Json(patch) = payload?;
    let updated = state.students.update(id, patch.validate()?)?;
    updated.map(Json).ok_or(AppError::NotFound)
}

async fn delete_student(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = student_id(id)?;
    if state.students.delete(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn get_student_summary(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<SummaryResponse>, AppError> {
    let id = student_id(id)?;
    let student = state.students.get_by_id(id).ok_or(AppError::NotFound)?;
    match state.summaries.summarize(&student).await {
        SummaryOutcome::Disabled => Err(AppError::Unavailable(SummaryOutcome::Disabled.text())),
        outcome if outcome.is_failure() => {
            tracing::warn!(id, detail = %outcome, "Summary generation failed");
            Err(AppError::BadGateway(outcome.text()))
        }
        outcome => Ok(Json(SummaryResponse {
            summary: outcome.text(),
        })),
    }
}

/// Identifiers start at 1, so `0` is rejected as malformed rather than looked up.
fn student_id(id: Result<Path<u64>, PathRejection>) -> Result<u64, AppError> {
    match id? {
        Path(0) => Err(AppError::Validation(
            "student id must be greater than 0".to_string(),
        )),
        Path(id) => Ok(id),
    }
}

enum AppError {
    Validation(String),
    NotFound,
    Conflict(StudentError),
    BadGateway(String),
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Validation(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
            Self::NotFound => (StatusCode::NOT_FOUND, "Student not found".to_string()),
            Self::Conflict(error) => (StatusCode::CONFLICT, error.to_string()),
            Self::BadGateway(detail) => (StatusCode::BAD_GATEWAY, detail),
            Self::Unavailable(detail) => (StatusCode::SERVICE_UNAVAILABLE, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<StudentError> for AppError {
    fn from(inner: StudentError) -> Self {
        Self::Conflict(inner)
    }
}

impl From<ValidationError> for AppError {
    fn from(inner: ValidationError) -> Self {
        Self::Validation(inner.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(inner: JsonRejection) -> Self {
        Self::Validation(inner.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(inner: PathRejection) -> Self {
        Self::Validation(inner.body_text())
    }
}
