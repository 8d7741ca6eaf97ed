use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde::Serialize;
use tracing::error;

use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;
use crate::store::ReconcileStats;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/courses", get(list_courses))
        .route("/api/courses/{id}", get(get_course))
        .route("/api/register", post(register))
        .route("/api/registrations", get(list_registrations))
        // one segment: a student id for GET, a registration id for DELETE
        .route(
            "/api/registrations/{id}",
            get(list_student_registrations).delete(drop_registration),
        )
        .route("/api/admin/reconcile", post(reconcile))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let timestamp = Utc::now().to_rfc3339();
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "OK",
                database: "connected",
                timestamp,
            }),
        ),
        Err(err) => {
            error!("health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "ERROR",
                    database: "disconnected",
                    timestamp,
                }),
            )
        }
    }
}

async fn list_courses(
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, AppError> {
    let courses = state.registrations().list_courses().await?;
    Ok(Json(courses.into_iter().map(CourseResponse::from).collect()))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseResponse>, AppError> {
    let course = state.registrations().get_course(&id).await?;
    Ok(Json(course.into()))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let registration = state.registrations().register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Successfully registered for the course".to_string(),
            registration,
        }),
    ))
}

async fn list_student_registrations(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<Registration>>, AppError> {
    let registrations = state.registrations().list_for_student(&student_id).await?;
    Ok(Json(registrations))
}

async fn list_registrations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Registration>>, AppError> {
    let registrations = state.registrations().list_all().await?;
    Ok(Json(registrations))
}

async fn drop_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.registrations().drop_registration(&id).await?;
    Ok(Json(MessageResponse {
        message: "Registration cancelled successfully".to_string(),
    }))
}

async fn reconcile(State(state): State<AppState>) -> Result<Json<ReconcileStats>, AppError> {
    let stats = state.registrations().reconcile().await?;
    Ok(Json(stats))
}
