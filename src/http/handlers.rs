//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! scheduler or service layer for business logic.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::auth::resolve_caller;
use super::dto::{
    AppointmentListResponse, BookingRequest, DesignDraft, DesignListResponse, DesignsQuery,
    HealthResponse, LoginRequest, LoginResponse, RegisterRequest,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{Appointment, AppointmentId, Design, DesignId, DesignPatch, User, UserId};
use crate::services::accounts;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Verifies the service is running and the backing store is reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Accounts
// =============================================================================

/// POST /v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = accounts::register(state.repository.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> HandlerResult<LoginResponse> {
    let outcome =
        accounts::login(state.repository.as_ref(), &request.email, &request.password).await?;
    Ok(Json(LoginResponse {
        user_id: outcome.user_id.value(),
        role: outcome.role.to_string(),
        name: outcome.name,
    }))
}

// =============================================================================
// Design Catalog
// =============================================================================

/// GET /v1/designs
pub async fn list_designs(
    State(state): State<AppState>,
    Query(query): Query<DesignsQuery>,
) -> HandlerResult<DesignListResponse> {
    let designs = state
        .catalog
        .list_designs(query.artist_id.map(UserId::new))
        .await?;
    let total = designs.len();
    Ok(Json(DesignListResponse { designs, total }))
}

/// GET /v1/designs/{design_id}
pub async fn get_design(
    State(state): State<AppState>,
    Path(design_id): Path<i64>,
) -> HandlerResult<Design> {
    let design = state.catalog.get_design(DesignId::new(design_id)).await?;
    Ok(Json(design))
}

/// POST /v1/designs
pub async fn create_design(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<DesignDraft>,
) -> Result<(StatusCode, Json<Design>), AppError> {
    let caller = resolve_caller(&state, &headers).await?;
    let design = state.catalog.create_design(caller, draft).await?;
    Ok((StatusCode::CREATED, Json(design)))
}

/// PUT /v1/designs/{design_id}
pub async fn update_design(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(design_id): Path<i64>,
    Json(patch): Json<DesignPatch>,
) -> HandlerResult<Design> {
    let caller = resolve_caller(&state, &headers).await?;
    let design = state
        .catalog
        .update_design(caller, DesignId::new(design_id), patch)
        .await?;
    Ok(Json(design))
}

/// DELETE /v1/designs/{design_id}
pub async fn delete_design(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(design_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let caller = resolve_caller(&state, &headers).await?;
    state
        .catalog
        .delete_design(caller, DesignId::new(design_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Appointments
// =============================================================================

/// POST /v1/appointments
pub async fn book_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let caller = resolve_caller(&state, &headers).await?;
    let appointment = state.scheduler.book_appointment(caller, request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// GET /v1/appointments/me
pub async fn list_my_appointments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HandlerResult<AppointmentListResponse> {
    let caller = resolve_caller(&state, &headers).await?;
    let appointments = state.scheduler.list_my_appointments(caller).await?;
    let total = appointments.len();
    Ok(Json(AppointmentListResponse {
        appointments,
        total,
    }))
}

/// POST /v1/appointments/{appointment_id}/confirm
pub async fn confirm_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(appointment_id): Path<i64>,
) -> HandlerResult<Appointment> {
    let caller = resolve_caller(&state, &headers).await?;
    let appointment = state
        .scheduler
        .confirm_appointment(caller, AppointmentId::new(appointment_id))
        .await?;
    Ok(Json(appointment))
}

/// POST /v1/appointments/{appointment_id}/reject
pub async fn reject_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(appointment_id): Path<i64>,
) -> HandlerResult<Appointment> {
    let caller = resolve_caller(&state, &headers).await?;
    let appointment = state
        .scheduler
        .reject_appointment(caller, AppointmentId::new(appointment_id))
        .await?;
    Ok(Json(appointment))
}

/// POST /v1/appointments/{appointment_id}/cancel
pub async fn cancel_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(appointment_id): Path<i64>,
) -> HandlerResult<Appointment> {
    let caller = resolve_caller(&state, &headers).await?;
    let appointment = state
        .scheduler
        .cancel_appointment(caller, AppointmentId::new(appointment_id))
        .await?;
    Ok(Json(appointment))
}

/// POST /v1/appointments/{appointment_id}/pay
pub async fn pay_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(appointment_id): Path<i64>,
) -> HandlerResult<Appointment> {
    let caller = resolve_caller(&state, &headers).await?;
    let appointment = state
        .scheduler
        .mark_paid(caller, AppointmentId::new(appointment_id))
        .await?;
    Ok(Json(appointment))
}
