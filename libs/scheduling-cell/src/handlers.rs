// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreateBlockRequest, PatternDiscoveryRequest, RenewBlockRequest, SchedulingError};
use crate::services::blocks::BlockLifecycleManager;
use crate::services::formatter::PatternFormatterService;
use crate::services::patterns::PatternGenerator;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct RenewableQueryParams {
    pub patient_id: Option<Uuid>,
}

// ==============================================================================
// PATTERN DISCOVERY HANDLERS
// ==============================================================================

/// Discover conflict-scored recurring slot candidates for a set of therapy
/// needs. The prose summary is best-effort: a failing formatter downgrades to
/// `summary: null` without touching the pattern list.
#[axum::debug_handler]
pub async fn discover_patterns(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<PatternDiscoveryRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let generator = PatternGenerator::new(&state);

    let patterns = generator.generate(&request.needs, &request.preferences, Utc::now(), token).await
        .map_err(|e| match e {
            SchedulingError::ValidationError(msg) => AppError::BadRequest(msg),
            SchedulingError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    let formatter = PatternFormatterService::new(&state);
    let summary = match formatter.format_patterns(&patterns).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!("Pattern formatting unavailable: {}", e);
            None
        }
    };

    Ok(Json(json!({
        "success": true,
        "count": patterns.len(),
        "patterns": patterns,
        "summary": summary,
    })))
}

// ==============================================================================
// BLOCK LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_block(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateBlockRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let manager = BlockLifecycleManager::new(&state);

    let appointments = manager.create_block(&request, token).await
        .map_err(|e| match e {
            SchedulingError::PatientNotFound => {
                AppError::NotFound("Patient not found".to_string())
            },
            SchedulingError::ProfessionalNotFound => {
                AppError::NotFound("Professional not found".to_string())
            },
            SchedulingError::ValidationError(msg) => AppError::BadRequest(msg),
            SchedulingError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    let group_id = appointments.first().and_then(|appointment| appointment.group_id);

    Ok(Json(json!({
        "success": true,
        "group_id": group_id,
        "appointments": appointments,
        "message": "Recurring block created successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_renewable(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<RenewableQueryParams>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let manager = BlockLifecycleManager::new(&state);

    let renewable = manager.detect_renewable(params.patient_id, Utc::now(), token).await
        .map_err(|e| match e {
            SchedulingError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "count": renewable.len(),
        "renewable": renewable,
    })))
}

#[axum::debug_handler]
pub async fn renew_block(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<RenewBlockRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let manager = BlockLifecycleManager::new(&state);

    let appointments = manager.renew_by_id(request.appointment_id, request.additional_sessions, token).await
        .map_err(|e| match e {
            SchedulingError::AppointmentNotFound => {
                AppError::NotFound("Appointment not found".to_string())
            },
            SchedulingError::RenewalConflict { .. } => {
                AppError::Conflict("Renewal slot conflicts with an existing booking".to_string())
            },
            SchedulingError::ValidationError(msg) => AppError::BadRequest(msg),
            SchedulingError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "message": "Block renewed successfully"
    })))
}

#[axum::debug_handler]
pub async fn dismiss_renewal(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let manager = BlockLifecycleManager::new(&state);

    manager.dismiss(appointment_id, token).await
        .map_err(|e| match e {
            SchedulingError::AppointmentNotFound => {
                AppError::NotFound("Appointment not found".to_string())
            },
            SchedulingError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Renewal dismissed"
    })))
}
