//! Data Transfer Objects for the HTTP API.
//!
//! Request payloads that already derive Deserialize in the scheduler and
//! service layers are re-exported rather than duplicated; responses reuse
//! the domain entities directly (password hashes never serialize).

use serde::{Deserialize, Serialize};

pub use crate::api::{Appointment, Design, DesignPatch, User};
pub use crate::scheduler::BookingRequest;
pub use crate::services::{DesignDraft, RegisterRequest};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
    /// Database connectivity status
    pub database: String,
}

/// Request body for login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub role: String,
    pub name: String,
}

/// Query parameters for listing designs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DesignsQuery {
    /// Restrict the listing to one artist's portfolio
    pub artist_id: Option<i64>,
}

/// Response for design listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignListResponse {
    pub designs: Vec<Design>,
    pub total: usize,
}

/// Response for appointment listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<Appointment>,
    pub total: usize,
}
