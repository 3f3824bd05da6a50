//! Public domain types for the booking backend.
//!
//! This file consolidates the entity types and identifiers shared by the
//! scheduler, the service layer, the repositories, and the HTTP API.
//! All types derive Serialize/Deserialize for JSON serialization; statuses
//! and roles serialize to their lowercase wire strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// User identifier (database primary key).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Design identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DesignId(pub i64);

/// Appointment identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppointmentId(pub i64);

impl UserId {
    pub fn new(value: i64) -> Self {
        UserId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl DesignId {
    pub fn new(value: i64) -> Self {
        DesignId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl AppointmentId {
    pub fn new(value: i64) -> Self {
        AppointmentId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for DesignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}
impl From<DesignId> for i64 {
    fn from(id: DesignId) -> Self {
        id.0
    }
}
impl From<AppointmentId> for i64 {
    fn from(id: AppointmentId) -> Self {
        id.0
    }
}

/// Account role. Capability checks in the scheduler and the catalog service
/// are parameterized by this tagged variant rather than by free-form strings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Artist,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Artist => "artist",
            Role::Client => "client",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "artist" => Ok(Role::Artist),
            "client" => Ok(Role::Client),
            other => Err(format!("role must be 'artist' or 'client', got '{}'", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appointment lifecycle status.
///
/// `Rejected` and `Canceled` are terminal. `Done` is declared for completed
/// sessions but is only ever set administratively; no scheduler transition
/// produces it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Booked,
    Confirmed,
    Rejected,
    Canceled,
    Done,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Canceled => "canceled",
            AppointmentStatus::Done => "done",
        }
    }

    /// Whether an appointment in this status occupies its artist's slot.
    ///
    /// Only `booked` and `confirmed` appointments participate in overlap
    /// detection; a canceled or rejected slot is immediately rebookable.
    pub fn blocks_slot(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Booked | AppointmentStatus::Confirmed
        )
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(AppointmentStatus::Booked),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "rejected" => Ok(AppointmentStatus::Rejected),
            "canceled" => Ok(AppointmentStatus::Canceled),
            "done" => Ok(AppointmentStatus::Done),
            other => Err(format!("unknown appointment status '{}'", other)),
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account (artist or client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// SHA-256 hex digest of the password, never the plaintext.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub name: String,
}

/// Payload for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
}

/// A catalog entry owned by an artist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Design {
    pub id: DesignId,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Price in minor currency units; `None` means "ask the artist".
    pub price: Option<i64>,
    pub artist_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a design.
#[derive(Debug, Clone)]
pub struct NewDesign {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<i64>,
    pub artist_id: UserId,
}

/// Field-level patch for updating a design. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DesignPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<i64>,
}

/// A booked session between a client and an artist.
///
/// Appointments are never physically deleted; cancellation is a status
/// transition, not a removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub design_id: DesignId,
    pub client_id: UserId,
    pub artist_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    /// Client's declared intent to pay up front; immutable after creation.
    pub pay_now: bool,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating an appointment. Status, `paid`, and `created_at`
/// are assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub design_id: DesignId,
    pub client_id: UserId,
    pub artist_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub pay_now: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_value_roundtrip() {
        let id = AppointmentId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(i64::from(id), 42);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("artist".parse::<Role>().unwrap(), Role::Artist);
        assert_eq!("client".parse::<Role>().unwrap(), Role::Client);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_status_wire_strings() {
        for status in [
            AppointmentStatus::Booked,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Rejected,
            AppointmentStatus::Canceled,
            AppointmentStatus::Done,
        ] {
            assert_eq!(
                status.as_str().parse::<AppointmentStatus>().unwrap(),
                status
            );
        }
    }

    #[test]
    fn test_blocks_slot() {
        assert!(AppointmentStatus::Booked.blocks_slot());
        assert!(AppointmentStatus::Confirmed.blocks_slot());
        assert!(!AppointmentStatus::Rejected.blocks_slot());
        assert!(!AppointmentStatus::Canceled.blocks_slot());
        assert!(!AppointmentStatus::Done.blocks_slot());
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&AppointmentStatus::Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");
        let role: Role = serde_json::from_str("\"artist\"").unwrap();
        assert_eq!(role, Role::Artist);
    }
}
