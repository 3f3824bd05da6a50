//! Repository trait definitions.
//!
//! These traits are the abstract storage interface for the booking backend.
//! Implementations live in `crate::db::repositories` (in-memory local, and
//! Postgres behind the `postgres-repo` feature).

mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use async_trait::async_trait;

use crate::api::{
    Appointment, AppointmentId, AppointmentStatus, Design, DesignId, DesignPatch, NewAppointment,
    NewDesign, NewUser, User, UserId,
};

/// Repository trait for account storage.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user. Fails with `RepositoryError::Conflict` if the email is
    /// already registered.
    async fn create_user(&self, new: NewUser) -> RepositoryResult<User>;

    /// Fetch a user by id, or `None` if absent.
    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>>;

    /// Fetch a user by email, or `None` if absent.
    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
}

/// Repository trait for the design catalog.
#[async_trait]
pub trait DesignRepository: Send + Sync {
    /// Create a design owned by an artist.
    async fn create_design(&self, new: NewDesign) -> RepositoryResult<Design>;

    /// Fetch a design by id, or `None` if absent.
    async fn get_design(&self, id: DesignId) -> RepositoryResult<Option<Design>>;

    /// List designs, newest first, optionally filtered by owning artist.
    async fn list_designs(&self, artist_id: Option<UserId>) -> RepositoryResult<Vec<Design>>;

    /// Apply a field patch to a design. Fails with `NotFound` if absent.
    async fn update_design(&self, id: DesignId, patch: DesignPatch) -> RepositoryResult<Design>;

    /// Hard-delete a design. Fails with `NotFound` if absent.
    ///
    /// Designs are owned user content, unlike appointments, which are only
    /// ever status-transitioned.
    async fn delete_design(&self, id: DesignId) -> RepositoryResult<()>;
}

/// Repository trait for appointment storage.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Atomically insert an appointment unless its artist already has a
    /// booked or confirmed appointment overlapping `[start_time, end_time)`.
    ///
    /// The overlap scan and the insert MUST be conflict-serializable with
    /// concurrent calls for the same artist: of two racing overlapping
    /// bookings, exactly one may succeed. An overlap is reported as
    /// `RepositoryError::Conflict`. Bookings for different artists are
    /// independent and need no mutual synchronization.
    ///
    /// # Returns
    /// * `Ok(Appointment)` - the persisted appointment, status `booked`,
    ///   `paid = false`
    /// * `Err(RepositoryError)` - conflict or storage failure
    async fn create_appointment_if_free(
        &self,
        new: NewAppointment,
    ) -> RepositoryResult<Appointment>;

    /// Fetch an appointment by id, or `None` if absent.
    async fn get_appointment(&self, id: AppointmentId)
        -> RepositoryResult<Option<Appointment>>;

    /// List appointments where the user is the artist, newest start first.
    async fn list_appointments_for_artist(
        &self,
        artist_id: UserId,
    ) -> RepositoryResult<Vec<Appointment>>;

    /// List appointments where the user is the client, newest start first.
    async fn list_appointments_for_client(
        &self,
        client_id: UserId,
    ) -> RepositoryResult<Vec<Appointment>>;

    /// Compare-and-set status transition.
    ///
    /// Atomically moves the appointment from `expected` to `to`. If the
    /// stored status no longer equals `expected` (a concurrent transition
    /// won), fails with `RepositoryError::Conflict` and changes nothing.
    async fn update_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        to: AppointmentStatus,
    ) -> RepositoryResult<Appointment>;

    /// Set `paid = true`. Idempotent; re-marking a paid appointment is a
    /// no-op success. Does not touch `status`.
    async fn mark_paid(&self, id: AppointmentId) -> RepositoryResult<Appointment>;
}

/// Combined repository interface used across the application.
#[async_trait]
pub trait FullRepository:
    UserRepository + DesignRepository + AppointmentRepository + Send + Sync
{
    /// Check that the backing store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;
}
