//! Appointment scheduler: overlap-checked booking and the status machine.
//!
//! This is the component that owns the appointment lifecycle and guarantees
//! the core invariant: for a fixed artist, no two appointments with status
//! in {booked, confirmed} ever have overlapping `[start, end)` intervals.
//!
//! Every operation receives the caller's resolved identity and performs its
//! capability check up front; there is no ambient session. The overlap scan
//! and the insert are delegated to the repository as one atomic unit
//! (`create_appointment_if_free`), so two racing bookings for the same
//! artist cannot both pass the check.
//!
//! Status machine:
//!
//! ```text
//! booked ──confirm──▶ confirmed
//! booked ──reject───▶ rejected (terminal)
//! booked/confirmed ──cancel──▶ canceled (terminal)
//! confirmed ──reject──▶ rejected
//! done: administrative only, never produced here
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::{
    Appointment, AppointmentId, AppointmentStatus, DesignId, NewAppointment, Role, UserId,
};
use crate::db::repository::{FullRepository, RepositoryError};
use crate::models::slot::{TimeSlot, DEFAULT_APPOINTMENT_MINUTES};
use crate::services::notifier::{Notification, NotificationKind, NotificationSink};

#[cfg(test)]
mod tests;

/// The caller's resolved identity. Produced by the identity layer upstream;
/// the scheduler trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// A request to book an artist's slot.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub design_id: DesignId,
    pub artist_id: UserId,
    pub start_time: DateTime<Utc>,
    /// Defaults to 60 minutes when absent. Must be strictly positive.
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub pay_now: bool,
}

/// Error taxonomy for scheduler operations.
///
/// Each variant is local to a single request; nothing here is retried
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Malformed or inconsistent input; user-correctable (HTTP 400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced entity absent, or the caller lacks visibility (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Entity exists but the caller lacks rights (HTTP 403).
    #[error("permission denied: {0}")]
    Permission(String),

    /// The requested slot overlaps an existing booked/confirmed
    /// appointment (HTTP 409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The transition is not legal from the current status (HTTP 400).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Storage failure unrelated to the request's semantics.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for SchedulerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { .. } => SchedulerError::Conflict(err.to_string()),
            RepositoryError::NotFound { .. } => SchedulerError::NotFound(err.to_string()),
            RepositoryError::Validation { .. } => SchedulerError::Validation(err.to_string()),
            other => SchedulerError::Repository(other),
        }
    }
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// The scheduler service.
///
/// Holds its collaborators explicitly; construct one per application with
/// the repository and notification sink of your choosing.
pub struct Scheduler {
    repository: Arc<dyn FullRepository>,
    notifier: Arc<dyn NotificationSink>,
}

impl Scheduler {
    pub fn new(repository: Arc<dyn FullRepository>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Book an appointment for `caller` (a client) with an artist.
    ///
    /// Validates that the design and artist exist, that the design belongs
    /// to that artist, and that the duration is strictly positive; then
    /// atomically checks the artist's calendar for a half-open interval
    /// overlap and persists the appointment in `booked` status. The artist
    /// is notified fire-and-forget.
    pub async fn book_appointment(
        &self,
        caller: Caller,
        request: BookingRequest,
    ) -> SchedulerResult<Appointment> {
        if caller.role != Role::Client {
            return Err(SchedulerError::Permission(
                "only clients can book appointments".to_string(),
            ));
        }

        let duration = request
            .duration_minutes
            .unwrap_or(DEFAULT_APPOINTMENT_MINUTES);
        let slot = TimeSlot::from_duration(request.start_time, duration).ok_or_else(|| {
            SchedulerError::Validation(format!(
                "duration_minutes must be a positive integer, got {}",
                duration
            ))
        })?;

        let design = self
            .repository
            .get_design(request.design_id)
            .await?
            .ok_or_else(|| {
                SchedulerError::Validation(format!("design {} does not exist", request.design_id))
            })?;
        let artist = self
            .repository
            .get_user(request.artist_id)
            .await?
            .filter(|u| u.role == Role::Artist)
            .ok_or_else(|| {
                SchedulerError::Validation(format!(
                    "user {} is not a known artist",
                    request.artist_id
                ))
            })?;
        if design.artist_id != artist.id {
            return Err(SchedulerError::Validation(format!(
                "design {} does not belong to artist {}",
                design.id, artist.id
            )));
        }

        // The conflict scan and the insert happen atomically inside the
        // repository; a Conflict error here means the slot was taken,
        // possibly by a concurrent request.
        let appointment = self
            .repository
            .create_appointment_if_free(NewAppointment {
                design_id: design.id,
                client_id: caller.id,
                artist_id: artist.id,
                start_time: slot.start,
                end_time: slot.end,
                pay_now: request.pay_now,
            })
            .await?;

        self.notify_quietly(
            artist.id,
            NotificationKind::AppointmentBooked,
            &appointment,
        )
        .await;

        Ok(appointment)
    }

    /// Confirm a booked appointment. Only the appointment's artist may do
    /// this; anyone else sees `NotFound`, which masks existence.
    ///
    /// Confirming an already-confirmed appointment is an idempotent no-op.
    pub async fn confirm_appointment(
        &self,
        caller: Caller,
        id: AppointmentId,
    ) -> SchedulerResult<Appointment> {
        let appointment = self.get_owned_by_artist(caller, id).await?;

        match appointment.status {
            AppointmentStatus::Confirmed => Ok(appointment),
            AppointmentStatus::Booked => {
                let updated = self
                    .repository
                    .update_status(id, AppointmentStatus::Booked, AppointmentStatus::Confirmed)
                    .await?;
                self.notify_quietly(
                    updated.client_id,
                    NotificationKind::AppointmentConfirmed,
                    &updated,
                )
                .await;
                Ok(updated)
            }
            status => Err(SchedulerError::InvalidState(format!(
                "cannot confirm appointment {} in status '{}'",
                id, status
            ))),
        }
    }

    /// Reject a booked or confirmed appointment. Artist only, same
    /// visibility masking as confirm. Rejecting a terminal appointment
    /// fails with `InvalidState`.
    pub async fn reject_appointment(
        &self,
        caller: Caller,
        id: AppointmentId,
    ) -> SchedulerResult<Appointment> {
        let appointment = self.get_owned_by_artist(caller, id).await?;

        match appointment.status {
            AppointmentStatus::Booked | AppointmentStatus::Confirmed => {
                let updated = self
                    .repository
                    .update_status(id, appointment.status, AppointmentStatus::Rejected)
                    .await?;
                self.notify_quietly(
                    updated.client_id,
                    NotificationKind::AppointmentRejected,
                    &updated,
                )
                .await;
                Ok(updated)
            }
            status => Err(SchedulerError::InvalidState(format!(
                "cannot reject appointment {} in status '{}'",
                id, status
            ))),
        }
    }

    /// Cancel an appointment. Either party (client or artist) may cancel,
    /// and only from `booked` or `confirmed`. The transition re-opens the
    /// artist's slot for future bookings.
    pub async fn cancel_appointment(
        &self,
        caller: Caller,
        id: AppointmentId,
    ) -> SchedulerResult<Appointment> {
        let appointment = self.get_for_party(caller, id).await?;

        match appointment.status {
            AppointmentStatus::Booked | AppointmentStatus::Confirmed => {
                let updated = self
                    .repository
                    .update_status(id, appointment.status, AppointmentStatus::Canceled)
                    .await?;
                let counterparty = if caller.id == updated.client_id {
                    updated.artist_id
                } else {
                    updated.client_id
                };
                self.notify_quietly(
                    counterparty,
                    NotificationKind::AppointmentCanceled,
                    &updated,
                )
                .await;
                Ok(updated)
            }
            status => Err(SchedulerError::InvalidState(format!(
                "cannot cancel appointment {} in status '{}'",
                id, status
            ))),
        }
    }

    /// Record a payment. Either party may mark an appointment paid;
    /// idempotent, and never touches `status`.
    pub async fn mark_paid(
        &self,
        caller: Caller,
        id: AppointmentId,
    ) -> SchedulerResult<Appointment> {
        let _ = self.get_for_party(caller, id).await?;
        Ok(self.repository.mark_paid(id).await?)
    }

    /// List the caller's appointments: as client for clients, as artist for
    /// artists. Newest start first.
    pub async fn list_my_appointments(&self, caller: Caller) -> SchedulerResult<Vec<Appointment>> {
        let appointments = match caller.role {
            Role::Client => {
                self.repository
                    .list_appointments_for_client(caller.id)
                    .await?
            }
            Role::Artist => {
                self.repository
                    .list_appointments_for_artist(caller.id)
                    .await?
            }
        };
        Ok(appointments)
    }

    /// Fetch an appointment enforcing artist ownership. A missing
    /// appointment and a foreign one are indistinguishable to the caller.
    async fn get_owned_by_artist(
        &self,
        caller: Caller,
        id: AppointmentId,
    ) -> SchedulerResult<Appointment> {
        self.repository
            .get_appointment(id)
            .await?
            .filter(|a| a.artist_id == caller.id)
            .ok_or_else(|| SchedulerError::NotFound(format!("appointment {} not found", id)))
    }

    /// Fetch an appointment, requiring the caller to be one of its parties.
    async fn get_for_party(
        &self,
        caller: Caller,
        id: AppointmentId,
    ) -> SchedulerResult<Appointment> {
        let appointment = self
            .repository
            .get_appointment(id)
            .await?
            .ok_or_else(|| SchedulerError::NotFound(format!("appointment {} not found", id)))?;

        if appointment.client_id != caller.id && appointment.artist_id != caller.id {
            return Err(SchedulerError::Permission(format!(
                "user {} is not a party to appointment {}",
                caller.id, id
            )));
        }
        Ok(appointment)
    }

    /// Deliver a notification, swallowing failures. Booking success is
    /// never contingent on notification delivery.
    async fn notify_quietly(
        &self,
        recipient: UserId,
        kind: NotificationKind,
        appointment: &Appointment,
    ) {
        let payload = serde_json::json!({
            "appointment_id": appointment.id,
            "artist_id": appointment.artist_id,
            "client_id": appointment.client_id,
            "start_time": appointment.start_time,
            "end_time": appointment.end_time,
            "status": appointment.status,
        });
        let notification = Notification::new(recipient, kind, payload);
        if let Err(e) = self.notifier.notify(notification).await {
            log::warn!(
                "notification delivery failed for user {}: {:#}",
                recipient,
                e
            );
        }
    }
}
