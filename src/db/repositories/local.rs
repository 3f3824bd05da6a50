//! In-memory repository implementation.
//!
//! Used for unit testing and local development. All stores live behind a
//! single `parking_lot::Mutex`; the booking overlap scan and the insert run
//! under one guard, which makes `create_appointment_if_free` trivially
//! conflict-serializable (a stricter regime than the per-artist isolation
//! the contract requires). Critical sections are short and never await.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::api::{
    Appointment, AppointmentId, AppointmentStatus, Design, DesignId, DesignPatch, NewAppointment,
    NewDesign, NewUser, User, UserId,
};
use crate::db::repository::{
    AppointmentRepository, DesignRepository, ErrorContext, FullRepository, RepositoryError,
    RepositoryResult, UserRepository,
};
use crate::models::TimeSlot;

#[derive(Default)]
struct Stores {
    users: HashMap<i64, User>,
    designs: HashMap<i64, Design>,
    appointments: HashMap<i64, Appointment>,
    next_user_id: i64,
    next_design_id: i64,
    next_appointment_id: i64,
}

impl Stores {
    fn next_user_id(&mut self) -> i64 {
        self.next_user_id += 1;
        self.next_user_id
    }

    fn next_design_id(&mut self) -> i64 {
        self.next_design_id += 1;
        self.next_design_id
    }

    fn next_appointment_id(&mut self) -> i64 {
        self.next_appointment_id += 1;
        self.next_appointment_id
    }
}

/// In-memory repository backed by hash maps.
#[derive(Default)]
pub struct LocalRepository {
    inner: Mutex<Stores>,
}

impl LocalRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn create_user(&self, new: NewUser) -> RepositoryResult<User> {
        let mut stores = self.inner.lock();

        if stores.users.values().any(|u| u.email == new.email) {
            return Err(RepositoryError::conflict_with_context(
                format!("email '{}' is already registered", new.email),
                ErrorContext::new("create_user").with_entity("user"),
            ));
        }

        let id = stores.next_user_id();
        let user = User {
            id: UserId::new(id),
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            name: new.name,
        };
        stores.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self.inner.lock().users.get(&id.value()).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl DesignRepository for LocalRepository {
    async fn create_design(&self, new: NewDesign) -> RepositoryResult<Design> {
        let mut stores = self.inner.lock();
        let id = stores.next_design_id();
        let design = Design {
            id: DesignId::new(id),
            title: new.title,
            description: new.description,
            image_url: new.image_url,
            price: new.price,
            artist_id: new.artist_id,
            created_at: Utc::now(),
        };
        stores.designs.insert(id, design.clone());
        Ok(design)
    }

    async fn get_design(&self, id: DesignId) -> RepositoryResult<Option<Design>> {
        Ok(self.inner.lock().designs.get(&id.value()).cloned())
    }

    async fn list_designs(&self, artist_id: Option<UserId>) -> RepositoryResult<Vec<Design>> {
        let stores = self.inner.lock();
        let mut designs: Vec<Design> = stores
            .designs
            .values()
            .filter(|d| artist_id.map_or(true, |a| d.artist_id == a))
            .cloned()
            .collect();
        designs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(designs)
    }

    async fn update_design(&self, id: DesignId, patch: DesignPatch) -> RepositoryResult<Design> {
        let mut stores = self.inner.lock();
        let design = stores.designs.get_mut(&id.value()).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("design {} not found", id),
                ErrorContext::new("update_design").with_entity_id(id),
            )
        })?;

        if let Some(title) = patch.title {
            design.title = title;
        }
        if let Some(description) = patch.description {
            design.description = Some(description);
        }
        if let Some(image_url) = patch.image_url {
            design.image_url = Some(image_url);
        }
        if let Some(price) = patch.price {
            design.price = Some(price);
        }
        Ok(design.clone())
    }

    async fn delete_design(&self, id: DesignId) -> RepositoryResult<()> {
        let mut stores = self.inner.lock();
        stores.designs.remove(&id.value()).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("design {} not found", id),
                ErrorContext::new("delete_design").with_entity_id(id),
            )
        })?;
        Ok(())
    }
}

#[async_trait]
impl AppointmentRepository for LocalRepository {
    async fn create_appointment_if_free(
        &self,
        new: NewAppointment,
    ) -> RepositoryResult<Appointment> {
        // Scan and insert under a single guard: no other booking can be
        // interleaved between the overlap check and the commit.
        let mut stores = self.inner.lock();

        let slot = TimeSlot::new(new.start_time, new.end_time).ok_or_else(|| {
            RepositoryError::validation(format!(
                "appointment interval is empty: start={} end={}",
                new.start_time, new.end_time
            ))
        })?;

        let clash = stores.appointments.values().find(|a| {
            a.artist_id == new.artist_id
                && a.status.blocks_slot()
                && TimeSlot::new(a.start_time, a.end_time)
                    .map_or(false, |existing| existing.overlaps(&slot))
        });
        if let Some(existing) = clash {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "artist {} already has appointment {} in [{}, {})",
                    new.artist_id, existing.id, existing.start_time, existing.end_time
                ),
                ErrorContext::new("create_appointment_if_free").with_entity("appointment"),
            ));
        }

        let id = stores.next_appointment_id();
        let appointment = Appointment {
            id: AppointmentId::new(id),
            design_id: new.design_id,
            client_id: new.client_id,
            artist_id: new.artist_id,
            start_time: new.start_time,
            end_time: new.end_time,
            status: AppointmentStatus::Booked,
            pay_now: new.pay_now,
            paid: false,
            created_at: Utc::now(),
        };
        stores.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> RepositoryResult<Option<Appointment>> {
        Ok(self.inner.lock().appointments.get(&id.value()).cloned())
    }

    async fn list_appointments_for_artist(
        &self,
        artist_id: UserId,
    ) -> RepositoryResult<Vec<Appointment>> {
        let stores = self.inner.lock();
        let mut appts: Vec<Appointment> = stores
            .appointments
            .values()
            .filter(|a| a.artist_id == artist_id)
            .cloned()
            .collect();
        appts.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(appts)
    }

    async fn list_appointments_for_client(
        &self,
        client_id: UserId,
    ) -> RepositoryResult<Vec<Appointment>> {
        let stores = self.inner.lock();
        let mut appts: Vec<Appointment> = stores
            .appointments
            .values()
            .filter(|a| a.client_id == client_id)
            .cloned()
            .collect();
        appts.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(appts)
    }

    async fn update_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        to: AppointmentStatus,
    ) -> RepositoryResult<Appointment> {
        let mut stores = self.inner.lock();
        let appointment = stores.appointments.get_mut(&id.value()).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("appointment {} not found", id),
                ErrorContext::new("update_status").with_entity_id(id),
            )
        })?;

        if appointment.status != expected {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "appointment {} is '{}', expected '{}'",
                    id, appointment.status, expected
                ),
                ErrorContext::new("update_status").with_entity_id(id),
            ));
        }

        appointment.status = to;
        Ok(appointment.clone())
    }

    async fn mark_paid(&self, id: AppointmentId) -> RepositoryResult<Appointment> {
        let mut stores = self.inner.lock();
        let appointment = stores.appointments.get_mut(&id.value()).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("appointment {} not found", id),
                ErrorContext::new("mark_paid").with_entity_id(id),
            )
        })?;
        appointment.paid = true;
        Ok(appointment.clone())
    }
}

#[async_trait]
impl FullRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 12, hour, 0, 0).unwrap()
    }

    fn new_appointment(artist: i64, start_h: u32, end_h: u32) -> NewAppointment {
        NewAppointment {
            design_id: DesignId::new(1),
            client_id: UserId::new(10),
            artist_id: UserId::new(artist),
            start_time: at(start_h),
            end_time: at(end_h),
            pay_now: false,
        }
    }

    #[tokio::test]
    async fn test_overlapping_booking_conflicts() {
        let repo = LocalRepository::new();
        repo.create_appointment_if_free(new_appointment(1, 10, 12))
            .await
            .unwrap();

        let err = repo
            .create_appointment_if_free(new_appointment(1, 11, 13))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_same_slot_different_artists() {
        let repo = LocalRepository::new();
        repo.create_appointment_if_free(new_appointment(1, 10, 12))
            .await
            .unwrap();
        repo.create_appointment_if_free(new_appointment(2, 10, 12))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_canceled_appointment_frees_slot() {
        let repo = LocalRepository::new();
        let appt = repo
            .create_appointment_if_free(new_appointment(1, 10, 12))
            .await
            .unwrap();
        repo.update_status(appt.id, AppointmentStatus::Booked, AppointmentStatus::Canceled)
            .await
            .unwrap();

        repo.create_appointment_if_free(new_appointment(1, 10, 12))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_status_cas() {
        let repo = LocalRepository::new();
        let appt = repo
            .create_appointment_if_free(new_appointment(1, 10, 12))
            .await
            .unwrap();

        let err = repo
            .update_status(
                appt.id,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Canceled,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));

        let unchanged = repo.get_appointment(appt.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, AppointmentStatus::Booked);
    }

    #[tokio::test]
    async fn test_lost_status_race_does_not_overwrite_winner() {
        let repo = LocalRepository::new();
        let appt = repo
            .create_appointment_if_free(new_appointment(1, 10, 12))
            .await
            .unwrap();

        repo.update_status(appt.id, AppointmentStatus::Booked, AppointmentStatus::Confirmed)
            .await
            .unwrap();

        // A second actor still holding the old status loses with Conflict
        // and the winner's transition stands.
        let err = repo
            .update_status(appt.id, AppointmentStatus::Booked, AppointmentStatus::Canceled)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));

        let current = repo.get_appointment(appt.id).await.unwrap().unwrap();
        assert_eq!(current.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = LocalRepository::new();
        let new = |email: &str| NewUser {
            email: email.to_string(),
            password_hash: "deadbeef".to_string(),
            role: crate::api::Role::Client,
            name: "Ana".to_string(),
        };
        repo.create_user(new("ana@example.com")).await.unwrap();
        let err = repo.create_user(new("ana@example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_mark_paid_idempotent() {
        let repo = LocalRepository::new();
        let appt = repo
            .create_appointment_if_free(new_appointment(1, 10, 12))
            .await
            .unwrap();

        let first = repo.mark_paid(appt.id).await.unwrap();
        assert!(first.paid);
        let second = repo.mark_paid(appt.id).await.unwrap();
        assert!(second.paid);
    }
}
