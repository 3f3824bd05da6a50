use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use super::{BookingRequest, Caller, Scheduler, SchedulerError};
use crate::api::{
    Appointment, AppointmentStatus, Design, NewDesign, NewUser, Role, User, UserId,
};
use crate::db::repositories::LocalRepository;
use crate::db::repository::{DesignRepository, FullRepository, UserRepository};
use crate::services::notifier::{Notification, NotificationSink};

/// Sink that records every notification it receives.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        self.sent.lock().push(notification);
        Ok(())
    }
}

/// Sink that always fails delivery.
struct FailingNotifier;

#[async_trait]
impl NotificationSink for FailingNotifier {
    async fn notify(&self, _notification: Notification) -> anyhow::Result<()> {
        anyhow::bail!("push gateway unreachable")
    }
}

struct Fixture {
    scheduler: Scheduler,
    repo: Arc<LocalRepository>,
    notifier: Arc<RecordingNotifier>,
    artist: User,
    client: User,
    design: Design,
}

impl Fixture {
    fn artist_caller(&self) -> Caller {
        Caller::new(self.artist.id, Role::Artist)
    }

    fn client_caller(&self) -> Caller {
        Caller::new(self.client.id, Role::Client)
    }

    fn booking(&self, start: DateTime<Utc>, minutes: Option<i64>) -> BookingRequest {
        BookingRequest {
            design_id: self.design.id,
            artist_id: self.artist.id,
            start_time: start,
            duration_minutes: minutes,
            pay_now: false,
        }
    }
}

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 12, hour, min, 0).unwrap()
}

async fn setup() -> Fixture {
    let repo = Arc::new(LocalRepository::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let artist = repo
        .create_user(NewUser {
            email: "ink@studio.example".to_string(),
            password_hash: "0".repeat(64),
            role: Role::Artist,
            name: "Marta".to_string(),
        })
        .await
        .unwrap();
    let client = repo
        .create_user(NewUser {
            email: "ana@example.com".to_string(),
            password_hash: "1".repeat(64),
            role: Role::Client,
            name: "Ana".to_string(),
        })
        .await
        .unwrap();
    let design = repo
        .create_design(NewDesign {
            title: "Koi".to_string(),
            description: None,
            image_url: None,
            price: Some(120_000),
            artist_id: artist.id,
        })
        .await
        .unwrap();

    let scheduler = Scheduler::new(
        repo.clone() as Arc<dyn FullRepository>,
        notifier.clone(),
    );

    Fixture {
        scheduler,
        repo,
        notifier,
        artist,
        client,
        design,
    }
}

async fn book(fx: &Fixture, start: DateTime<Utc>, minutes: Option<i64>) -> Appointment {
    fx.scheduler
        .book_appointment(fx.client_caller(), fx.booking(start, minutes))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_booking_creates_booked_unpaid_appointment() {
    let fx = setup().await;
    let appt = book(&fx, at(15, 0), Some(90)).await;

    assert_eq!(appt.status, AppointmentStatus::Booked);
    assert_eq!(appt.artist_id, fx.artist.id);
    assert_eq!(appt.client_id, fx.client.id);
    assert_eq!(appt.end_time, at(16, 30));
    assert!(!appt.paid);
    assert!(!appt.pay_now);
}

#[tokio::test]
async fn test_booking_defaults_to_sixty_minutes() {
    let fx = setup().await;
    let appt = book(&fx, at(15, 0), None).await;
    assert_eq!(appt.end_time, at(16, 0));
}

#[tokio::test]
async fn test_booking_notifies_artist() {
    let fx = setup().await;
    let appt = book(&fx, at(15, 0), None).await;

    let sent = fx.notifier.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, fx.artist.id);
    assert_eq!(sent[0].payload["appointment_id"], appt.id.value());
}

#[tokio::test]
async fn test_artist_cannot_book() {
    let fx = setup().await;
    let err = fx
        .scheduler
        .book_appointment(fx.artist_caller(), fx.booking(at(15, 0), None))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Permission(_)));
}

#[tokio::test]
async fn test_nonpositive_duration_is_validation_error() {
    let fx = setup().await;
    for minutes in [0, -30] {
        let err = fx
            .scheduler
            .book_appointment(fx.client_caller(), fx.booking(at(15, 0), Some(minutes)))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Validation(_)));
    }
}

#[tokio::test]
async fn test_oversized_duration_is_validation_error() {
    let fx = setup().await;
    // Durations past chrono's representable range must fail cleanly, not
    // panic inside the date arithmetic.
    for minutes in [i64::MAX, i64::MAX / 60_000] {
        let err = fx
            .scheduler
            .book_appointment(fx.client_caller(), fx.booking(at(15, 0), Some(minutes)))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Validation(_)));
    }
}

#[tokio::test]
async fn test_unknown_design_is_validation_error() {
    let fx = setup().await;
    let mut request = fx.booking(at(15, 0), None);
    request.design_id = crate::api::DesignId::new(999);
    let err = fx
        .scheduler
        .book_appointment(fx.client_caller(), request)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(_)));
}

#[tokio::test]
async fn test_design_artist_mismatch_is_validation_error() {
    let fx = setup().await;
    let other_artist = fx
        .repo
        .create_user(NewUser {
            email: "other@studio.example".to_string(),
            password_hash: "2".repeat(64),
            role: Role::Artist,
            name: "Nico".to_string(),
        })
        .await
        .unwrap();

    let mut request = fx.booking(at(15, 0), None);
    request.artist_id = other_artist.id;
    let err = fx
        .scheduler
        .book_appointment(fx.client_caller(), request)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(_)));
}

#[tokio::test]
async fn test_booking_client_as_artist_is_validation_error() {
    let fx = setup().await;
    let mut request = fx.booking(at(15, 0), None);
    request.artist_id = fx.client.id;
    let err = fx
        .scheduler
        .book_appointment(fx.client_caller(), request)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(_)));
}

#[tokio::test]
async fn test_overlapping_booking_conflicts() {
    let fx = setup().await;
    book(&fx, at(10, 0), Some(60)).await;

    let err = fx
        .scheduler
        .book_appointment(fx.client_caller(), fx.booking(at(10, 30), Some(60)))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict(_)));
}

#[tokio::test]
async fn test_adjacent_bookings_do_not_conflict() {
    let fx = setup().await;
    book(&fx, at(10, 0), Some(60)).await;
    // [11:00, 12:00) touches [10:00, 11:00) only at the boundary.
    book(&fx, at(11, 0), Some(60)).await;
}

#[tokio::test]
async fn test_cancellation_reopens_slot() {
    let fx = setup().await;
    let appt = book(&fx, at(10, 0), Some(60)).await;

    fx.scheduler
        .cancel_appointment(fx.client_caller(), appt.id)
        .await
        .unwrap();

    book(&fx, at(10, 0), Some(60)).await;
}

#[tokio::test]
async fn test_confirmed_appointment_still_blocks_slot() {
    let fx = setup().await;
    let appt = book(&fx, at(10, 0), Some(60)).await;
    fx.scheduler
        .confirm_appointment(fx.artist_caller(), appt.id)
        .await
        .unwrap();

    let err = fx
        .scheduler
        .book_appointment(fx.client_caller(), fx.booking(at(10, 30), Some(60)))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict(_)));
}

#[tokio::test]
async fn test_confirm_transitions_and_notifies_client() {
    let fx = setup().await;
    let appt = book(&fx, at(10, 0), None).await;

    let confirmed = fx
        .scheduler
        .confirm_appointment(fx.artist_caller(), appt.id)
        .await
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let sent = fx.notifier.sent.lock();
    assert_eq!(sent.last().unwrap().recipient, fx.client.id);
}

#[tokio::test]
async fn test_confirm_is_idempotent_on_confirmed() {
    let fx = setup().await;
    let appt = book(&fx, at(10, 0), None).await;
    fx.scheduler
        .confirm_appointment(fx.artist_caller(), appt.id)
        .await
        .unwrap();

    let again = fx
        .scheduler
        .confirm_appointment(fx.artist_caller(), appt.id)
        .await
        .unwrap();
    assert_eq!(again.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn test_confirm_by_foreign_artist_is_not_found() {
    let fx = setup().await;
    let appt = book(&fx, at(10, 0), None).await;
    let stranger = Caller::new(UserId::new(999), Role::Artist);

    let err = fx
        .scheduler
        .confirm_appointment(stranger, appt.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::NotFound(_)));
}

#[tokio::test]
async fn test_terminal_state_guards() {
    let fx = setup().await;
    let appt = book(&fx, at(10, 0), None).await;
    fx.scheduler
        .reject_appointment(fx.artist_caller(), appt.id)
        .await
        .unwrap();

    // A rejected appointment cannot be confirmed, re-rejected, or canceled.
    let confirm = fx
        .scheduler
        .confirm_appointment(fx.artist_caller(), appt.id)
        .await
        .unwrap_err();
    assert!(matches!(confirm, SchedulerError::InvalidState(_)));

    let reject = fx
        .scheduler
        .reject_appointment(fx.artist_caller(), appt.id)
        .await
        .unwrap_err();
    assert!(matches!(reject, SchedulerError::InvalidState(_)));

    let cancel = fx
        .scheduler
        .cancel_appointment(fx.client_caller(), appt.id)
        .await
        .unwrap_err();
    assert!(matches!(cancel, SchedulerError::InvalidState(_)));
}

#[tokio::test]
async fn test_reject_from_confirmed_is_legal() {
    let fx = setup().await;
    let appt = book(&fx, at(10, 0), None).await;
    fx.scheduler
        .confirm_appointment(fx.artist_caller(), appt.id)
        .await
        .unwrap();

    let rejected = fx
        .scheduler
        .reject_appointment(fx.artist_caller(), appt.id)
        .await
        .unwrap();
    assert_eq!(rejected.status, AppointmentStatus::Rejected);
}

#[tokio::test]
async fn test_cancel_by_non_party_is_permission_error() {
    let fx = setup().await;
    let appt = book(&fx, at(10, 0), None).await;
    let stranger = Caller::new(UserId::new(999), Role::Client);

    let err = fx
        .scheduler
        .cancel_appointment(stranger, appt.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Permission(_)));
}

#[tokio::test]
async fn test_artist_may_cancel_too() {
    let fx = setup().await;
    let appt = book(&fx, at(10, 0), None).await;

    let canceled = fx
        .scheduler
        .cancel_appointment(fx.artist_caller(), appt.id)
        .await
        .unwrap();
    assert_eq!(canceled.status, AppointmentStatus::Canceled);

    // Counterparty notification went to the client.
    let sent = fx.notifier.sent.lock();
    assert_eq!(sent.last().unwrap().recipient, fx.client.id);
}

#[tokio::test]
async fn test_mark_paid_is_idempotent_and_preserves_status() {
    let fx = setup().await;
    let appt = book(&fx, at(10, 0), None).await;

    let paid = fx
        .scheduler
        .mark_paid(fx.client_caller(), appt.id)
        .await
        .unwrap();
    assert!(paid.paid);
    assert_eq!(paid.status, AppointmentStatus::Booked);

    let again = fx
        .scheduler
        .mark_paid(fx.artist_caller(), appt.id)
        .await
        .unwrap();
    assert!(again.paid);
    assert_eq!(again.status, AppointmentStatus::Booked);
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_booking() {
    let fx = setup().await;
    let scheduler = Scheduler::new(
        fx.repo.clone() as Arc<dyn FullRepository>,
        Arc::new(FailingNotifier),
    );

    let appt = scheduler
        .book_appointment(fx.client_caller(), fx.booking(at(15, 0), None))
        .await
        .unwrap();
    assert_eq!(appt.status, AppointmentStatus::Booked);
}

#[tokio::test]
async fn test_list_my_appointments_by_role() {
    let fx = setup().await;
    book(&fx, at(10, 0), None).await;
    book(&fx, at(12, 0), None).await;

    let as_client = fx
        .scheduler
        .list_my_appointments(fx.client_caller())
        .await
        .unwrap();
    assert_eq!(as_client.len(), 2);
    // Newest start first.
    assert!(as_client[0].start_time > as_client[1].start_time);

    let as_artist = fx
        .scheduler
        .list_my_appointments(fx.artist_caller())
        .await
        .unwrap();
    assert_eq!(as_artist.len(), 2);
}

#[tokio::test]
async fn test_concurrent_overlapping_bookings_admit_exactly_one() {
    let fx = setup().await;
    let scheduler = Arc::new(Scheduler::new(
        fx.repo.clone() as Arc<dyn FullRepository>,
        Arc::new(RecordingNotifier::default()),
    ));

    let caller = fx.client_caller();
    let a = fx.booking(at(10, 0), Some(60));
    let b = fx.booking(at(10, 30), Some(60));

    let s1 = scheduler.clone();
    let s2 = scheduler.clone();
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { s1.book_appointment(caller, a).await }),
        tokio::spawn(async move { s2.book_appointment(caller, b).await }),
    );
    let r1 = r1.unwrap();
    let r2 = r2.unwrap();

    let successes = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of two racing bookings may win");
    for r in [r1, r2] {
        if let Err(e) = r {
            assert!(matches!(e, SchedulerError::Conflict(_)));
        }
    }
}
