//! Postgres repository implementation using Diesel.
//!
//! Implements the repository traits against Postgres. The overlap check in
//! `create_appointment_if_free` runs inside a serializable transaction; a
//! serialization failure rolls the insert back and is retried, so two racing
//! bookings for one artist can never both commit. A partial unique index on
//! `(artist_id, start_time)` over active statuses backstops the check.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;
use tokio::task;

use crate::api::{
    Appointment, AppointmentId, AppointmentStatus, Design, DesignId, DesignPatch, NewAppointment,
    NewDesign, NewUser, User, UserId,
};
use crate::db::repository::{
    AppointmentRepository, DesignRepository, ErrorContext, FullRepository, RepositoryError,
    RepositoryResult, UserRepository,
};
use crate::models::slot::TimeSlot;

mod models;
mod schema;

use models::*;
use schema::{appointments, designs, users};

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables. Fails if no
    /// connection string is set.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let min_pool_size = std::env::var("PG_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_sec = std::env::var("PG_IDLE_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        let max_retries = std::env::var("PG_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let retry_delay_ms = std::env::var("PG_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            max_pool_size,
            min_pool_size,
            connection_timeout_sec,
            idle_timeout_sec,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self { pool, config })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient
    /// failures (connection errors, timeouts, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

const ACTIVE_STATUSES: [&str; 2] = ["booked", "confirmed"];

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn create_user(&self, new: NewUser) -> RepositoryResult<User> {
        self.with_conn(move |conn| {
            let row: UserRow = diesel::insert_into(users::table)
                .values(NewUserRow {
                    email: new.email.clone(),
                    password_hash: new.password_hash.clone(),
                    role: new.role.as_str().to_string(),
                    name: new.name.clone(),
                })
                .returning(UserRow::as_returning())
                .get_result(conn)
                .map_err(|e| {
                    map_diesel_error(e)
                        .with_operation("create_user")
                })?;
            row_to_user(row)
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        self.with_conn(move |conn| {
            let row = users::table
                .filter(users::user_id.eq(id.value()))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;
            row.map(row_to_user).transpose()
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            let row = users::table
                .filter(users::email.eq(&email))
                .select(UserRow::as_select())
                .first::<UserRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;
            row.map(row_to_user).transpose()
        })
        .await
    }
}

#[async_trait]
impl DesignRepository for PostgresRepository {
    async fn create_design(&self, new: NewDesign) -> RepositoryResult<Design> {
        self.with_conn(move |conn| {
            let row: DesignRow = diesel::insert_into(designs::table)
                .values(NewDesignRow {
                    title: new.title.clone(),
                    description: new.description.clone(),
                    image_url: new.image_url.clone(),
                    price: new.price,
                    artist_id: new.artist_id.value(),
                })
                .returning(DesignRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_design"))?;
            Ok(row_to_design(row))
        })
        .await
    }

    async fn get_design(&self, id: DesignId) -> RepositoryResult<Option<Design>> {
        self.with_conn(move |conn| {
            let row = designs::table
                .filter(designs::design_id.eq(id.value()))
                .select(DesignRow::as_select())
                .first::<DesignRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;
            Ok(row.map(row_to_design))
        })
        .await
    }

    async fn list_designs(&self, artist_id: Option<UserId>) -> RepositoryResult<Vec<Design>> {
        self.with_conn(move |conn| {
            let mut query = designs::table.into_boxed();
            if let Some(artist_id) = artist_id {
                query = query.filter(designs::artist_id.eq(artist_id.value()));
            }
            let rows = query
                .select(DesignRow::as_select())
                .order(designs::created_at.desc())
                .load::<DesignRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(row_to_design).collect())
        })
        .await
    }

    async fn update_design(&self, id: DesignId, patch: DesignPatch) -> RepositoryResult<Design> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let mut row = designs::table
                    .filter(designs::design_id.eq(id.value()))
                    .select(DesignRow::as_select())
                    .first::<DesignRow>(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| {
                        RepositoryError::not_found_with_context(
                            format!("design {} not found", id),
                            ErrorContext::new("update_design")
                                .with_entity("design")
                                .with_entity_id(id),
                        )
                    })?;

                if let Some(title) = &patch.title {
                    row.title = title.clone();
                }
                if let Some(description) = &patch.description {
                    row.description = Some(description.clone());
                }
                if let Some(image_url) = &patch.image_url {
                    row.image_url = Some(image_url.clone());
                }
                if let Some(price) = patch.price {
                    row.price = Some(price);
                }

                let updated: DesignRow =
                    diesel::update(designs::table.filter(designs::design_id.eq(id.value())))
                        .set((
                            designs::title.eq(&row.title),
                            designs::description.eq(&row.description),
                            designs::image_url.eq(&row.image_url),
                            designs::price.eq(row.price),
                        ))
                        .returning(DesignRow::as_returning())
                        .get_result(tx)
                        .map_err(map_diesel_error)?;
                Ok(row_to_design(updated))
            })
        })
        .await
    }

    async fn delete_design(&self, id: DesignId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let deleted = diesel::delete(designs::table.filter(designs::design_id.eq(id.value())))
                .execute(conn)
                .map_err(|e| map_diesel_error(e).with_operation("delete_design"))?;
            if deleted == 0 {
                return Err(RepositoryError::not_found_with_context(
                    format!("design {} not found", id),
                    ErrorContext::new("delete_design")
                        .with_entity("design")
                        .with_entity_id(id),
                ));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl AppointmentRepository for PostgresRepository {
    async fn create_appointment_if_free(
        &self,
        new: NewAppointment,
    ) -> RepositoryResult<Appointment> {
        if TimeSlot::new(new.start_time, new.end_time).is_none() {
            return Err(RepositoryError::validation(format!(
                "end_time {} must be after start_time {}",
                new.end_time, new.start_time
            )));
        }

        self.with_conn(move |conn| {
            // Serializable isolation makes the scan-then-insert safe against
            // concurrent bookings; a serialization failure is retried by
            // `with_conn` and re-runs the scan.
            conn.build_transaction().serializable().run(|tx| {
                let overlapping: i64 = appointments::table
                    .filter(appointments::artist_id.eq(new.artist_id.value()))
                    .filter(appointments::status.eq_any(ACTIVE_STATUSES))
                    .filter(appointments::start_time.lt(new.end_time))
                    .filter(appointments::end_time.gt(new.start_time))
                    .select(count_star())
                    .first(tx)
                    .map_err(map_diesel_error)?;

                if overlapping > 0 {
                    return Err(RepositoryError::conflict_with_context(
                        format!(
                            "artist {} already has an appointment overlapping [{}, {})",
                            new.artist_id, new.start_time, new.end_time
                        ),
                        ErrorContext::new("create_appointment_if_free")
                            .with_entity("appointment")
                            .with_details(format!("artist_id={}", new.artist_id)),
                    ));
                }

                let row: AppointmentRow = diesel::insert_into(appointments::table)
                    .values(NewAppointmentRow {
                        design_id: new.design_id.value(),
                        client_id: new.client_id.value(),
                        artist_id: new.artist_id.value(),
                        start_time: new.start_time,
                        end_time: new.end_time,
                        status: AppointmentStatus::Booked.as_str().to_string(),
                        pay_now: new.pay_now,
                        paid: false,
                    })
                    .returning(AppointmentRow::as_returning())
                    .get_result(tx)
                    .map_err(|e| map_diesel_error(e).with_operation("create_appointment_if_free"))?;

                row_to_appointment(row)
            })
        })
        .await
    }

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> RepositoryResult<Option<Appointment>> {
        self.with_conn(move |conn| {
            let row = appointments::table
                .filter(appointments::appointment_id.eq(id.value()))
                .select(AppointmentRow::as_select())
                .first::<AppointmentRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;
            row.map(row_to_appointment).transpose()
        })
        .await
    }

    async fn list_appointments_for_artist(
        &self,
        artist_id: UserId,
    ) -> RepositoryResult<Vec<Appointment>> {
        self.with_conn(move |conn| {
            let rows = appointments::table
                .filter(appointments::artist_id.eq(artist_id.value()))
                .select(AppointmentRow::as_select())
                .order(appointments::start_time.desc())
                .load::<AppointmentRow>(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(row_to_appointment).collect()
        })
        .await
    }

    async fn list_appointments_for_client(
        &self,
        client_id: UserId,
    ) -> RepositoryResult<Vec<Appointment>> {
        self.with_conn(move |conn| {
            let rows = appointments::table
                .filter(appointments::client_id.eq(client_id.value()))
                .select(AppointmentRow::as_select())
                .order(appointments::start_time.desc())
                .load::<AppointmentRow>(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(row_to_appointment).collect()
        })
        .await
    }

    async fn update_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        to: AppointmentStatus,
    ) -> RepositoryResult<Appointment> {
        self.with_conn(move |conn| {
            // The UPDATE itself carries the expected-status predicate, so a
            // transition that lost a race matches zero rows instead of
            // overwriting the winner. The pre-read only exists to tell a
            // missing appointment apart from a stale expectation.
            let current: Option<String> = appointments::table
                .filter(appointments::appointment_id.eq(id.value()))
                .select(appointments::status)
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?;

            let current = current.ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("appointment {} not found", id),
                    ErrorContext::new("update_status")
                        .with_entity("appointment")
                        .with_entity_id(id),
                )
            })?;

            let row: Option<AppointmentRow> = diesel::update(
                appointments::table
                    .filter(appointments::appointment_id.eq(id.value()))
                    .filter(appointments::status.eq(expected.as_str())),
            )
            .set(appointments::status.eq(to.as_str()))
            .returning(AppointmentRow::as_returning())
            .get_result(conn)
            .optional()
            .map_err(map_diesel_error)?;

            match row {
                Some(row) => row_to_appointment(row),
                None => Err(RepositoryError::conflict_with_context(
                    format!(
                        "appointment {} is '{}', expected '{}'",
                        id, current, expected
                    ),
                    ErrorContext::new("update_status")
                        .with_entity("appointment")
                        .with_entity_id(id),
                )),
            }
        })
        .await
    }

    async fn mark_paid(&self, id: AppointmentId) -> RepositoryResult<Appointment> {
        self.with_conn(move |conn| {
            let row: AppointmentRow = diesel::update(
                appointments::table.filter(appointments::appointment_id.eq(id.value())),
            )
            .set(appointments::paid.eq(true))
            .returning(AppointmentRow::as_returning())
            .get_result(conn)
            .optional()
            .map_err(map_diesel_error)?
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("appointment {} not found", id),
                    ErrorContext::new("mark_paid")
                        .with_entity("appointment")
                        .with_entity_id(id),
                )
            })?;
            row_to_appointment(row)
        })
        .await
    }
}

#[async_trait]
impl FullRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }
}
