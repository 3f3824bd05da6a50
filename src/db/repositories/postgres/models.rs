use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{appointments, designs, users};
use crate::api::{
    Appointment, AppointmentId, AppointmentStatus, Design, DesignId, Role, User, UserId,
};
use crate::db::repository::{RepositoryError, RepositoryResult};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub user_id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub name: String,
    #[allow(dead_code)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = designs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DesignRow {
    pub design_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<i64>,
    pub artist_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = designs)]
pub struct NewDesignRow {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<i64>,
    pub artist_id: i64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AppointmentRow {
    pub appointment_id: i64,
    pub design_id: i64,
    pub client_id: i64,
    pub artist_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub pay_now: bool,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = appointments)]
pub struct NewAppointmentRow {
    pub design_id: i64,
    pub client_id: i64,
    pub artist_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub pay_now: bool,
    pub paid: bool,
}

pub fn row_to_user(row: UserRow) -> RepositoryResult<User> {
    let role: Role = row
        .role
        .parse()
        .map_err(|e: String| RepositoryError::internal(format!("bad role in row: {}", e)))?;
    Ok(User {
        id: UserId::new(row.user_id),
        email: row.email,
        password_hash: row.password_hash,
        role,
        name: row.name,
    })
}

pub fn row_to_design(row: DesignRow) -> Design {
    Design {
        id: DesignId::new(row.design_id),
        title: row.title,
        description: row.description,
        image_url: row.image_url,
        price: row.price,
        artist_id: UserId::new(row.artist_id),
        created_at: row.created_at,
    }
}

pub fn row_to_appointment(row: AppointmentRow) -> RepositoryResult<Appointment> {
    let status: AppointmentStatus = row
        .status
        .parse()
        .map_err(|e: String| RepositoryError::internal(format!("bad status in row: {}", e)))?;
    Ok(Appointment {
        id: AppointmentId::new(row.appointment_id),
        design_id: DesignId::new(row.design_id),
        client_id: UserId::new(row.client_id),
        artist_id: UserId::new(row.artist_id),
        start_time: row.start_time,
        end_time: row.end_time,
        status,
        pay_now: row.pay_now,
        paid: row.paid,
        created_at: row.created_at,
    })
}
