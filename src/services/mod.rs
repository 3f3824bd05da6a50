//! High-level business logic services.
//!
//! - `accounts`: registration and login with SHA-256 password digests
//! - `catalog`: design CRUD with ownership checks
//! - `notifier`: fire-and-forget notification sink abstraction
//! - `password`: password hashing helpers

pub mod accounts;
pub mod catalog;
pub mod notifier;
pub mod password;

pub use accounts::{login, register, AccountError, LoginOutcome, RegisterRequest};
pub use catalog::{CatalogError, CatalogService, DesignDraft};
pub use notifier::{LogNotifier, Notification, NotificationKind, NotificationSink};
