//! Storage module for the booking backend.
//!
//! Abstractions for persistence via the Repository pattern, allowing
//! different storage backends to be swapped easily.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (REST API, server binary)            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Scheduler & Services - Business Logic                  │
//! │  - Overlap-checked booking, status machine              │
//! │  - Accounts, catalog, notifications                     │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌──────────────────────────────────────────────┐
//!     │   LocalRepository     │   PostgresRepository │
//!     │    (in-memory)        │   (Diesel, feature)  │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! There is deliberately no process-global repository handle: every
//! scheduler and service operation receives its repository explicitly, and
//! the server binary owns the single `Arc<dyn FullRepository>` it hands to
//! the HTTP state.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    AppointmentRepository, DesignRepository, ErrorContext, FullRepository, RepositoryError,
    RepositoryResult, UserRepository,
};
