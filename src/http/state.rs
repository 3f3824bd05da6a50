//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::scheduler::Scheduler;
use crate::services::{CatalogService, NotificationSink};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for storage operations
    pub repository: Arc<dyn FullRepository>,
    /// Appointment scheduler
    pub scheduler: Arc<Scheduler>,
    /// Design catalog service
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    /// Create a new application state around one repository and one
    /// notification sink.
    pub fn new(repository: Arc<dyn FullRepository>, notifier: Arc<dyn NotificationSink>) -> Self {
        let scheduler = Arc::new(Scheduler::new(repository.clone(), notifier));
        let catalog = Arc::new(CatalogService::new(repository.clone()));
        Self {
            repository,
            scheduler,
            catalog,
        }
    }
}
