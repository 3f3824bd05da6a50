//! Router configuration for the HTTP API.
//!
//! Sets up all routes and middleware (CORS, compression, tracing) and
//! creates the axum router ready for serving.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Accounts
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        // Design catalog
        .route("/designs", get(handlers::list_designs))
        .route("/designs", post(handlers::create_design))
        .route("/designs/{design_id}", get(handlers::get_design))
        .route("/designs/{design_id}", put(handlers::update_design))
        .route("/designs/{design_id}", delete(handlers::delete_design))
        // Appointments
        .route("/appointments", post(handlers::book_appointment))
        .route("/appointments/me", get(handlers::list_my_appointments))
        .route(
            "/appointments/{appointment_id}/confirm",
            post(handlers::confirm_appointment),
        )
        .route(
            "/appointments/{appointment_id}/reject",
            post(handlers::reject_appointment),
        )
        .route(
            "/appointments/{appointment_id}/cancel",
            post(handlers::cancel_appointment),
        )
        .route(
            "/appointments/{appointment_id}/pay",
            post(handlers::pay_appointment),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
