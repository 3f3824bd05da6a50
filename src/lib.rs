//! # Inkbook Backend
//!
//! Appointment-booking backend for a tattoo marketplace.
//!
//! This crate implements the server side of a marketplace where artists
//! publish designs and clients book studio time against them. Its core is
//! the appointment scheduler: half-open interval overlap detection per
//! artist and a compare-and-set status machine, both enforced atomically at
//! the repository layer so racing requests cannot double-book a slot.
//!
//! ## Features
//!
//! - **Accounts**: artist/client registration and login with digest storage
//! - **Catalog**: design CRUD with ownership checks
//! - **Scheduling**: conflict-checked booking, confirm/reject/cancel/pay
//! - **Notifications**: fire-and-forget delivery to booking counterparties
//! - **HTTP API**: RESTful endpoints via axum
//!
//! ## Architecture
//!
//! - [`api`]: shared domain entities and identifiers
//! - [`models`]: time-slot arithmetic
//! - [`scheduler`]: the appointment lifecycle and its invariants
//! - [`services`]: accounts, catalog, and notification services
//! - [`db`]: repository pattern with in-memory and Postgres backends
//! - [`http`]: axum-based HTTP server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod db;
pub mod models;

pub mod scheduler;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
