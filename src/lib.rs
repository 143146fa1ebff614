//! Appointment Booking Service
//!
//! This library implements the scheduling core of an appointment booking
//! app: computing which time slots are bookable on a given day, and driving
//! a booking as an all-or-nothing write across the primary appointment
//! store and an independent confirmation service.
//!
//! # Modules
//!
//! - `services::availability`: bookable-slot computation for one day
//! - `services::conflicts`: normalization of the three conflict sources
//! - `services::booking`: the booking workflow with compensation
//! - `services::store`: CSV-backed primary appointment store
//! - `client`: signed HTTP client for the remote scheduling backend
//! - `collaborators`: the abstract interfaces the core is written against
//!
//! # Authentication
//!
//! Backend requests use AKSK (AppId, SecretId, SecretKey) authentication
//! with HMAC-SHA256 signatures; the signing logic lives in the `auth`
//! module.

pub mod auth;
pub mod client;
pub mod collaborators;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
pub mod client_mock;

// Re-export the main API types for ease of use
pub use auth::BackendAuth;
pub use client::SchedulingBackendClient;
pub use error::BookingFailure;
pub use handlers::api::AppState;
pub use routes::create_router;
pub use services::availability::compute_availability;
pub use services::booking::BookingOrchestrator;
