//! REST API client module for the NeoBarber backend.
//!
//! This module provides the `ApiClient` for the authentication endpoints
//! used by the session store and the barbershop data endpoints (services,
//! clients, appointments, tasks, analytics) used by the front end.
//!
//! The API uses bearer token authentication; tokens are issued by
//! `/auth/login` and `/auth/register`.

pub mod client;
pub mod error;

pub use client::{Agenda, ApiClient};
pub use error::ApiError;
