//! NeoBarber core - session, secret storage and API client for the
//! NeoBarber barbershop manager.
//!
//! Front ends create one `SessionStore` at startup, call
//! `SessionStore::load_user` to restore a previous session, and route on
//! `SessionStore::phase`. Domain data is fetched through the `ApiClient`
//! returned by `SessionStore::api`.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storage;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, Phase, SessionState, SessionStore};
pub use config::Config;
pub use storage::{open_store, SecretStore, StorageBackend, StorageError};
