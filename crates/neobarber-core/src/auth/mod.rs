//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionState`: Snapshot of the current user, token and loading flag
//! - `SessionStore`: Login/register/logout/restore lifecycle with change
//!   notification for the UI layer
//! - `AuthError`: User-displayable failure of login or registration
//!
//! Only the bearer token is persisted (through a `SecretStore`); the user
//! record is always re-fetched from the API on launch.

pub mod error;
pub mod session;
pub mod store;

pub use error::AuthError;
pub use session::{Phase, SessionData, SessionState};
pub use store::{SessionStore, TOKEN_KEY};
