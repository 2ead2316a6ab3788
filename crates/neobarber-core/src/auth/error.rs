use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Fallback message when a login fails without a server detail
pub const LOGIN_FAILED: &str = "Login failed";

/// Fallback message when a registration fails without a server detail
pub const REGISTRATION_FAILED: &str = "Registration failed";

/// Failure of `login` or `register`.
///
/// `Display` is the message to show the user: the server's `detail` verbatim
/// when it sent one, otherwise a generic fallback.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{message}")]
    Api {
        message: String,
        #[source]
        source: ApiError,
    },

    #[error("{message}")]
    Storage {
        message: String,
        #[source]
        source: StorageError,
    },
}

impl AuthError {
    pub(crate) fn from_api(source: ApiError, fallback: &str) -> Self {
        let message = source.detail().unwrap_or(fallback).to_string();
        AuthError::Api { message, source }
    }

    pub(crate) fn from_storage(source: StorageError, fallback: &str) -> Self {
        AuthError::Storage {
            message: fallback.to_string(),
            source,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AuthError::Api { message, .. } | AuthError::Storage { message, .. } => message,
        }
    }

    /// True when the server rejected the credentials (as opposed to a
    /// transport or storage failure).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::Api {
                source: ApiError::Unauthorized(_)
                    | ApiError::AccessDenied(_)
                    | ApiError::Rejected { .. },
                ..
            }
        )
    }
}
