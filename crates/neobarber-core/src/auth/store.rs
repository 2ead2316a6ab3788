use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::models::TokenResponse;
use crate::storage::SecretStore;

use super::error::{LOGIN_FAILED, REGISTRATION_FAILED};
use super::{AuthError, Phase, SessionData, SessionState};

/// Storage key the bearer token is persisted under
pub const TOKEN_KEY: &str = "token";

/// Owns the session and its lifecycle.
///
/// Created once at startup and handed to the UI layer. Readers take
/// snapshots or subscribe for change notifications; only the four lifecycle
/// operations write. Every write replaces the whole `SessionState`.
pub struct SessionStore {
    api: ApiClient,
    storage: Arc<dyn SecretStore>,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new(api: ApiClient, storage: Arc<dyn SecretStore>) -> Self {
        let (state, _) = watch::channel(SessionState::restoring());
        Self {
            api,
            storage,
            state,
        }
    }

    // ===== Read access =====

    /// Copy of the latest committed state
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified after every committed change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn user(&self) -> Option<crate::models::User> {
        self.state.borrow().user().cloned()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_string)
    }

    /// API client carrying the current session's token, for domain calls.
    pub fn api(&self) -> ApiClient {
        match self.token() {
            Some(token) => self.api.with_token(token),
            None => self.api.clone(),
        }
    }

    // ===== Lifecycle =====

    /// Authenticate with email and password.
    ///
    /// On failure the session is left exactly as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let response = self.api.login(email, password).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            AuthError::from_api(e, LOGIN_FAILED)
        })?;
        self.establish(response, LOGIN_FAILED).await?;
        info!("Login successful");
        Ok(())
    }

    /// Create an account and sign in to it.
    ///
    /// On failure the session is left exactly as it was.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        organization_name: Option<&str>,
    ) -> Result<(), AuthError> {
        let response = self
            .api
            .register(email, password, name, organization_name)
            .await
            .map_err(|e| {
                warn!(error = %e, "Registration failed");
                AuthError::from_api(e, REGISTRATION_FAILED)
            })?;
        self.establish(response, REGISTRATION_FAILED).await?;
        info!("Registration successful");
        Ok(())
    }

    /// Forget the token and clear the session. Never fails; a storage error is
    /// logged and the session is cleared regardless.
    pub async fn logout(&self) {
        self.discard_token().await;
        self.state.send_modify(|state| state.set_data(None));
        info!("Logged out");
    }

    /// Restore-on-launch: re-establish the session from the persisted token.
    ///
    /// Any failure (token rejected, network down, storage unreadable) is
    /// treated as "not logged in": the token is deleted and the session ends
    /// up empty. Loading is finished in every case.
    pub async fn load_user(&self) {
        match self.restore().await {
            Ok(Some(data)) => {
                debug!(user_id = %data.user.id, "Session restored");
                self.state.send_modify(|state| {
                    state.set_data(Some(data));
                    state.finish_loading();
                });
            }
            Ok(None) => {
                debug!("No stored token");
                self.state.send_modify(SessionState::finish_loading);
            }
            Err(e) => {
                warn!(error = %e, "Stored token is no longer valid, discarding");
                self.discard_token().await;
                self.state.send_modify(|state| {
                    state.set_data(None);
                    state.finish_loading();
                });
            }
        }
    }

    async fn restore(&self) -> Result<Option<SessionData>> {
        let token = self
            .storage
            .get_item(TOKEN_KEY)
            .await
            .context("Failed to read stored token")?;

        let Some(token) = token else {
            return Ok(None);
        };

        let user = self
            .api
            .with_token(token.clone())
            .me()
            .await
            .context("Failed to fetch current user")?;

        Ok(Some(SessionData { user, token }))
    }

    /// Persist the new token, then commit the authenticated session.
    async fn establish(&self, response: TokenResponse, fallback: &str) -> Result<(), AuthError> {
        self.storage
            .set_item(TOKEN_KEY, &response.access_token)
            .await
            .map_err(|e| {
                warn!(error = %e, backend = self.storage.backend_name(), "Failed to persist token");
                AuthError::from_storage(e, fallback)
            })?;

        let data = SessionData {
            user: response.user,
            token: response.access_token,
        };
        self.state.send_modify(|state| state.set_data(Some(data)));
        Ok(())
    }

    async fn discard_token(&self) {
        if let Err(e) = self.storage.delete_item(TOKEN_KEY).await {
            warn!(error = %e, backend = self.storage.backend_name(), "Failed to delete stored token");
        }
    }
}
