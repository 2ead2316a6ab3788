use crate::models::User;

/// An authenticated user together with the bearer token that proves it.
///
/// Held as a pair so a session can never have one without the other.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    pub user: User,
    pub token: String,
}

/// Coarse session state, used to route between the loading screen, the
/// login form and the main views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Restoring,
    Unauthenticated,
    Authenticated,
}

/// Snapshot of the session as seen by the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    data: Option<SessionData>,
    is_loading: bool,
}

impl SessionState {
    /// Process-start state: empty, waiting for restore-on-launch.
    pub fn restoring() -> Self {
        Self {
            data: None,
            is_loading: true,
        }
    }

    pub fn data(&self) -> Option<&SessionData> {
        self.data.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.data.as_ref().map(|d| &d.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.token.as_str())
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.is_some()
    }

    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Restoring
        } else if self.is_authenticated() {
            Phase::Authenticated
        } else {
            Phase::Unauthenticated
        }
    }

    pub(crate) fn set_data(&mut self, data: Option<SessionData>) {
        self.data = data;
    }

    pub(crate) fn finish_loading(&mut self) {
        self.is_loading = false;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::restoring()
    }
}
