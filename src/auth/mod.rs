//! Session provider.
//!
//! The OAuth sign-in flow belongs to the external auth service; this module holds
//! the resulting identity and broadcasts every auth transition to subscribers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::errors::AppError;

/// The authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Bearer token for the remote store
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
}

impl User {
    /// Public handle derived from the email local part.
    pub fn handle(&self) -> String {
        self.email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn display_name(&self) -> String {
        self.full_name.clone().unwrap_or_else(|| self.handle())
    }
}

/// Holds the current session and notifies subscribers of transitions.
#[derive(Clone)]
pub struct SessionHub {
    tx: Arc<watch::Sender<Option<User>>>,
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHub {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// The signed-in user, if any.
    pub fn current(&self) -> Option<User> {
        self.tx.borrow().clone()
    }

    /// The signed-in user or an `Unauthorized` error.
    pub fn require_user(&self) -> Result<User, AppError> {
        self.current()
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))
    }

    /// Record a completed sign-in.
    pub fn sign_in(&self, user: User) {
        tracing::info!("Signed in as {}", user.id);
        self.tx.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        if self.tx.send_replace(None).is_some() {
            tracing::info!("Signed out");
        }
    }

    /// Subscribe to auth transitions. Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

/// A live subscription to session changes.
pub struct SessionSubscription {
    rx: watch::Receiver<Option<User>>,
}

impl SessionSubscription {
    /// The identity as of the last observed transition.
    pub fn current(&self) -> Option<User> {
        self.rx.borrow().clone()
    }

    /// Whether a transition happened since the last `changed`/`take_change`.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Consume a pending transition without waiting.
    pub fn take_change(&mut self) -> Option<Option<User>> {
        if self.has_changed() {
            Some(self.rx.borrow_and_update().clone())
        } else {
            None
        }
    }

    /// Wait for the next transition; `None` once the hub is gone.
    pub async fn changed(&mut self) -> Option<Option<User>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
pub(crate) fn test_user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        full_name: None,
        avatar_url: None,
        access_token: None,
    }
}
