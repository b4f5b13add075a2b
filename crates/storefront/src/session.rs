//! Session provider handle.
//!
//! Authentication and session issuance live outside this crate; the core
//! only consumes the current identity and a change-notification stream. The
//! [`SessionProvider`] is the process-wide handle the embedding application
//! drives (`sign_in`/`sign_out`) and the services read.
//!
//! A cart belongs to exactly one identity, so every identity change must be
//! followed by a wholesale projection reset - see
//! [`StoreContext::session_changed`](crate::state::StoreContext::session_changed).

use secrecy::SecretString;
use tokio::sync::watch;

use maison_core::UserId;

/// An authenticated session issued by the external identity provider.
///
/// Carries the bearer token the gateway expects on user-scoped calls.
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct AuthSession {
    /// Identity of the signed-in user.
    pub user_id: UserId,
    access_token: SecretString,
}

impl AuthSession {
    /// Create a session from an identity and its bearer token.
    #[must_use]
    pub const fn new(user_id: UserId, access_token: SecretString) -> Self {
        Self {
            user_id,
            access_token,
        }
    }

    /// The bearer token for gateway calls.
    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.access_token
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Read handle over the current identity, with change notifications.
#[derive(Debug)]
pub struct SessionProvider {
    tx: watch::Sender<Option<AuthSession>>,
}

impl SessionProvider {
    /// Create a provider in the anonymous state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// The current session, if a user is signed in.
    #[must_use]
    pub fn current(&self) -> Option<AuthSession> {
        self.tx.borrow().clone()
    }

    /// The current user identity, if a user is signed in.
    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        self.tx.borrow().as_ref().map(|s| s.user_id)
    }

    /// Subscribe to identity changes (sign-in, sign-out, user switch).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.tx.subscribe()
    }

    /// Install a new authenticated session.
    pub fn sign_in(&self, session: AuthSession) {
        self.tx.send_replace(Some(session));
    }

    /// Return to the anonymous state.
    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session() -> AuthSession {
        AuthSession::new(
            UserId::new(Uuid::new_v4()),
            SecretString::from("token".to_string()),
        )
    }

    #[test]
    fn test_starts_anonymous() {
        let provider = SessionProvider::new();
        assert!(provider.current().is_none());
        assert!(provider.current_user().is_none());
    }

    #[test]
    fn test_sign_in_and_out() {
        let provider = SessionProvider::new();
        let auth = session();
        provider.sign_in(auth.clone());
        assert_eq!(provider.current_user(), Some(auth.user_id));
        provider.sign_out();
        assert!(provider.current_user().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let provider = SessionProvider::new();
        let mut rx = provider.subscribe();
        provider.sign_in(session());
        rx.changed().await.expect("sender alive");
        assert!(rx.borrow().is_some());
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = AuthSession::new(
            UserId::new(Uuid::new_v4()),
            SecretString::from("super-private-token".to_string()),
        );
        let debug_output = format!("{auth:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-private-token"));
    }
}
