pub mod auth0;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Tokens closer than this to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("identity provider is not configured")]
    NotConfigured,

    #[error("identity provider unreachable: {0}")]
    Transport(String),

    #[error("identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("login required")]
    LoginRequired,

    #[error("cannot {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Credentials {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - chrono::Duration::seconds(EXPIRY_SKEW_SECS) <= now
    }
}

/// A pending device-authorization login: the curator finishes it in a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLogin {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub interval: Duration,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginPoll {
    Pending,
    SlowDown,
    Complete(Credentials),
    Expired,
    Denied,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Begin a redirect-style login. The returned URL is where the curator goes.
    async fn start_login(&self) -> Result<DeviceLogin, AuthError>;
    async fn poll_login(&self, login: &DeviceLogin) -> Result<LoginPoll, AuthError>;
    /// Return a usable access token, refreshing it when the current one is stale.
    async fn token_silently(&self, credentials: &Credentials) -> Result<Credentials, AuthError>;
    fn logout_url(&self, return_to: &str) -> Result<String, AuthError>;
}

/// Per-curator authentication state. Only `Ready` lets data commands through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    Unauthenticated,
    /// The identity provider owns the flow from here until the login completes.
    Redirecting(DeviceLogin),
    AuthenticatedNoToken(Credentials),
    Ready(Credentials),
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Initial resolution: stored credentials, if any.
    Resolved(Option<Credentials>),
    LoginStarted(DeviceLogin),
    LoginCompleted(Credentials),
    TokenAcquired(Credentials),
    /// Silent retrieval failed, or the API rejected the token.
    TokenRejected,
    LoginAbandoned,
    LoggedOut,
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::Resolved(_) => "resolve session",
            SessionEvent::LoginStarted(_) => "start login",
            SessionEvent::LoginCompleted(_) => "complete login",
            SessionEvent::TokenAcquired(_) => "acquire token",
            SessionEvent::TokenRejected => "reject token",
            SessionEvent::LoginAbandoned => "abandon login",
            SessionEvent::LoggedOut => "log out",
        }
    }
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Redirecting(_) => "redirecting",
            SessionState::AuthenticatedNoToken(_) => "authenticated, waiting for token",
            SessionState::Ready(_) => "ready",
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            SessionState::Ready(creds) => Some(&creds.access_token),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.token().is_some()
    }

    pub fn apply(&mut self, event: SessionEvent) -> Result<(), AuthError> {
        let next = match (&*self, event) {
            (SessionState::Loading, SessionEvent::Resolved(None)) => SessionState::Unauthenticated,
            (SessionState::Loading, SessionEvent::Resolved(Some(creds))) => {
                SessionState::AuthenticatedNoToken(creds)
            }
            (SessionState::Unauthenticated, SessionEvent::LoginStarted(login)) => {
                SessionState::Redirecting(login)
            }
            (SessionState::Redirecting(_), SessionEvent::LoginCompleted(creds)) => {
                SessionState::AuthenticatedNoToken(creds)
            }
            (SessionState::Redirecting(_), SessionEvent::LoginAbandoned) => {
                SessionState::Unauthenticated
            }
            (
                SessionState::AuthenticatedNoToken(_) | SessionState::Ready(_),
                SessionEvent::TokenAcquired(creds),
            ) => SessionState::Ready(creds),
            (
                SessionState::AuthenticatedNoToken(_) | SessionState::Ready(_),
                SessionEvent::TokenRejected,
            ) => SessionState::Unauthenticated,
            (_, SessionEvent::LoggedOut) => SessionState::Unauthenticated,
            (state, event) => {
                return Err(AuthError::InvalidTransition {
                    state: state.name(),
                    event: event.name(),
                })
            }
        };
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(token: &str) -> Credentials {
        Credentials {
            access_token: token.to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn login() -> DeviceLogin {
        DeviceLogin {
            device_code: "dc".to_string(),
            user_code: "ABCD-EFGH".to_string(),
            verification_uri: "https://tenant.auth0.com/activate".to_string(),
            interval: Duration::from_secs(5),
            expires_at: Utc::now() + chrono::Duration::minutes(15),
        }
    }

    #[test]
    fn test_login_path_to_ready() {
        let mut state = SessionState::default();
        state.apply(SessionEvent::Resolved(None)).unwrap();
        assert_eq!(state, SessionState::Unauthenticated);
        state.apply(SessionEvent::LoginStarted(login())).unwrap();
        assert_eq!(state.name(), "redirecting");
        assert!(state.token().is_none());
        state.apply(SessionEvent::LoginCompleted(creds("a"))).unwrap();
        assert_eq!(state.name(), "authenticated, waiting for token");
        state.apply(SessionEvent::TokenAcquired(creds("a"))).unwrap();
        assert_eq!(state.token(), Some("a"));
    }

    #[test]
    fn test_known_credentials_skip_login() {
        let mut state = SessionState::default();
        state.apply(SessionEvent::Resolved(Some(creds("a")))).unwrap();
        state.apply(SessionEvent::TokenAcquired(creds("b"))).unwrap();
        assert_eq!(state.token(), Some("b"));
    }

    #[test]
    fn test_token_requires_authentication() {
        let mut state = SessionState::Unauthenticated;
        let err = state.apply(SessionEvent::TokenAcquired(creds("a"))).unwrap_err();
        assert_eq!(
            err,
            AuthError::InvalidTransition {
                state: "unauthenticated",
                event: "acquire token"
            }
        );
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[test]
    fn test_rejected_token_returns_to_login() {
        let mut state = SessionState::Ready(creds("a"));
        state.apply(SessionEvent::TokenRejected).unwrap();
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[test]
    fn test_logout_from_anywhere() {
        for mut state in [
            SessionState::Loading,
            SessionState::Redirecting(login()),
            SessionState::Ready(creds("a")),
        ] {
            state.apply(SessionEvent::LoggedOut).unwrap();
            assert_eq!(state, SessionState::Unauthenticated);
        }
    }

    #[test]
    fn test_expiry_skew() {
        let now = Utc::now();
        let mut c = creds("a");
        c.expires_at = now + chrono::Duration::seconds(30);
        assert!(c.is_expired(now));
        c.expires_at = now + chrono::Duration::seconds(600);
        assert!(!c.is_expired(now));
    }
}
