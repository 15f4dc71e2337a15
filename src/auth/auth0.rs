use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{AuthError, Credentials, DeviceLogin, IdentityProvider, LoginPoll};
use crate::config::AuthConfig;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const SCOPE: &str = "openid profile offline_access";

/// Auth0 tenant client: device authorization for login, refresh-token grant
/// for silent token retrieval.
pub struct Auth0Client {
    client: reqwest::Client,
    config: AuthConfig,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default)]
    verification_uri_complete: Option<String>,
    expires_in: i64,
    #[serde(default = "default_interval")]
    interval: u64,
}

fn default_interval() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl Auth0Client {
    pub fn new(config: AuthConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url(), path.trim_start_matches('/'))
    }

    fn ensure_configured(&self) -> Result<(), AuthError> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(AuthError::NotConfigured)
        }
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<(reqwest::StatusCode, String), AuthError> {
        let resp = self
            .client
            .post(self.endpoint(path))
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok((status, text))
    }
}

fn credentials_from(token: TokenResponse, previous_refresh: Option<&str>) -> Credentials {
    Credentials {
        access_token: token.access_token,
        // Auth0 omits the refresh token on refresh grants unless rotation is on.
        refresh_token: token
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string)),
        expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
    }
}

fn parse_oauth_error(text: &str) -> OAuthErrorResponse {
    serde_json::from_str(text).unwrap_or(OAuthErrorResponse {
        error: "unknown_error".to_string(),
        error_description: Some(text.to_string()),
    })
}

#[async_trait]
impl IdentityProvider for Auth0Client {
    async fn start_login(&self) -> Result<DeviceLogin, AuthError> {
        self.ensure_configured()?;
        let mut form = vec![("client_id", self.config.client_id.as_str()), ("scope", SCOPE)];
        if let Some(audience) = &self.config.audience {
            form.push(("audience", audience.as_str()));
        }

        let (status, text) = self.post_form("oauth/device/code", &form).await?;
        if !status.is_success() {
            let err = parse_oauth_error(&text);
            warn!(status = status.as_u16(), error = %err.error, "device code request rejected");
            return Err(AuthError::Rejected(
                err.error_description.unwrap_or(err.error),
            ));
        }
        let code: DeviceCodeResponse =
            serde_json::from_str(&text).map_err(|e| AuthError::Transport(e.to_string()))?;

        info!(verification_uri = %code.verification_uri, "device login started");
        Ok(DeviceLogin {
            device_code: code.device_code,
            user_code: code.user_code,
            verification_uri: code
                .verification_uri_complete
                .unwrap_or(code.verification_uri),
            interval: Duration::from_secs(code.interval),
            expires_at: Utc::now() + chrono::Duration::seconds(code.expires_in),
        })
    }

    async fn poll_login(&self, login: &DeviceLogin) -> Result<LoginPoll, AuthError> {
        self.ensure_configured()?;
        let form = [
            ("grant_type", DEVICE_CODE_GRANT),
            ("device_code", login.device_code.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];
        let (status, text) = self.post_form("oauth/token", &form).await?;
        if status.is_success() {
            let token: TokenResponse =
                serde_json::from_str(&text).map_err(|e| AuthError::Transport(e.to_string()))?;
            return Ok(LoginPoll::Complete(credentials_from(token, None)));
        }

        let err = parse_oauth_error(&text);
        debug!(error = %err.error, "device login poll");
        Ok(match err.error.as_str() {
            "authorization_pending" => LoginPoll::Pending,
            "slow_down" => LoginPoll::SlowDown,
            "expired_token" => LoginPoll::Expired,
            "access_denied" => LoginPoll::Denied,
            _ => return Err(AuthError::Rejected(err.error_description.unwrap_or(err.error))),
        })
    }

    async fn token_silently(&self, credentials: &Credentials) -> Result<Credentials, AuthError> {
        if !credentials.is_expired(Utc::now()) {
            return Ok(credentials.clone());
        }
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .ok_or(AuthError::LoginRequired)?;
        self.ensure_configured()?;

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        let (status, text) = self.post_form("oauth/token", &form).await?;
        if !status.is_success() {
            let err = parse_oauth_error(&text);
            warn!(error = %err.error, "silent token refresh rejected");
            return Err(AuthError::LoginRequired);
        }
        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|e| AuthError::Transport(e.to_string()))?;
        debug!("access token refreshed");
        Ok(credentials_from(token, Some(refresh_token)))
    }

    fn logout_url(&self, return_to: &str) -> Result<String, AuthError> {
        self.ensure_configured()?;
        let url = reqwest::Url::parse_with_params(
            &self.endpoint("v2/logout"),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("returnTo", return_to),
            ],
        )
        .map_err(|e| AuthError::Rejected(e.to_string()))?;
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Auth0Client {
        Auth0Client::new(
            AuthConfig {
                domain: "tenant.auth0.com".to_string(),
                client_id: "client-123".to_string(),
                audience: None,
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_logout_url_carries_return_to() {
        let url = client().logout_url("https://curator.example.org/").unwrap();
        assert_eq!(
            url,
            "https://tenant.auth0.com/v2/logout?client_id=client-123&returnTo=https%3A%2F%2Fcurator.example.org%2F"
        );
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token() {
        let token = TokenResponse {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_in: 3600,
        };
        let creds = credentials_from(token, Some("rt-1"));
        assert_eq!(creds.access_token, "new");
        assert_eq!(creds.refresh_token.as_deref(), Some("rt-1"));
        assert!(!creds.is_expired(Utc::now()));
    }

    #[test]
    fn test_parse_oauth_error_fallback() {
        let err = parse_oauth_error("<html>gateway timeout</html>");
        assert_eq!(err.error, "unknown_error");
        let err = parse_oauth_error(r#"{"error":"authorization_pending"}"#);
        assert_eq!(err.error, "authorization_pending");
    }

    #[tokio::test]
    async fn test_unconfigured_tenant_refuses_login() {
        let client = Auth0Client::new(
            AuthConfig {
                domain: String::new(),
                client_id: String::new(),
                audience: None,
            },
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(matches!(client.start_login().await, Err(AuthError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_valid_token_returned_without_network() {
        let creds = Credentials {
            access_token: "still-good".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        };
        let out = client().token_silently(&creds).await.unwrap();
        assert_eq!(out, creds);
    }
}
