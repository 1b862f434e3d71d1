//! Authentication against the scheduler service.
//!
//! Two methods are supported:
//! 1. `password` - exchanges a username/password pair for an access token
//! 2. `access_token` - accepts a pre-issued access token as-is
//!
//! Either way the email is read from the token claims, the numeric user id
//! is looked up from the user details endpoint, and a [`Session`] is built
//! around a fresh [`UserState`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::AppConfig;
use crate::endpoints::Endpoints;
use crate::http;
use crate::session::Session;
use crate::state::{SharedUserState, UserId, UserState};
use crate::token::{self, TokenError};
use crate::CoreError;

/// Errors that abort authentication.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// No host was given.
    #[error("Host must be specified.")]
    MissingHost,

    /// No authentication method was given.
    #[error("Authentication method must be specified.")]
    MissingMethod,

    /// Password authentication without a username or password.
    #[error("Username and password are required for password authentication.")]
    MissingCredentials,

    /// Token authentication without a token.
    #[error("Access token is required for token authentication.")]
    MissingAccessToken,

    /// The method name is not one of `password` or `access_token`.
    #[error("Unsupported authentication method: {0}")]
    UnsupportedMethod(String),

    /// The token endpoint could not be reached or refused the credentials.
    #[error("Failed to obtain access token: {0}")]
    TokenRequest(#[source] CoreError),

    /// The access token could not be decoded or carries no email.
    #[error("Error extracting email: {0}")]
    Token(#[from] TokenError),
}

/// Supported authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Username and password exchanged at the token endpoint.
    Password,
    /// A pre-issued access token.
    AccessToken,
}

impl AuthMethod {
    /// Wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::AccessToken => "access_token",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = AuthenticationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(Self::Password),
            "access_token" => Ok(Self::AccessToken),
            other => Err(AuthenticationError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Parameters for [`Authenticator::authenticate`].
///
/// All fields are optional so that validation can report exactly what is
/// missing; empty strings count as missing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthParams {
    /// Base URL of the scheduler service.
    pub host: Option<String>,
    /// `password` or `access_token`.
    pub method: Option<String>,
    /// Login email for the password method.
    pub username: Option<String>,
    /// Password for the password method.
    pub password: Option<String>,
    /// Pre-issued token for the `access_token` method.
    pub access_token: Option<String>,
}

impl AuthParams {
    /// Parameters for password authentication.
    #[must_use]
    pub fn password(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: Some(host.into()),
            method: Some(AuthMethod::Password.to_string()),
            username: Some(username.into()),
            password: Some(password.into()),
            access_token: None,
        }
    }

    /// Parameters for access-token authentication.
    #[must_use]
    pub fn access_token(host: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            method: Some(AuthMethod::AccessToken.to_string()),
            username: None,
            password: None,
            access_token: Some(access_token.into()),
        }
    }
}

impl fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("AuthParams")
            .field("host", &self.host)
            .field("method", &self.method)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

/// Exchanges credentials for an authenticated [`Session`].
#[derive(Debug, Clone)]
pub struct Authenticator {
    http_client: Client,
    endpoints: Endpoints,
}

impl Authenticator {
    /// Create an authenticator with the default endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(Client::new(), Endpoints::default())
    }

    /// Create an authenticator with explicit HTTP client and endpoints.
    #[must_use]
    pub const fn with_client(http_client: Client, endpoints: Endpoints) -> Self {
        Self {
            http_client,
            endpoints,
        }
    }

    /// Create an authenticator from application configuration.
    ///
    /// Uses the configured endpoints and, if set, the request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.runtime.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder
            .build()
            .map_err(|e| CoreError::Other(format!("creating HTTP client: {e}")))?;

        Ok(Self::with_client(http_client, config.endpoints.clone()))
    }

    /// Endpoint paths used by this authenticator.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Authenticate and build a session.
    ///
    /// Parameters are validated in order: host, method, then the
    /// method-specific credentials. A failed user id lookup is not fatal;
    /// the session is returned with no user id.
    ///
    /// # Errors
    ///
    /// Returns an error if a required parameter is missing, the method is
    /// unsupported, the token endpoint fails, or the token carries no email.
    pub async fn authenticate(&self, params: &AuthParams) -> Result<Session, AuthenticationError> {
        let host = present(params.host.as_ref()).ok_or(AuthenticationError::MissingHost)?;
        let method = present(params.method.as_ref()).ok_or(AuthenticationError::MissingMethod)?;

        let mut state = UserState::new();

        let access_token = match method.parse::<AuthMethod>()? {
            AuthMethod::Password => {
                let (Some(username), Some(password)) = (
                    present(params.username.as_ref()),
                    present(params.password.as_ref()),
                ) else {
                    return Err(AuthenticationError::MissingCredentials);
                };

                let access_token = self
                    .request_token(host, username, password)
                    .await
                    .map_err(AuthenticationError::TokenRequest)?;
                state.username = Some(username.to_string());
                access_token
            }
            AuthMethod::AccessToken => present(params.access_token.as_ref())
                .ok_or(AuthenticationError::MissingAccessToken)?
                .to_string(),
        };

        let email = token::extract_email(&access_token)?;
        log::debug!("authenticated as {email} via {method}");

        state.user_id = self.resolve_user_id(host, &access_token, &email).await;
        state.access_token = Some(access_token);
        state.email = Some(email);

        Ok(Session::with_client(
            host,
            SharedUserState::new(state),
            self.endpoints.clone(),
            self.http_client.clone(),
        ))
    }

    /// Look up the user id for an email.
    ///
    /// Failures are logged and yield `None`.
    pub async fn resolve_user_id(
        &self,
        host: &str,
        access_token: &str,
        email: &str,
    ) -> Option<UserId> {
        match self.request_user_id(host, access_token, email).await {
            Ok(user_id) => user_id,
            Err(e) => {
                log::warn!("could not resolve user id for {email}: {e}");
                None
            }
        }
    }

    async fn request_token(
        &self,
        host: &str,
        username: &str,
        password: &str,
    ) -> Result<String, CoreError> {
        let url = http::join_url(host, &self.endpoints.token);
        let body = json!({ "email": username, "password": password });

        let data = http::post_json(&self.http_client, &url, None, &body, "token").await?;

        data.get("accessToken")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CoreError::Api("missing accessToken in token response".to_string()))
    }

    async fn request_user_id(
        &self,
        host: &str,
        access_token: &str,
        email: &str,
    ) -> Result<Option<UserId>, CoreError> {
        let url = http::join_url(host, &self.endpoints.user_details);
        let body = json!({ "emailId": email });

        let data =
            http::post_json(&self.http_client, &url, Some(access_token), &body, "user details")
                .await?;

        data.get("userId")
            .filter(|id| !id.is_null())
            .map(|id| serde_json::from_value(id.clone()))
            .transpose()
            .map_err(|e| CoreError::Serialization(format!("parsing userId: {e}")))
    }
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new()
    }
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "https://mock-host.com";

    fn params(host: Option<&str>, method: Option<&str>) -> AuthParams {
        AuthParams {
            host: host.map(str::to_string),
            method: method.map(str::to_string),
            username: Some("mock_user@example.com".to_string()),
            password: Some("mock_password".to_string()),
            access_token: None,
        }
    }

    async fn authenticate_err(params: &AuthParams) -> AuthenticationError {
        Authenticator::new()
            .authenticate(params)
            .await
            .expect_err("authentication should fail")
    }

    #[tokio::test]
    async fn missing_host_is_reported_first() {
        let err = authenticate_err(&params(None, None)).await;
        assert_eq!(err.to_string(), "Host must be specified.");

        let err = authenticate_err(&params(Some(""), Some("password"))).await;
        assert!(matches!(err, AuthenticationError::MissingHost));
    }

    #[tokio::test]
    async fn missing_method_is_reported() {
        let err = authenticate_err(&params(Some(HOST), None)).await;
        assert_eq!(err.to_string(), "Authentication method must be specified.");
    }

    #[tokio::test]
    async fn unsupported_method_names_the_method() {
        let err = authenticate_err(&params(Some(HOST), Some("invalid_method"))).await;
        assert_eq!(
            err.to_string(),
            "Unsupported authentication method: invalid_method"
        );
    }

    #[tokio::test]
    async fn password_method_requires_both_credentials() {
        let mut missing_password = params(Some(HOST), Some("password"));
        missing_password.password = Some(String::new());
        let err = authenticate_err(&missing_password).await;
        assert_eq!(
            err.to_string(),
            "Username and password are required for password authentication."
        );

        let mut missing_username = params(Some(HOST), Some("password"));
        missing_username.username = None;
        let err = authenticate_err(&missing_username).await;
        assert!(matches!(err, AuthenticationError::MissingCredentials));
    }

    #[tokio::test]
    async fn access_token_method_requires_a_token() {
        let err = authenticate_err(&params(Some(HOST), Some("access_token"))).await;
        assert_eq!(
            err.to_string(),
            "Access token is required for token authentication."
        );
    }

    #[tokio::test]
    async fn malformed_access_token_names_the_cause() {
        let err = authenticate_err(&AuthParams::access_token(HOST, "not-a-jwt")).await;
        assert!(matches!(err, AuthenticationError::Token(TokenError::InvalidFormat)));
        assert_eq!(err.to_string(), "Error extracting email: Invalid JWT token format.");
    }

    #[test]
    fn auth_method_parses_wire_names() {
        assert_eq!("password".parse::<AuthMethod>().ok(), Some(AuthMethod::Password));
        assert_eq!(
            "access_token".parse::<AuthMethod>().ok(),
            Some(AuthMethod::AccessToken)
        );
        assert!(matches!(
            "oauth".parse::<AuthMethod>(),
            Err(AuthenticationError::UnsupportedMethod(m)) if m == "oauth"
        ));
        assert_eq!(AuthMethod::AccessToken.to_string(), "access_token");
    }

    #[test]
    fn params_debug_hides_secrets() {
        let rendered = format!("{:?}", AuthParams::password(HOST, "me", "hunter2"));
        assert!(rendered.contains("mock-host.com"));
        assert!(!rendered.contains("hunter2"));

        let rendered = format!("{:?}", AuthParams::access_token(HOST, "secret.token.value"));
        assert!(!rendered.contains("secret.token.value"));
    }
}
