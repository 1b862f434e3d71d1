//! Authenticated session handle.

use reqwest::Client;

use crate::endpoints::Endpoints;
use crate::http;
use crate::scheduler::Scheduler;
use crate::state::SharedUserState;

/// Pairing of a service host with an authenticated user state.
///
/// A session holds the same [`SharedUserState`] produced by authentication;
/// it never copies it. Cloning a session is cheap and keeps that sharing.
#[derive(Debug, Clone)]
pub struct Session {
    host: String,
    user_state: SharedUserState,
    endpoints: Endpoints,
    http_client: Client,
}

impl Session {
    /// Create a session over an existing state with the default endpoints.
    #[must_use]
    pub fn new(host: impl Into<String>, user_state: SharedUserState) -> Self {
        Self::with_client(host, user_state, Endpoints::default(), Client::new())
    }

    /// Create a session with explicit endpoints and HTTP client.
    #[must_use]
    pub fn with_client(
        host: impl Into<String>,
        user_state: SharedUserState,
        endpoints: Endpoints,
        http_client: Client,
    ) -> Self {
        Self {
            host: host.into(),
            user_state,
            endpoints,
            http_client,
        }
    }

    /// The host exactly as given at authentication.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The shared user state of this session.
    #[must_use]
    pub const fn user_state(&self) -> &SharedUserState {
        &self.user_state
    }

    /// Endpoint paths used by this session.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// A new scheduler bound to this session.
    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.clone())
    }

    /// Full URL for an endpoint path on this session's host.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        http::join_url(&self.host, path)
    }

    pub(crate) const fn http_client(&self) -> &Client {
        &self.http_client
    }
}
