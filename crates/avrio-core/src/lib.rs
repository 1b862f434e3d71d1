//! Core library for avrio - a client for the Avrio job scheduler service.
//!
//! This crate provides:
//! - Password and access-token authentication
//! - An explicit, shareable user identity state and the session built on it
//! - Scheduler requests for listing and triggering jobs
//! - Configuration loading, XDG-compliant path resolution and schema generation
//!
//! ```no_run
//! # async fn run() -> Result<(), avrio_core::AuthenticationError> {
//! use avrio_core::{AuthParams, Authenticator};
//!
//! let params = AuthParams::password("https://avrio.example.com", "me@example.com", "secret");
//! let session = Authenticator::new().authenticate(&params).await?;
//! let jobs = session.scheduler().list_all("python_notebook").await;
//! # let _ = jobs;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod endpoints;
pub mod error;
mod http;
pub mod paths;
pub mod scheduler;
pub mod schema;
pub mod session;
pub mod state;
pub mod token;

pub use auth::{AuthMethod, AuthParams, AuthenticationError, Authenticator};
pub use config::{AppConfig, AuthConfig, LogLevel, LoggingConfig, RuntimeConfig, ServiceConfig};
pub use endpoints::Endpoints;
pub use error::{CoreError, Result};
pub use paths::{AppPaths, ConfigOrigin, default_config_dir};
pub use scheduler::{JobType, Scheduler, UnknownJobType};
pub use schema::{generate_example_config, generate_schema};
pub use session::Session;
pub use state::{SharedUserState, UserId, UserState};
pub use token::{TokenError, extract_email};

/// Application name used for config directories and environment prefix.
pub const APP_NAME: &str = "avrio";

/// Returns the environment variable prefix for this application.
#[must_use]
pub fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
