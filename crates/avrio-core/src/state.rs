//! Authenticated user identity state.
//!
//! A [`UserState`] is an ordinary value: every authentication builds a fresh
//! one. Sessions and schedulers share it through a [`SharedUserState`]
//! handle, so a change made through one handle is seen by every other clone
//! of that handle and by no one else.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Server-side user identifier.
///
/// The service returns numbers, but textual ids are accepted as-is. Any
/// JSON number is kept exactly as received, including values outside `i64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// Numeric id, as returned by the user details endpoint.
    Numeric(Number),
    /// Any other textual id.
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self::Numeric(id.into())
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self::Numeric(id.into())
    }
}

impl From<Number> for UserId {
    fn from(id: Number) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Identity snapshot for one authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserState {
    /// Bearer token used for every authenticated call.
    pub access_token: Option<String>,
    /// Login name, only known for password authentication.
    pub username: Option<String>,
    /// Email claim decoded from the access token.
    pub email: Option<String>,
    /// Server user id; absent when the details lookup failed.
    pub user_id: Option<UserId>,
}

impl UserState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a token is held and its email has been derived.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.access_token.is_some() && self.email.is_some()
    }

    /// Reset every field to `None`.
    pub fn clear(&mut self) {
        self.access_token = None;
        self.username = None;
        self.email = None;
        self.user_id = None;
    }
}

/// Shared handle to a [`UserState`].
///
/// Cloning the handle aliases the same state. No consistency is promised
/// between a writer and concurrent readers beyond each call seeing a whole
/// state.
#[derive(Debug, Clone, Default)]
pub struct SharedUserState(Arc<RwLock<UserState>>);

impl SharedUserState {
    /// Wrap a state in a new handle.
    #[must_use]
    pub fn new(state: UserState) -> Self {
        Self(Arc::new(RwLock::new(state)))
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> UserState {
        self.read().clone()
    }

    /// Mutate the state in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut UserState) -> R) -> R {
        f(&mut self.write())
    }

    /// Reset every field of the shared state to `None`.
    pub fn clear(&self) {
        self.update(UserState::clear);
    }

    /// Current access token.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    /// Current username.
    #[must_use]
    pub fn username(&self) -> Option<String> {
        self.read().username.clone()
    }

    /// Current email.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.read().email.clone()
    }

    /// Current user id.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.read().user_id.clone()
    }

    /// Whether both handles point at the same state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn read(&self) -> RwLockReadGuard<'_, UserState> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserState> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<UserState> for SharedUserState {
    fn from(state: UserState) -> Self {
        Self::new(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> UserState {
        UserState {
            access_token: Some("mock_access_token".to_string()),
            username: Some("mock_user".to_string()),
            email: Some("mock_email@example.com".to_string()),
            user_id: Some(UserId::from(12345_i64)),
        }
    }

    #[test]
    fn new_state_is_empty() {
        let state = UserState::new();
        assert_eq!(state, UserState::default());
        assert!(!state.is_complete());
    }

    #[test]
    fn clear_resets_all_fields() {
        let mut state = populated();
        assert!(state.is_complete());

        state.clear();

        assert!(state.access_token.is_none());
        assert!(state.username.is_none());
        assert!(state.email.is_none());
        assert!(state.user_id.is_none());
    }

    #[test]
    fn independent_states_do_not_alias() {
        let first = SharedUserState::new(populated());
        let second = SharedUserState::new(populated());
        assert!(!first.ptr_eq(&second));

        first.clear();

        assert!(first.access_token().is_none());
        assert_eq!(second.access_token().as_deref(), Some("mock_access_token"));
    }

    #[test]
    fn clones_share_mutations() {
        let handle = SharedUserState::default();
        let alias = handle.clone();
        assert!(handle.ptr_eq(&alias));

        alias.update(|state| {
            state.access_token = Some("token".to_string());
            state.user_id = Some(UserId::from("mock_user_id"));
        });

        assert_eq!(handle.access_token().as_deref(), Some("token"));
        assert_eq!(handle.user_id(), Some(UserId::Text("mock_user_id".to_string())));

        handle.clear();
        assert_eq!(alias.snapshot(), UserState::default());
    }

    #[test]
    fn user_id_serializes_as_raw_value() {
        assert_eq!(serde_json::to_value(UserId::from(7_i64)).expect("json"), 7);
        assert_eq!(serde_json::to_value(UserId::from("u-7")).expect("json"), "u-7");
        assert_eq!(
            serde_json::to_value(None::<UserId>).expect("json"),
            serde_json::Value::Null
        );

        let parsed: UserId = serde_json::from_value(serde_json::json!(42)).expect("numeric");
        assert_eq!(parsed, UserId::from(42_i64));
        assert_eq!(parsed.to_string(), "42");
    }

    #[test]
    fn numeric_ids_outside_i64_keep_their_value() {
        for raw in ["18446744073709551615", "12.0"] {
            let parsed: UserId = serde_json::from_str(raw).expect("numeric id");
            assert!(matches!(parsed, UserId::Numeric(_)), "{raw}");
            assert_eq!(serde_json::to_string(&parsed).expect("json"), raw);
        }

        assert_eq!(UserId::from(u64::MAX).to_string(), "18446744073709551615");
    }
}
