//! Session and user identity value types.

use crate::types::{BearerToken, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated user descriptor as persisted under `auth_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    /// Build a user from the login response's single `username` field.
    ///
    /// The first whitespace-separated word becomes the first name and the
    /// remainder the last name.
    pub fn from_username(user_id: i64, username: &str, email: &str, role: UserRole) -> Self {
        let mut parts = username.split_whitespace();
        let first_name = parts.next().unwrap_or_default().to_string();
        let last_name = parts.collect::<Vec<_>>().join(" ");

        Self {
            user_id,
            first_name,
            last_name,
            email: email.to_string(),
            role,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Client-held authentication state for one login.
///
/// A session always carries a token; the anonymous state is represented by
/// the absence of a session in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token: BearerToken,
    user: Option<AuthUser>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(token: BearerToken, user: Option<AuthUser>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token,
            user,
            expires_at,
        }
    }

    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<UserRole> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the recorded expiry has passed. Sessions without an expiry
    /// never report as expired; the backend remains the authority.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Get a display-friendly name for this session's user.
    pub fn display(&self) -> String {
        match &self.user {
            Some(user) => {
                let name = user.display_name();
                if name.is_empty() { user.email.clone() } else { name }
            }
            None => "Unknown user".to_string(),
        }
    }
}

/// Observable state of the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Anonymous => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_user() -> AuthUser {
        AuthUser::from_username(42, "Asha Rani Verma", "asha@example.com", UserRole::Customer)
    }

    #[test]
    fn test_from_username_splits_name() {
        let user = test_user();
        assert_eq!(user.first_name, "Asha");
        assert_eq!(user.last_name, "Rani Verma");
        assert_eq!(user.display_name(), "Asha Rani Verma");

        let single = AuthUser::from_username(1, "Ravi", "ravi@example.com", UserRole::Agent);
        assert_eq!(single.first_name, "Ravi");
        assert_eq!(single.last_name, "");
        assert_eq!(single.display_name(), "Ravi");
    }

    #[test]
    fn test_auth_user_uses_camel_case() {
        let json = serde_json::to_value(test_user()).unwrap();
        assert_eq!(json["userId"], 42);
        assert_eq!(json["firstName"], "Asha");
        assert_eq!(json["role"], "Customer");
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session::new(
            BearerToken::new("t"),
            Some(test_user()),
            Some(now - Duration::minutes(1)),
        );
        assert!(session.is_expired_at(now));

        let open_ended = Session::new(BearerToken::new("t"), None, None);
        assert!(!open_ended.is_expired_at(now));
    }

    #[test]
    fn test_session_display() {
        let session = Session::new(BearerToken::new("t"), Some(test_user()), None);
        assert_eq!(session.display(), "Asha Rani Verma");
        assert_eq!(session.role(), Some(UserRole::Customer));

        let nameless = AuthUser::from_username(7, "", "x@example.com", UserRole::Admin);
        let session = Session::new(BearerToken::new("t"), Some(nameless), None);
        assert_eq!(session.display(), "x@example.com");

        let tokenonly = Session::new(BearerToken::new("t"), None, None);
        assert_eq!(tokenonly.display(), "Unknown user");
        assert_eq!(tokenonly.role(), None);
    }
}
