//! Login, registration and logout.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::gateway::{GatewayError, RequestBody, RequestGateway};
use crate::session::token::jwt_expiry;
use crate::session::{AuthUser, Session};
use crate::types::{BearerToken, UnknownRole, UserRole};

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub phone_number: String,
    pub date_of_birth: String,
    pub address: String,
    pub pan_number: String,
    pub role: UserRole,
}

/// Body of `/auth/login` and `/auth/register` responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthResponse {
    pub token: Option<String>,
    pub user_id: Option<i64>,
    pub role: Option<String>,
    pub username: Option<String>,
    pub success: Option<bool>,
    pub message: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthResponse {
    /// Build a session from a login response.
    ///
    /// Token, user id, role and username are all required. The expiry comes
    /// from the response when present, otherwise from the token's `exp`.
    pub fn into_session(self, email: &str) -> Result<Session, GatewayError> {
        let (Some(token), Some(user_id), Some(role), Some(username)) = (
            self.token.filter(|t| !t.is_empty()),
            self.user_id,
            self.role,
            self.username,
        ) else {
            return Err(GatewayError::InvalidResponse(
                self.message
                    .unwrap_or_else(|| "login response is missing credentials".to_string()),
            ));
        };

        let role: UserRole = role
            .parse()
            .map_err(|e: UnknownRole| GatewayError::InvalidResponse(e.to_string()))?;
        let expires_at = self.expires_at.or_else(|| jwt_expiry(&token));
        let user = AuthUser::from_username(user_id, &username, email, role);

        Ok(Session::new(BearerToken::new(token), Some(user), expires_at))
    }
}

#[derive(Clone)]
pub struct AuthApi {
    gateway: RequestGateway,
}

impl AuthApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Authenticate and start a session.
    ///
    /// The session is live in memory even if persisting it fails; the
    /// storage failure is still reported.
    pub async fn login(&self, request: &LoginRequest) -> Result<Session, GatewayError> {
        let body = RequestBody::form([
            ("Email", request.email.as_str()),
            ("Password", request.password.as_str()),
        ]);
        let response: AuthResponse = self.gateway.post("/auth/login", body).await?.json()?;
        let session = response.into_session(&request.email)?;

        self.gateway.session().login(session.clone()).await?;
        info!("Logged in as {} ({:?})", session.display(), session.role());
        Ok(session)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, GatewayError> {
        let body = RequestBody::form([
            ("Email", request.email.as_str()),
            ("Password", request.password.as_str()),
            ("ConfirmPassword", request.confirm_password.as_str()),
            ("FirstName", request.first_name.as_str()),
            ("LastName", request.last_name.as_str()),
            ("PhoneNumber", request.phone_number.as_str()),
            ("DateOfBirth", request.date_of_birth.as_str()),
            ("Address", request.address.as_str()),
            ("PanNumber", request.pan_number.as_str()),
            ("Role", request.role.as_str()),
        ]);
        self.gateway.post("/auth/register", body).await?.json()
    }

    pub async fn logout(&self) {
        self.gateway.session().logout().await;
    }
}
