use serde::Deserialize;

use crate::gateway::{GatewayError, QueryParams, RequestBody, RequestGateway};
use crate::types::UserRole;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub total_commission_earned: Option<f64>,
    #[serde(default)]
    pub policies_sold: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub pan_number: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Commission {
    total_commission: f64,
}

#[derive(Clone)]
pub struct UserApi {
    gateway: RequestGateway,
}

impl UserApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub async fn profile(&self) -> Result<UserProfile, GatewayError> {
        self.gateway
            .get("/user/profile", QueryParams::new())
            .await?
            .json()
    }

    pub async fn update_profile(
        &self,
        request: &UpdateProfileRequest,
    ) -> Result<UserProfile, GatewayError> {
        let body = RequestBody::form([
            ("firstName", request.first_name.as_str()),
            ("lastName", request.last_name.as_str()),
            ("phoneNumber", request.phone_number.as_str()),
            ("address", request.address.as_str()),
        ]);
        self.gateway.put("/user/profile", body).await?.json()
    }

    pub async fn commission(&self) -> Result<f64, GatewayError> {
        let commission: Commission = self
            .gateway
            .get("/user/commission", QueryParams::new())
            .await?
            .json()?;
        Ok(commission.total_commission)
    }

    pub async fn all_users(&self) -> Result<Vec<User>, GatewayError> {
        self.gateway.get("/user", QueryParams::new()).await?.json()
    }

    pub async fn managers(&self) -> Result<Vec<Manager>, GatewayError> {
        let params = QueryParams::new().with("role", UserRole::Manager);
        self.gateway.get("/user/all", params).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{MockTransport, gateway_with};
    use http::{Method, StatusCode};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_managers_filters_by_role() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::GET,
            "/user/all",
            StatusCode::OK,
            json!([{ "userId": 5, "firstName": "Meera", "lastName": "Iyer", "email": "m@example.com" }]),
        );
        let managers = UserApi::new(gateway_with(transport.clone()))
            .managers()
            .await
            .unwrap();

        assert_eq!(managers[0].first_name, "Meera");
        let request = &transport.requests()[0];
        assert_eq!(request.query, QueryParams::new().with("role", "Manager"));
    }

    #[tokio::test]
    async fn test_commission_and_profile_share_gateway() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::GET,
            "/user/commission",
            StatusCode::OK,
            json!({ "totalCommission": 18250.75 }),
        );
        let users = UserApi::new(gateway_with(transport.clone()));

        let (a, b) = tokio::join!(users.commission(), users.commission());
        assert_eq!(a.unwrap(), 18250.75);
        assert_eq!(b.unwrap(), 18250.75);
        assert_eq!(transport.calls(Method::GET, "/user/commission"), 1);
    }

    #[tokio::test]
    async fn test_update_profile_uses_put() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::PUT,
            "/user/profile",
            StatusCode::OK,
            json!({
                "userId": 1, "firstName": "Asha", "lastName": "Verma",
                "email": "asha@example.com", "role": "Customer", "address": "Pune"
            }),
        );
        let profile = UserApi::new(gateway_with(transport))
            .update_profile(&UpdateProfileRequest {
                first_name: "Asha".to_string(),
                last_name: "Verma".to_string(),
                phone_number: "9000000000".to_string(),
                address: "Pune".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(profile.address.as_deref(), Some("Pune"));
    }
}
