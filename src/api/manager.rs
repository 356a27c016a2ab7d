use serde::Deserialize;

use crate::api::ActionResult;
use crate::gateway::{GatewayError, QueryParams, RequestBody, RequestGateway};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub approval_id: i64,
    pub request_id: i64,
    pub request_type: String,
    pub requested_by: i64,
    #[serde(default)]
    pub requested_by_name: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    pub status: String,
    pub requested_at: String,
    #[serde(default)]
    pub request_reason: Option<String>,
    #[serde(default)]
    pub approval_comments: Option<String>,
}

#[derive(Clone)]
pub struct ManagerApi {
    gateway: RequestGateway,
}

impl ManagerApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub async fn pending_approvals(&self) -> Result<Vec<Approval>, GatewayError> {
        self.gateway
            .get("/approval/pending", QueryParams::new())
            .await?
            .json()
    }

    pub async fn approve(&self, approval_id: i64, comments: Option<&str>) -> Result<ActionResult, GatewayError> {
        self.decide(approval_id, "approve", comments).await
    }

    pub async fn reject(&self, approval_id: i64, comments: Option<&str>) -> Result<ActionResult, GatewayError> {
        self.decide(approval_id, "reject", comments).await
    }

    async fn decide(
        &self,
        approval_id: i64,
        action: &str,
        comments: Option<&str>,
    ) -> Result<ActionResult, GatewayError> {
        let body = RequestBody::form([("comments", comments.unwrap_or_default())]);
        self.gateway
            .post(&format!("/approval/{}/{}", approval_id, action), body)
            .await?
            .json()
    }
}
