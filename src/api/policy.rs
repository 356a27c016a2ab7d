//! Policy lifecycle: proposals, details, surrender and statements.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::ActionResult;
use crate::api::transaction::Transaction;
use crate::gateway::{GatewayError, QueryParams, RequestBody, RequestGateway};

const STATEMENT_UNAVAILABLE: &str =
    "Unable to generate statement. Please ensure you have fund investments to generate a report.";

/// The backend reports policies with either `policyId` or `id`, and either
/// `policyStatus` or `status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default)]
    pub policy_id: Option<i64>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub policy_number: Option<String>,
    pub policy_name: String,
    pub sum_assured: f64,
    pub premium_amount: f64,
    #[serde(default)]
    pub premium_frequency: Option<String>,
    #[serde(default)]
    pub policy_start_date: Option<String>,
    #[serde(default)]
    pub policy_maturity_date: Option<String>,
    #[serde(default)]
    pub policy_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_value: Option<f64>,
}

impl Policy {
    pub fn key(&self) -> Option<i64> {
        self.policy_id.or(self.id)
    }

    pub fn current_status(&self) -> Option<&str> {
        self.policy_status.as_deref().or(self.status.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingProposal {
    pub id: i64,
    pub policy_id: i64,
    pub policy_name: String,
    pub sum_assured: f64,
    pub premium_amount: f64,
    pub premium_frequency: String,
    pub agent_name: String,
    pub created_date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptProposalRequest {
    pub policy_id: i64,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_documents: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurrenderRequest {
    pub policy_id: i64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurrenderValue {
    surrender_value: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteDetails {
    pub policy: Policy,
    pub surrender_value: f64,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Result of a statement request.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    /// The generated document, usually a PDF.
    Document {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    /// Expected business condition, e.g. nothing to report.
    Unavailable(String),
}

#[derive(Clone)]
pub struct PolicyApi {
    gateway: RequestGateway,
}

impl PolicyApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub async fn pending_proposals(&self) -> Result<Vec<PendingProposal>, GatewayError> {
        self.gateway
            .get("/policy/pending-proposals", QueryParams::new())
            .await?
            .json()
    }

    pub async fn accept_proposal(
        &self,
        request: &AcceptProposalRequest,
    ) -> Result<ActionResult, GatewayError> {
        self.post_json("/policy/accept", request).await
    }

    pub async fn my_policies(&self) -> Result<Vec<Policy>, GatewayError> {
        self.gateway
            .get("/policy/my-policies", QueryParams::new())
            .await?
            .json()
    }

    pub async fn policy_details(&self, policy_id: i64) -> Result<Policy, GatewayError> {
        self.post_json("/policy/details", &json!({ "policyId": policy_id }))
            .await
    }

    pub async fn surrender_value(&self, policy_id: i64) -> Result<f64, GatewayError> {
        let value: SurrenderValue = self
            .post_json("/policy/surrender-value", &json!({ "policyId": policy_id }))
            .await?;
        Ok(value.surrender_value)
    }

    pub async fn request_surrender(
        &self,
        request: &SurrenderRequest,
    ) -> Result<ActionResult, GatewayError> {
        self.post_json("/policy/surrender", request).await
    }

    pub async fn complete_details(&self, policy_id: i64) -> Result<CompleteDetails, GatewayError> {
        self.post_json("/policy/complete-details", &json!({ "policyId": policy_id }))
            .await
    }

    /// Request a policy statement.
    ///
    /// A soft failure from the gateway and a backend 500 (no investments to
    /// report) both come back as [`StatementOutcome::Unavailable`].
    pub async fn generate_statement(&self, policy_id: i64) -> Result<StatementOutcome, GatewayError> {
        let path = format!("/policy/{}/generate-statement", policy_id);
        let response = match self.gateway.post(&path, RequestBody::Empty).await {
            Ok(response) => response,
            Err(GatewayError::Status { status, .. }) if status.is_server_error() => {
                return Ok(StatementOutcome::Unavailable(STATEMENT_UNAVAILABLE.to_string()));
            }
            Err(e) => return Err(e),
        };

        if response.is_json() {
            let ack: ActionResult = response.json()?;
            if !ack.success {
                return Ok(StatementOutcome::Unavailable(
                    ack.message
                        .unwrap_or_else(|| STATEMENT_UNAVAILABLE.to_string()),
                ));
            }
        }

        Ok(StatementOutcome::Document {
            content_type: response.content_type().map(str::to_string),
            bytes: response.bytes().to_vec(),
        })
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        self.gateway
            .post(path, RequestBody::Json(body))
            .await?
            .json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{MockTransport, gateway_with};
    use crate::gateway::{ApiRequest, RequestBody};
    use http::{Method, StatusCode};
    use std::sync::Arc;

    fn json_body(request: &ApiRequest) -> serde_json::Value {
        match &request.body {
            RequestBody::Json(value) => value.clone(),
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_accept_proposal_sends_json() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Method::POST, "/policy/accept", StatusCode::OK, json!({ "success": true }));
        let api = PolicyApi::new(gateway_with(transport.clone()));

        let ack = api
            .accept_proposal(&AcceptProposalRequest {
                policy_id: 11,
                accepted: false,
                require_documents: None,
                rejection_reason: Some("Premium too high".to_string()),
            })
            .await
            .unwrap();

        assert!(ack.success);
        assert_eq!(
            json_body(&transport.requests()[0]),
            json!({ "policyId": 11, "accepted": false, "rejectionReason": "Premium too high" })
        );
    }

    #[tokio::test]
    async fn test_policy_accessors_handle_aliases() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::GET,
            "/policy/my-policies",
            StatusCode::OK,
            json!([{
                "id": 8,
                "policyName": "Wealth Builder",
                "sumAssured": 500000.0,
                "premiumAmount": 25000.0,
                "status": "Active"
            }]),
        );
        let policies = PolicyApi::new(gateway_with(transport)).my_policies().await.unwrap();

        assert_eq!(policies[0].key(), Some(8));
        assert_eq!(policies[0].current_status(), Some("Active"));
    }

    #[tokio::test]
    async fn test_statement_forbidden_is_unavailable() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::POST,
            "/policy/4/generate-statement",
            StatusCode::FORBIDDEN,
            json!({ "message": "Statement not permitted" }),
        );
        let api = PolicyApi::new(gateway_with(transport));

        assert_eq!(
            api.generate_statement(4).await.unwrap(),
            StatementOutcome::Unavailable("Statement not permitted".to_string())
        );
    }

    #[tokio::test]
    async fn test_statement_server_error_is_unavailable() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::POST,
            "/policy/5/generate-statement",
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({}),
        );
        let api = PolicyApi::new(gateway_with(transport));

        assert_eq!(
            api.generate_statement(5).await.unwrap(),
            StatementOutcome::Unavailable(STATEMENT_UNAVAILABLE.to_string())
        );
    }

    #[tokio::test]
    async fn test_surrender_value() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::POST,
            "/policy/surrender-value",
            StatusCode::OK,
            json!({ "surrenderValue": 182340.5 }),
        );
        let api = PolicyApi::new(gateway_with(transport));
        assert_eq!(api.surrender_value(2).await.unwrap(), 182340.5);
    }
}
