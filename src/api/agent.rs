use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::api::ActionResult;
use crate::gateway::{GatewayError, QueryParams, RequestBody, RequestGateway};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub sale_id: Option<i64>,
    pub agent_id: i64,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub policy_id: Option<i64>,
    #[serde(default)]
    pub policy_name: Option<String>,
    #[serde(default)]
    pub quoted_amount: Option<f64>,
    #[serde(default)]
    pub premium_amount: Option<f64>,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateLeadRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub quoted_amount: f64,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct CreateProposalRequest {
    pub customer_id: i64,
    pub policy_name: String,
    pub sum_assured: f64,
    pub premium_amount: f64,
    pub premium_frequency: String,
    pub policy_start_date: String,
    pub policy_maturity_date: String,
}

#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub request_id: i64,
    pub request_type: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDashboard {
    #[serde(default)]
    pub pipeline: Vec<Lead>,
    #[serde(default)]
    pub conversion_rate: f64,
    #[serde(default)]
    pub total_commission: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversionRate {
    conversion_rate: f64,
}

#[derive(Clone)]
pub struct AgentApi {
    gateway: RequestGateway,
}

impl AgentApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub async fn pipeline(&self) -> Result<Vec<Lead>, GatewayError> {
        self.gateway
            .get("/sale/my-pipeline", QueryParams::new())
            .await?
            .json()
    }

    pub async fn conversion_rate(&self) -> Result<f64, GatewayError> {
        let rate: ConversionRate = self
            .gateway
            .get("/sale/conversion-rate", QueryParams::new())
            .await?
            .json()?;
        Ok(rate.conversion_rate)
    }

    pub async fn create_lead(&self, request: &CreateLeadRequest) -> Result<Lead, GatewayError> {
        let body = RequestBody::form([
            ("CustomerName", request.customer_name.clone()),
            ("CustomerPhone", request.customer_phone.clone()),
            ("QuotedAmount", request.quoted_amount.to_string()),
            ("Notes", request.notes.clone()),
        ]);
        self.gateway.post("/sale/lead", body).await?.json()
    }

    /// Convert a lead into a policy. Field names are passed through as given.
    pub async fn convert_lead(
        &self,
        sale_id: i64,
        policy_fields: &BTreeMap<String, String>,
    ) -> Result<ActionResult, GatewayError> {
        let body = RequestBody::form(policy_fields.iter().map(|(k, v)| (k.clone(), v)));
        self.gateway
            .post(&format!("/sale/{}/convert", sale_id), body)
            .await?
            .json()
    }

    pub async fn agent_policies(&self) -> Result<Vec<Value>, GatewayError> {
        self.gateway
            .get("/policy/agent-policies", QueryParams::new())
            .await?
            .json()
    }

    pub async fn create_policy_proposal(
        &self,
        request: &CreateProposalRequest,
    ) -> Result<Value, GatewayError> {
        let body = RequestBody::form([
            ("CustomerId", request.customer_id.to_string()),
            ("PolicyName", request.policy_name.clone()),
            ("SumAssured", request.sum_assured.to_string()),
            ("PremiumAmount", request.premium_amount.to_string()),
            ("PremiumFrequency", request.premium_frequency.clone()),
            ("PolicyStartDate", request.policy_start_date.clone()),
            ("PolicyMaturityDate", request.policy_maturity_date.clone()),
        ]);
        self.gateway
            .post("/Policy/create-proposal", body)
            .await
            .map(|response| response.value())
    }

    pub async fn submit_approval_request(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ActionResult, GatewayError> {
        let body = RequestBody::form([
            ("RequestId", request.request_id.to_string()),
            ("RequestType", request.request_type.clone()),
            ("Reason", request.reason.clone()),
        ]);
        self.gateway.post("/Approval/request", body).await?.json()
    }

    pub async fn dashboard_data(&self) -> Result<AgentDashboard, GatewayError> {
        self.gateway
            .get("/sale/dashboard-data", QueryParams::new())
            .await?
            .json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{MockTransport, form_fields, gateway_with};
    use http::{Method, StatusCode};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_dashboard_tolerates_missing_sections() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::GET,
            "/sale/dashboard-data",
            StatusCode::OK,
            json!({ "conversionRate": 0.35 }),
        );
        let dashboard = AgentApi::new(gateway_with(transport))
            .dashboard_data()
            .await
            .unwrap();

        assert!(dashboard.pipeline.is_empty());
        assert_eq!(dashboard.conversion_rate, 0.35);
        assert_eq!(dashboard.total_commission, 0.0);
    }

    #[tokio::test]
    async fn test_convert_lead_passes_fields_through() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Method::POST, "/sale/21/convert", StatusCode::OK, json!({ "success": true }));
        let mut fields = BTreeMap::new();
        fields.insert("PolicyName".to_string(), "Child Future".to_string());
        fields.insert("FundId".to_string(), "4".to_string());

        AgentApi::new(gateway_with(transport.clone()))
            .convert_lead(21, &fields)
            .await
            .unwrap();

        assert_eq!(
            form_fields(&transport.requests()[0]),
            vec![
                ("FundId".to_string(), "4".to_string()),
                ("PolicyName".to_string(), "Child Future".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_lead_decodes_lead() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            Method::POST,
            "/sale/lead",
            StatusCode::OK,
            json!({ "saleId": 30, "agentId": 2, "customerName": "Kiran", "status": "New" }),
        );
        let lead = AgentApi::new(gateway_with(transport))
            .create_lead(&CreateLeadRequest {
                customer_name: "Kiran".to_string(),
                customer_phone: "9800000000".to_string(),
                quoted_amount: 150000.0,
                notes: "Prefers balanced fund".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(lead.sale_id, Some(30));
        assert_eq!(lead.status, "New");
    }
}
