use serde::Deserialize;

use crate::api::ActionResult;
use crate::gateway::{GatewayError, QueryParams, RequestBody, RequestGateway};

#[derive(Debug, Clone)]
pub struct PayPremiumRequest {
    pub policy_id: i64,
    pub premium_amount: f64,
    pub payment_method: String,
    pub fund_id: i64,
    pub due_date: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverduePremium {
    pub policy_id: i64,
    pub holder_name: String,
    pub due_amount: f64,
    pub due_date: String,
    pub days_overdue: i64,
    pub contact: String,
    #[serde(default)]
    pub policy_number: Option<String>,
}

#[derive(Clone)]
pub struct PremiumApi {
    gateway: RequestGateway,
}

impl PremiumApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Pay a premium. Each call is a distinct payment and is never coalesced.
    pub async fn pay_premium(&self, request: &PayPremiumRequest) -> Result<ActionResult, GatewayError> {
        let body = RequestBody::form([
            ("PolicyId", request.policy_id.to_string()),
            ("FundId", request.fund_id.to_string()),
            ("PremiumAmount", request.premium_amount.to_string()),
            ("DueDate", request.due_date.clone()),
            ("PaymentMethod", request.payment_method.clone()),
        ]);
        self.gateway.post("/premium/pay", body).await?.json()
    }

    pub async fn overdue_premiums(&self) -> Result<Vec<OverduePremium>, GatewayError> {
        self.gateway
            .get("/premium/overdue", QueryParams::new())
            .await?
            .json()
    }

    pub async fn send_reminder(&self, policy_id: i64) -> Result<ActionResult, GatewayError> {
        self.gateway
            .post(&format!("/premium/{}/send-reminder", policy_id), RequestBody::Empty)
            .await?
            .json()
    }
}
