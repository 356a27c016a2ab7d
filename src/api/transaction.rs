use serde::Deserialize;

use crate::api::ActionResult;
use crate::gateway::{GatewayError, QueryParams, RequestBody, RequestGateway};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub transaction_id: Option<i64>,
    #[serde(default)]
    pub id: Option<i64>,
    pub policy_id: i64,
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub fund_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InvestRequest {
    pub policy_id: i64,
    pub amount: f64,
    pub fund_id: i64,
}

#[derive(Debug, Clone)]
pub struct FundSwitchRequest {
    pub policy_id: i64,
    pub from_fund_id: i64,
    pub to_fund_id: i64,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvestResponse {
    pub success: bool,
    pub transaction_id: Option<i64>,
    pub requires_approval: Option<bool>,
}

#[derive(Clone)]
pub struct TransactionApi {
    gateway: RequestGateway,
}

impl TransactionApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub async fn invest(&self, request: &InvestRequest) -> Result<InvestResponse, GatewayError> {
        let body = RequestBody::form([
            ("policyId", request.policy_id.to_string()),
            ("amount", request.amount.to_string()),
            ("fundId", request.fund_id.to_string()),
        ]);
        self.gateway.post("/transaction/invest", body).await?.json()
    }

    pub async fn fund_switch(&self, request: &FundSwitchRequest) -> Result<ActionResult, GatewayError> {
        let body = RequestBody::form([
            ("policyId", request.policy_id.to_string()),
            ("fromFundId", request.from_fund_id.to_string()),
            ("toFundId", request.to_fund_id.to_string()),
            ("amount", request.amount.to_string()),
        ]);
        self.gateway.post("/transaction/fund-switch", body).await?.json()
    }

    pub async fn by_policy(&self, policy_id: i64) -> Result<Vec<Transaction>, GatewayError> {
        self.gateway
            .get(
                &format!("/transaction/by-policy/{}/transactions", policy_id),
                QueryParams::new(),
            )
            .await?
            .json()
    }

    pub async fn request_approval(&self, transaction_id: i64) -> Result<ActionResult, GatewayError> {
        self.gateway
            .post(
                &format!("/transaction/{}/request-approval", transaction_id),
                RequestBody::Empty,
            )
            .await?
            .json()
    }
}
