use serde::Deserialize;

use crate::gateway::{GatewayError, QueryParams, RequestBody, RequestGateway};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fund {
    pub fund_id: i64,
    pub fund_name: String,
    pub fund_type: String,
    #[serde(rename = "currentNAV")]
    pub current_nav: f64,
    pub risk_level: String,
    #[serde(default)]
    pub expense_ratio: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateFundRequest {
    pub fund_name: String,
    pub fund_type: String,
    pub current_nav: f64,
    pub expense_ratio: f64,
    pub risk_level: String,
    pub description: String,
}

#[derive(Clone)]
pub struct FundApi {
    gateway: RequestGateway,
}

impl FundApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub async fn list_funds(&self) -> Result<Vec<Fund>, GatewayError> {
        self.gateway.get("/fund", QueryParams::new()).await?.json()
    }

    pub async fn create_fund(&self, request: &CreateFundRequest) -> Result<Fund, GatewayError> {
        let body = RequestBody::form([
            ("fundName", request.fund_name.clone()),
            ("fundType", request.fund_type.clone()),
            ("currentNAV", request.current_nav.to_string()),
            ("expenseRatio", request.expense_ratio.to_string()),
            ("riskLevel", request.risk_level.clone()),
            ("description", request.description.clone()),
        ]);
        self.gateway.post("/fund", body).await?.json()
    }

    pub async fn update_nav(&self, fund_id: i64, new_nav: f64) -> Result<Fund, GatewayError> {
        let body = RequestBody::form([("newNAV", new_nav.to_string())]);
        self.gateway
            .post(&format!("/fund/{}/update-nav", fund_id), body)
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

    fn fund_json(nav: f64) -> serde_json::Value {
        json!({
            "fundId": 3,
            "fundName": "Bluechip Equity",
            "fundType": "Equity",
            "currentNAV": nav,
            "riskLevel": "High"
        })
    }

    #[tokio::test]
    async fn test_list_funds_decodes_nav() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Method::GET, "/fund", StatusCode::OK, json!([fund_json(41.5)]));
        let funds = FundApi::new(gateway_with(transport)).list_funds().await.unwrap();

        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].fund_name, "Bluechip Equity");
        assert_eq!(funds[0].current_nav, 41.5);
        assert_eq!(funds[0].expense_ratio, None);
    }

    #[tokio::test]
    async fn test_update_nav_posts_form() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(Method::POST, "/fund/3/update-nav", StatusCode::OK, fund_json(42.25));
        let fund = FundApi::new(gateway_with(transport.clone()))
            .update_nav(3, 42.25)
            .await
            .unwrap();

        assert_eq!(fund.current_nav, 42.25);
        assert_eq!(
            form_fields(&transport.requests()[0]),
            vec![("newNAV".to_string(), "42.25".to_string())]
        );
    }
}
