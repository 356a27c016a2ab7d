//! Typed clients for the portal backend, one per domain.
//!
//! Every client is a thin wrapper over [`RequestGateway`]: reads go through
//! `get` and are deduplicated, writes go through `post`/`put`. Business rules
//! (underwriting, commissions, NAV, approvals) live in the backend; these
//! clients only shape requests and decode responses.

mod agent;
mod auth;
mod fund;
mod manager;
mod policy;
mod premium;
mod transaction;
mod user;

pub use agent::{AgentApi, AgentDashboard, ApprovalRequest, CreateLeadRequest, CreateProposalRequest, Lead};
pub use auth::{AuthApi, AuthResponse, LoginRequest, RegisterRequest};
pub use fund::{CreateFundRequest, Fund, FundApi};
pub use manager::{Approval, ManagerApi};
pub use policy::{
    AcceptProposalRequest, CompleteDetails, PendingProposal, Policy, PolicyApi, StatementOutcome,
    SurrenderRequest,
};
pub use premium::{OverduePremium, PayPremiumRequest, PremiumApi};
pub use transaction::{FundSwitchRequest, InvestRequest, InvestResponse, Transaction, TransactionApi};
pub use user::{Manager, UpdateProfileRequest, User, UserApi, UserProfile};

use serde::Deserialize;

use crate::gateway::RequestGateway;

/// Generic `{ success, message }` acknowledgement returned by write endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionResult {
    pub success: bool,
    pub message: Option<String>,
}

/// All domain clients over one shared gateway.
#[derive(Clone)]
pub struct PortalClient {
    pub auth: AuthApi,
    pub agent: AgentApi,
    pub funds: FundApi,
    pub manager: ManagerApi,
    pub policies: PolicyApi,
    pub premiums: PremiumApi,
    pub transactions: TransactionApi,
    pub users: UserApi,
    gateway: RequestGateway,
}

impl PortalClient {
    pub fn new(gateway: RequestGateway) -> Self {
        Self {
            auth: AuthApi::new(gateway.clone()),
            agent: AgentApi::new(gateway.clone()),
            funds: FundApi::new(gateway.clone()),
            manager: ManagerApi::new(gateway.clone()),
            policies: PolicyApi::new(gateway.clone()),
            premiums: PremiumApi::new(gateway.clone()),
            transactions: TransactionApi::new(gateway.clone()),
            users: UserApi::new(gateway.clone()),
            gateway,
        }
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }
}
