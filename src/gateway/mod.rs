//! Single-flight request gateway.
//!
//! Every backend call made by the portal clients passes through
//! [`RequestGateway`], which applies the cross-cutting rules uniformly:
//!
//! - **Authentication**: the current bearer token is attached as
//!   `Authorization: Bearer ...`; without a session the header is omitted
//! - **Deduplication**: identical reads (method, path, sorted query) issued
//!   within the dedup window share one network call and its outcome
//! - **Interception**: superseded requests become an empty success, a 403 on
//!   the statement endpoint becomes a soft failure, and any 401 ends the
//!   session through the [`SessionInterceptor`]
//!
//! Writes are never coalesced: two identical premium payments are two
//! payments.
//!
//! ## Usage
//!
//! ```ignore
//! let store = SessionStore::restore(Arc::new(FileStorage::new(&config.session_file)));
//! let gateway = RequestGateway::from_config(&config, store, Arc::new(LoggingNavigator))?;
//!
//! let funds = gateway.get("/fund", QueryParams::new()).await?;
//! ```

pub mod error;
pub mod interceptor;
pub mod registry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use http::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::session::SessionStore;
use crate::types::RoutePath;

pub use error::GatewayError;
pub use interceptor::{LoggingNavigator, Navigator, SessionInterceptor};
pub use registry::{InFlightRegistry, Lookup, RequestSignature};
pub use transport::{
    ApiRequest, ApiResponse, HttpTransport, QueryParams, RequestBody, ReqwestTransport,
};

/// Message used when a soft-failed statement response carries none.
pub const DEFAULT_SOFT_FAILURE_MESSAGE: &str = "Access denied for statement generation";

/// Pending result shared by every caller coalesced onto one read.
pub type SharedResponse = Shared<BoxFuture<'static, Result<ApiResponse, GatewayError>>>;

/// The choke point for all outbound backend calls.
///
/// Cheap to clone; clones share the registry, session and transport.
#[derive(Clone)]
pub struct RequestGateway {
    transport: Arc<dyn HttpTransport>,
    session: SessionStore,
    interceptor: SessionInterceptor,
    registry: InFlightRegistry<SharedResponse>,
    timeout: Duration,
    soft_failure_marker: String,
}

impl RequestGateway {
    /// Assemble a gateway around an explicit transport.
    pub fn new(
        config: &GatewayConfig,
        transport: Arc<dyn HttpTransport>,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let interceptor = SessionInterceptor::new(
            session.clone(),
            navigator,
            RoutePath::new(config.login_route.clone()),
        );

        Self {
            transport,
            session,
            interceptor,
            registry: InFlightRegistry::new(config.dedup_window(), config.release_grace()),
            timeout: config.request_timeout(),
            soft_failure_marker: config.soft_failure_marker.clone(),
        }
    }

    /// Gateway talking to `config.base_url` over reqwest.
    pub fn from_config(
        config: &GatewayConfig,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, GatewayError> {
        let transport = ReqwestTransport::new(&config.base_url)?;
        Ok(Self::new(config, Arc::new(transport), session, navigator))
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn interceptor(&self) -> &SessionInterceptor {
        &self.interceptor
    }

    /// Number of reads currently joinable.
    pub async fn in_flight(&self) -> usize {
        self.registry.len().await
    }

    /// Deduplicated read.
    pub async fn get(&self, path: &str, params: QueryParams) -> Result<ApiResponse, GatewayError> {
        let request = ApiRequest::new(Method::GET, path).with_query(params);
        let signature = RequestSignature::new(&request.method, &request.path, &request.query);

        let pending = match self
            .registry
            .lookup_or_register(signature.clone(), || self.dispatch_shared(request))
            .await
        {
            Lookup::Joined(pending) => {
                debug!("Joining in-flight request {}", signature);
                pending
            }
            Lookup::Registered { pending, id } => {
                // Drives the call to completion even if every caller goes
                // away, then releases the entry after the grace delay.
                let registry = self.registry.clone();
                let settle = pending.clone();
                tokio::spawn(async move {
                    let _ = settle.await;
                    registry.release(signature, id);
                });
                pending
            }
        };

        pending.await
    }

    pub async fn post(&self, path: &str, body: RequestBody) -> Result<ApiResponse, GatewayError> {
        self.execute(ApiRequest::new(Method::POST, path).with_body(body))
            .await
    }

    pub async fn put(&self, path: &str, body: RequestBody) -> Result<ApiResponse, GatewayError> {
        self.execute(ApiRequest::new(Method::PUT, path).with_body(body))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, GatewayError> {
        self.execute(ApiRequest::new(Method::DELETE, path)).await
    }

    /// Send an arbitrary request.
    ///
    /// Only plain GETs (no body, no caller headers) are deduplicated; the
    /// signature does not cover headers, so anything else goes straight out.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        if request.method == Method::GET
            && matches!(request.body, RequestBody::Empty)
            && request.headers.is_empty()
        {
            self.get(&request.path, request.query).await
        } else {
            self.execute(request).await
        }
    }

    fn dispatch_shared(&self, request: ApiRequest) -> SharedResponse {
        let gateway = self.clone();
        async move { gateway.execute(request).await }
            .boxed()
            .shared()
    }

    /// Authorize, send with timeout, and intercept the outcome.
    async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let credentials = self.session.credentials().await;
        if let Some(token) = &credentials.token {
            request.authorize(token)?;
        }

        let request_id = Uuid::new_v4();
        let method = request.method.clone();
        let path = request.path.clone();
        debug!(
            %request_id,
            %method,
            path = %path,
            authenticated = credentials.token.is_some(),
            "Dispatching request"
        );

        let outcome = match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        };

        if let Ok(response) = &outcome {
            debug!(%request_id, status = %response.status(), "Response received");
        }

        self.intercept(&path, credentials.epoch, outcome).await
    }

    async fn intercept(
        &self,
        path: &str,
        epoch: u64,
        outcome: Result<ApiResponse, GatewayError>,
    ) -> Result<ApiResponse, GatewayError> {
        let response = match outcome {
            Ok(response) => response,
            Err(GatewayError::Cancelled) => {
                debug!("Duplicate request cancelled, ignoring");
                return Ok(ApiResponse::empty());
            }
            Err(e) => return Err(e),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::FORBIDDEN && path.contains(&self.soft_failure_marker) {
            let body = response.value();
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_SOFT_FAILURE_MESSAGE);
            debug!("Downgrading 403 on {} to a soft failure", path);
            return Ok(ApiResponse::soft_failure(message));
        }

        if status == StatusCode::UNAUTHORIZED {
            self.interceptor.on_unauthorized(epoch).await;
            return Err(GatewayError::Unauthorized {
                body: response.value(),
            });
        }

        Err(GatewayError::Status {
            status,
            body: response.value(),
        })
    }
}
