// Core modules
pub mod config;
pub mod gateway;
pub mod session;
pub mod types;

// Portal surface
pub mod api;
pub mod routes;

// Re-export key types and functions
pub use api::PortalClient;
pub use config::GatewayConfig;
pub use gateway::{
    ApiRequest, ApiResponse, GatewayError, HttpTransport, LoggingNavigator, Navigator,
    QueryParams, RequestBody, RequestGateway,
};
pub use session::{FileStorage, Session, SessionState, SessionStore};
pub use types::{BearerToken, RoutePath, UserRole};

use std::sync::Arc;
use anyhow::Result;

/// Convenience function to create a portal client from a loaded config.
///
/// Restores the durable session from `config.session_file` and wires the
/// gateway to `navigator` for login redirects.
pub fn connect(config: &GatewayConfig, navigator: Arc<dyn Navigator>) -> Result<PortalClient> {
    let storage = Arc::new(FileStorage::new(&config.session_file));
    let session = SessionStore::restore(storage);
    let gateway = RequestGateway::from_config(config, session, navigator)?;
    Ok(PortalClient::new(gateway))
}
