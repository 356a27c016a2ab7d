//! Reaction to authentication failures.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::session::SessionStore;
use crate::types::RoutePath;

/// Client-side navigation collaborator.
pub trait Navigator: Send + Sync {
    /// Replace whatever screen is current with `destination`.
    fn navigate(&self, destination: &RoutePath);
}

/// Navigator for headless use: records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, destination: &RoutePath) {
        warn!("Session ended, sign in again (redirect to {})", destination);
    }
}

/// Ends the session and forces navigation to the login boundary on a 401.
///
/// There is no retry or token refresh: one 401 anywhere ends the session
/// everywhere.
#[derive(Clone)]
pub struct SessionInterceptor {
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    login_route: RoutePath,
}

impl SessionInterceptor {
    pub fn new(session: SessionStore, navigator: Arc<dyn Navigator>, login_route: RoutePath) -> Self {
        Self {
            session,
            navigator,
            login_route,
        }
    }

    pub fn login_route(&self) -> &RoutePath {
        &self.login_route
    }

    /// Handle a 401 observed by a request dispatched at session `epoch`.
    ///
    /// Returns `true` if this call cleared the session and navigated. A 401
    /// for a session that has already been torn down (or replaced by a new
    /// login) is a no-op.
    pub async fn on_unauthorized(&self, epoch: u64) -> bool {
        if !self.session.invalidate(epoch).await {
            debug!("Ignoring 401 for a session that already ended");
            return false;
        }

        warn!("Backend rejected the session; clearing credentials");
        self.navigator.navigate(&self.login_route);
        true
    }
}
