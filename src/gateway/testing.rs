//! Scripted collaborators for gateway and API client tests.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::{Method, StatusCode};
use serde_json::{Value, json};

use crate::config::GatewayConfig;
use crate::gateway::RequestGateway;
use crate::gateway::error::GatewayError;
use crate::gateway::interceptor::Navigator;
use crate::gateway::transport::{
    ApiRequest, ApiResponse, HttpTransport, RequestBody, TransportFuture,
};
use crate::session::{MemoryStorage, SessionStore};
use crate::types::RoutePath;

#[derive(Clone)]
enum Reply {
    Respond {
        status: StatusCode,
        body: Value,
        delay: Duration,
    },
    Fail {
        error: GatewayError,
        delay: Duration,
    },
    Hang,
}

/// Transport answering from a per-(method, path) script and recording every
/// request it sees. Unscripted routes answer 404.
#[derive(Default)]
pub(crate) struct MockTransport {
    replies: Mutex<HashMap<(Method, String), Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, method: Method, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert((method, path.to_string()), reply);
    }

    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.respond_after(method, path, status, body, Duration::ZERO);
    }

    pub fn respond_after(
        &self,
        method: Method,
        path: &str,
        status: StatusCode,
        body: Value,
        delay: Duration,
    ) {
        self.script(method, path, Reply::Respond { status, body, delay });
    }

    pub fn fail_after(&self, method: Method, path: &str, error: GatewayError, delay: Duration) {
        self.script(method, path, Reply::Fail { error, delay });
    }

    pub fn hang(&self, method: Method, path: &str) {
        self.script(method, path, Reply::Hang);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&(request.method.clone(), request.path.clone()))
            .cloned()
            .unwrap_or(Reply::Respond {
                status: StatusCode::NOT_FOUND,
                body: json!({ "message": "not found" }),
                delay: Duration::ZERO,
            });
        self.requests.lock().unwrap().push(request);

        Box::pin(async move {
            match reply {
                Reply::Respond { status, body, delay } => {
                    tokio::time::sleep(delay).await;
                    Ok(ApiResponse::json_value(status, &body))
                }
                Reply::Fail { error, delay } => {
                    tokio::time::sleep(delay).await;
                    Err(error)
                }
                Reply::Hang => std::future::pending().await,
            }
        })
    }
}

/// Navigator that remembers where it was sent.
#[derive(Default)]
pub(crate) struct RecordingNavigator {
    visits: Mutex<Vec<RoutePath>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<RoutePath> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: &RoutePath) {
        self.visits.lock().unwrap().push(destination.clone());
    }
}

/// Gateway over `transport` with default config and an empty session.
pub(crate) fn gateway_with(transport: Arc<MockTransport>) -> RequestGateway {
    let session = SessionStore::restore(Arc::new(MemoryStorage::new()));
    RequestGateway::new(
        &GatewayConfig::default(),
        transport,
        session,
        Arc::new(RecordingNavigator::default()),
    )
}

/// Text fields of a multipart body, or an empty list for other bodies.
pub(crate) fn form_fields(request: &ApiRequest) -> Vec<(String, String)> {
    match &request.body {
        RequestBody::Form(fields) => fields.clone(),
        _ => Vec::new(),
    }
}
