//! Request/response types and the network seam below the gateway.
//!
//! The gateway never talks to the network directly; it hands an
//! [`ApiRequest`] to an [`HttpTransport`] and interprets the returned
//! [`ApiResponse`]. Any HTTP status comes back as `Ok`; only failures to get
//! a response at all are errors at this layer.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::gateway::error::GatewayError;
use crate::types::BearerToken;

/// Query parameters, kept sorted by key so their serialization does not
/// depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sorted-key JSON encoding used in request signatures.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Outbound request body.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// Multipart form with text fields, in the order given.
    Form(Vec<(String, String)>),
}

impl RequestBody {
    pub fn form<K: Into<String>, V: ToString>(fields: impl IntoIterator<Item = (K, V)>) -> Self {
        RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }
}

/// A call to the backend, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: QueryParams,
    pub body: RequestBody,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Attach the bearer token as the `Authorization` header.
    pub fn authorize(&mut self, token: &BearerToken) -> Result<(), GatewayError> {
        let value = HeaderValue::from_str(&token.authorization_value())
            .map_err(|e| GatewayError::InvalidRequest(format!("bearer token: {}", e)))?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// A backend response of any status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    /// Response with a JSON payload.
    pub fn json_value(status: StatusCode, value: &Value) -> Self {
        Self::new(
            status,
            Some("application/json".to_string()),
            value.to_string().into_bytes(),
        )
    }

    /// Benign result handed to callers whose request was superseded.
    pub fn empty() -> Self {
        Self::json_value(StatusCode::OK, &Value::Array(Vec::new()))
    }

    /// Successful response signalling an expected business failure.
    pub fn soft_failure(message: &str) -> Self {
        Self::json_value(
            StatusCode::OK,
            &serde_json::json!({ "success": false, "message": message }),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("json"))
    }

    /// Body as JSON. Empty bodies are `null`; non-JSON text becomes a string.
    pub fn value(&self) -> Value {
        if self.body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&self.body).into_owned()))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        let body: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

/// Boxed future returned by transports.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ApiResponse, GatewayError>> + Send + 'a>>;

/// Network seam beneath the gateway.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::InvalidRequest(format!("base URL `{}`: {}", base_url, e)))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `path` to the base URL's path and encode the query.
    pub fn endpoint(&self, path: &str, query: &QueryParams) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        url
    }

    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let url = self.endpoint(&request.path, &request.query);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => {
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (k, v)| form.text(k, v));
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(ApiResponse::new(status, content_type, body.to_vec()))
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
        Box::pin(self.execute(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_params_ignore_insertion_order() {
        let a = QueryParams::new().with("page", 2).with("status", "Active");
        let b = QueryParams::new().with("status", "Active").with("page", 2);
        assert_eq!(a, b);
        assert_eq!(a.canonical_json(), r#"{"page":"2","status":"Active"}"#);
    }

    #[test]
    fn test_endpoint_joins_base_path() {
        let transport = ReqwestTransport::new("https://portal.example.com/api/").unwrap();
        let url = transport.endpoint("/user/all", &QueryParams::new().with("role", "Manager"));
        assert_eq!(url.as_str(), "https://portal.example.com/api/user/all?role=Manager");

        let transport = ReqwestTransport::new("https://portal.example.com").unwrap();
        let url = transport.endpoint("fund", &QueryParams::new());
        assert_eq!(url.as_str(), "https://portal.example.com/fund");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ReqwestTransport::new("::nope::"),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_response_value_fallbacks() {
        let empty = ApiResponse::new(StatusCode::NO_CONTENT, None, Vec::new());
        assert_eq!(empty.value(), Value::Null);

        let text = ApiResponse::new(StatusCode::OK, Some("text/plain".into()), b"ok".to_vec());
        assert_eq!(text.value(), json!("ok"));
        assert!(!text.is_json());

        let soft = ApiResponse::soft_failure("No investments");
        assert!(soft.is_json());
        assert_eq!(soft.value(), json!({ "success": false, "message": "No investments" }));
    }

    #[test]
    fn test_authorize_sets_header() {
        let mut request = ApiRequest::new(Method::GET, "/fund");
        assert_eq!(request.authorization(), None);

        request.authorize(&BearerToken::new("abc")).unwrap();
        assert_eq!(request.authorization(), Some("Bearer abc"));

        let mut request = ApiRequest::new(Method::GET, "/fund");
        assert!(request.authorize(&BearerToken::new("bad\ntoken")).is_err());
    }
}
