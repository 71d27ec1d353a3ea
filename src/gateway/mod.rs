/// Remote content gateway
///
/// Every call to the blog backend goes through a `Gateway`. The HTTP
/// implementation attaches the session credential, enforces the configured
/// timeout and normalizes failures into `GatewayError`; services above it
/// never see transport types.
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;

use crate::error::{GatewayError, GatewayResult};

pub mod http;

pub use http::HttpGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        write!(f, "{}", name)
    }
}

/// One call against the backend, relative to the configured base URL
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Attaches a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> GatewayResult<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            GatewayError::invalid("body", &format!("cannot encode request body: {}", e))
        })?;
        self.body = Some(value);
        Ok(self)
    }

    /// Value of the first query parameter named `name`
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Successful response: status code plus decoded JSON body (`Null` when empty)
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// Decodes the body into the expected shape
    ///
    /// A body that does not match is a server-side contract breach and is
    /// reported as `ServerFault`.
    pub fn json<T: DeserializeOwned>(self) -> GatewayResult<T> {
        let status = self.status;
        serde_json::from_value(self.body).map_err(|e| {
            tracing::error!(status = status, error = %e, "Failed to decode response body");
            GatewayError::ServerFault {
                status,
                message: format!("unexpected response shape: {}", e),
            }
        })
    }
}

/// Transport boundary for all backend access
///
/// Implementations do not cache or retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    async fn request(&self, request: GatewayRequest) -> GatewayResult<GatewayResponse>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
        time::Duration,
    };

    use crate::{
        error::GatewayResult,
        gateway::{Gateway, GatewayRequest, GatewayResponse},
    };

    /// Gateway answering from a script, each reply after its own delay
    ///
    /// Replies are handed out in call order. Tracks how many requests were
    /// on the wire at once.
    #[derive(Default)]
    pub struct ScriptedGateway {
        script: Mutex<VecDeque<(Duration, GatewayResult<GatewayResponse>)>>,
        pub requests: Mutex<Vec<GatewayRequest>>,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl ScriptedGateway {
        pub fn new(script: Vec<(u64, GatewayResult<GatewayResponse>)>) -> Self {
            Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|(millis, reply)| (Duration::from_millis(millis), reply))
                        .collect(),
                ),
                ..Default::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl Gateway for ScriptedGateway {
        async fn request(&self, request: GatewayRequest) -> GatewayResult<GatewayResponse> {
            self.requests.lock().unwrap().push(request);
            let (delay, reply) = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted");

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            reply
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = GatewayRequest::get("/recommendations/trending/")
            .query("limit", 6)
            .query("days", 7);

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.query_value("limit"), Some("6"));
        assert_eq!(request.query_value("days"), Some("7"));
        assert_eq!(request.query_value("blog"), None);
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_request_json_body() {
        let request = GatewayRequest::post("/blogs/a/comments/")
            .json(&json!({ "content": "hi" }))
            .unwrap();
        assert_eq!(request.body, Some(json!({ "content": "hi" })));
    }

    #[test]
    fn test_response_decode_mismatch_is_server_fault() {
        #[derive(Debug, Deserialize)]
        struct Expected {
            #[allow(dead_code)]
            liked: bool,
        }

        let response = GatewayResponse::ok(json!({ "unexpected": 1 }));
        let err = response.json::<Expected>().unwrap_err();
        assert!(matches!(err, GatewayError::ServerFault { status: 200, .. }));
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Patch.to_string(), "PATCH");
    }
}
