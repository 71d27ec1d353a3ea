use reqwest::{header::AUTHORIZATION, Client as HttpClient};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{GatewayError, GatewayResult},
    gateway::{Gateway, GatewayRequest, GatewayResponse, Method},
    session::SessionStore,
};

/// HTTP header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// reqwest-backed gateway to the blog backend
#[derive(Clone)]
pub struct HttpGateway {
    http_client: HttpClient,
    base_url: String,
    auth_scheme: String,
    timeout: Duration,
    session: Arc<dyn SessionStore>,
}

impl HttpGateway {
    /// Creates a gateway with the configured base URL, timeout and auth scheme
    pub fn new(config: &Config, session: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        let timeout = config.timeout();
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_scheme: config.auth_scheme.clone(),
            timeout,
            session,
        })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn authorization(&self) -> Option<String> {
        self.session
            .token()
            .map(|token| format!("{} {}", self.auth_scheme, token))
    }

    /// Converts a transport failure into the gateway taxonomy
    fn transport_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Unreachable(error.to_string())
        }
    }
}

#[async_trait::async_trait]
impl Gateway for HttpGateway {
    async fn request(&self, request: GatewayRequest) -> GatewayResult<GatewayResponse> {
        let url = self.url_for(&request.path);
        let request_id = Uuid::new_v4();

        let mut builder = match request.method {
            Method::Get => self.http_client.get(&url),
            Method::Post => self.http_client.post(&url),
            Method::Patch => self.http_client.patch(&url),
            Method::Delete => self.http_client.delete(&url),
        };

        builder = builder.header(REQUEST_ID_HEADER, request_id.to_string());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let authenticated = match self.authorization() {
            Some(credential) => {
                builder = builder.header(AUTHORIZATION, credential);
                true
            }
            None => false,
        };

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            url = %url,
            authenticated = authenticated,
            "Sending request"
        );

        let response = builder.send().await.map_err(|e| {
            let err = self.transport_error(e);
            tracing::warn!(
                request_id = %request_id,
                method = %request.method,
                url = %url,
                error = %err,
                "Request failed before a response arrived"
            );
            err
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let err = GatewayError::from_status(status.as_u16(), &text);
            tracing::warn!(
                request_id = %request_id,
                method = %request.method,
                url = %url,
                status = %status,
                error = %err,
                "Backend returned an error status"
            );
            return Err(err);
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                tracing::error!(
                    request_id = %request_id,
                    url = %url,
                    error = %e,
                    response = %text,
                    "Failed to parse backend response"
                );
                GatewayError::ServerFault {
                    status: status.as_u16(),
                    message: format!("malformed JSON body: {}", e),
                }
            })?
        };

        tracing::debug!(
            request_id = %request_id,
            status = %status,
            "Request completed"
        );

        Ok(GatewayResponse::new(status.as_u16(), body))
    }
}
