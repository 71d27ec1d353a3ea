use std::{collections::BTreeMap, fmt::Display, time::Duration};

use serde_json::Value;

/// Field name used when the server reports an error not tied to one field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Server-reported validation messages, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Creates a set holding one message for one field
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), vec![message.into()]);
        Self(errors)
    }

    /// Parses an error body returned by the server
    ///
    /// Accepts `{"field": ["msg", ...]}`, `{"field": "msg"}`, `{"detail": "msg"}`
    /// and `{"error": "msg"}`. Anything else is kept verbatim under
    /// `non_field_errors`.
    pub fn from_body(body: &str) -> Self {
        let parsed: Option<serde_json::Map<String, Value>> = serde_json::from_str(body).ok();

        let Some(object) = parsed else {
            let text = body.trim();
            if text.is_empty() {
                return Self::default();
            }
            return Self::single(NON_FIELD_ERRORS, text);
        };

        let mut errors = BTreeMap::new();
        for (field, value) in object {
            let messages = match value {
                Value::String(msg) => vec![msg],
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(msg) => msg,
                        other => other.to_string(),
                    })
                    .collect(),
                other => vec![other.to_string()],
            };
            errors.insert(field, messages);
        }

        Self(errors)
    }

    /// Messages reported for a field, if any
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

/// Errors surfaced by the remote content gateway
///
/// The gateway is the only place transport failures are translated into this
/// taxonomy. Services above it pass these through unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service unreachable: {0}")]
    Unreachable(String),

    #[error("Server fault (status {status}): {message}")]
    ServerFault { status: u16, message: String },
}

impl GatewayError {
    /// Maps a non-success HTTP status and its body onto the taxonomy
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => GatewayError::Unauthorized(detail_message(body)),
            404 => GatewayError::NotFound(detail_message(body)),
            400..=499 => GatewayError::Validation(FieldErrors::from_body(body)),
            _ => GatewayError::ServerFault {
                status,
                message: body.trim().to_string(),
            },
        }
    }

    /// Validation error raised locally before any request is made
    pub fn invalid(field: &str, message: &str) -> Self {
        GatewayError::Validation(FieldErrors::single(field, message))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized(_))
    }
}

/// Pulls `detail` or `error` out of a JSON error body, falling back to the raw text
fn detail_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

pub type GatewayResult<T> = Result<T, GatewayError>;
