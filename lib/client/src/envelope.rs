//! Response envelope handling.
//!
//! The backend wraps every payload as
//! `{success, data, message, errors}`. Bodies are first normalized to JSON
//! (non-JSON text becomes `{"message": text}`), then unwrapped: `data` is
//! returned on success, and anything else becomes an [`ApiError::Http`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::backend::HttpResponse;
use crate::error::{ApiError, FieldErrors};

/// The backend's uniform response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = JsonValue> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(default)]
    pub data: Option<T>,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
    /// Field-level validation errors.
    #[serde(default)]
    pub errors: Option<FieldErrors>,
}

impl<T> Envelope<T> {
    /// Creates a successful envelope.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: String::new(),
            errors: None,
        }
    }

    /// Creates a failed envelope.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            errors: None,
        }
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        let mime = ct.split(';').next().unwrap_or_default().trim();
        mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
    })
}

/// Normalizes a response body to JSON so callers never see raw bytes.
#[must_use]
pub fn normalize_body(response: &HttpResponse) -> JsonValue {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return JsonValue::Null;
    }
    if is_json(response.content_type.as_deref()) {
        if let Ok(value) = serde_json::from_slice(&response.body) {
            return value;
        }
    }
    json!({ "message": String::from_utf8_lossy(&response.body).trim() })
}

fn is_envelope(value: &JsonValue) -> bool {
    value
        .as_object()
        .is_some_and(|object| object.get("success").is_some_and(JsonValue::is_boolean))
}

/// Builds the error for a failed response from its normalized body.
#[must_use]
pub fn http_error(status: u16, body: JsonValue) -> ApiError {
    let message = ["message", "detail", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(JsonValue::as_str))
        .filter(|message| !message.is_empty())
        .map_or_else(
            || format!("Request failed with status {status}"),
            str::to_string,
        );
    let errors = body
        .get("errors")
        .and_then(|errors| serde_json::from_value::<FieldErrors>(errors.clone()).ok());
    let data = (!body.is_null()).then_some(body);

    ApiError::Http {
        status,
        message,
        data,
        errors,
    }
}

/// Decodes a response into `T`, unwrapping the envelope.
///
/// # Errors
///
/// Returns `Http` for non-2xx statuses and for envelopes with
/// `success: false`, and `InvalidResponse` when the payload does not match `T`.
pub fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    let status = response.status;
    let body = normalize_body(response);

    if !response.is_success() {
        return Err(http_error(status, body));
    }

    let payload = if is_envelope(&body) {
        let envelope: Envelope = serde_json::from_value(body.clone()).map_err(|e| {
            ApiError::InvalidResponse {
                status,
                reason: e.to_string(),
            }
        })?;
        if !envelope.success {
            return Err(http_error(status, body));
        }
        envelope.data.unwrap_or(JsonValue::Null)
    } else {
        body
    };

    serde_json::from_value(payload).map_err(|e| ApiError::InvalidResponse {
        status,
        reason: e.to_string(),
    })
}
