use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// What a facade call hands back to plugins.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpResponse {
    Json(JsonResponse),
    Raw(RawResponse),
}

impl HttpResponse {
    pub fn status(&self) -> u16 {
        match self {
            HttpResponse::Json(json) => json.status_code,
            HttpResponse::Raw(raw) => raw.status,
        }
    }

    pub fn into_json(self) -> Result<JsonResponse> {
        match self {
            HttpResponse::Json(json) => Ok(json),
            HttpResponse::Raw(_) => Err(Error::Internal("expected a JSON response".into())),
        }
    }
}

/// Body left as text, for callers that asked for the raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub text: String,
}

/// Parsed JSON body with the HTTP status injected.
///
/// A body that failed to parse shows up as an empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    pub status_code: u16,
    pub body: Value,
}

impl JsonResponse {
    pub fn empty(status_code: u16) -> Self {
        Self {
            status_code,
            body: Value::Object(Map::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.body {
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }

    /// Deserialize the body into an endpoint-specific type.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| Error::InvalidPayload(format!("unexpected response shape: {e}")))
    }
}
