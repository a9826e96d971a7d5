//! The uniform result envelope and the normalizer that produces it.
//!
//! # Design
//! The backend wraps replies as `{success, data, message, meta}` but is not
//! consistent about it: keys go missing, errors arrive as 4xx bodies with an
//! `errors` map, and transport failures have no body at all. `normalize`
//! folds every outcome into either a successful `Envelope` or an `ApiError`
//! carrying a non-empty message. The two call conventions are thin views
//! over that single function:
//!
//! - envelope convention: `Envelope::from_error` turns the error back into
//!   an `Envelope { success: false, .. }`, so the call never fails;
//! - strict convention: the error is returned as-is.
//!
//! Message precedence for failures: the body's `message`, then its `error`
//! string (or the first field error for validation replies), then the
//! operation's fallback text. 404 uses the resource's not-found message and
//! transport failures always use the fallback, so raw network text never
//! reaches a user.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ApiError, FieldErrors, TransportError};
use crate::http::HttpResponse;

/// Pagination metadata. Opaque to the client and passed through as sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageInfo(pub Map<String, Value>);

impl PageInfo {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn total(&self) -> Option<u64> {
        self.number(&["total"])
    }

    pub fn page(&self) -> Option<u64> {
        self.number(&["page", "current_page"])
    }

    pub fn per_page(&self) -> Option<u64> {
        self.number(&["itemsPerPage", "per_page"])
    }

    fn number(&self, keys: &[&str]) -> Option<u64> {
        keys.iter().find_map(|k| match self.0.get(*k)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }
}

/// Uniform result of a resource call.
///
/// When `success` is `false`, `data` is `None` and `message` is a non-empty,
/// user-facing string; validation detail, if any, is in `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
    pub errors: Option<FieldErrors>,
    pub meta: Option<PageInfo>,
}

impl<T> Envelope<T> {
    pub fn ok(data: Option<T>) -> Self {
        Self {
            success: true,
            message: None,
            data,
            errors: None,
            meta: None,
        }
    }

    /// A failed envelope with the given message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            errors: None,
            meta: None,
        }
    }

    /// Fold a strict-convention error into a failed envelope.
    pub fn from_error(error: ApiError) -> Self {
        let message = error.to_string();
        let errors = match error {
            ApiError::Validation { errors, .. } => Some(errors),
            _ => None,
        };
        Self {
            errors,
            ..Self::failure(message)
        }
    }

    /// The message, or `""` when the backend sent none.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            success: self.success,
            message: self.message,
            data: self.data.map(f),
            errors: self.errors,
            meta: self.meta,
        }
    }
}

/// User-facing texts for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Used when nothing better is available, e.g. "An error occurred while
    /// fetching vehicles".
    pub fallback: String,
    /// Used for 404 replies.
    pub not_found: String,
}

impl Operation {
    pub fn new(fallback: impl Into<String>, not_found: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            not_found: not_found.into(),
        }
    }
}

/// Lenient view of a reply body. Every key is optional and any JSON type is
/// accepted, so a surprising body never fails to parse.
#[derive(Debug, Default, Deserialize)]
struct RawBody {
    #[serde(default)]
    success: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Value>,
    #[serde(default)]
    meta: Option<Value>,
}

impl RawBody {
    fn parse(body: &[u8]) -> Option<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Some(Self::default());
        }
        match serde_json::from_slice::<Value>(body).ok()? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    fn message(&self) -> Option<String> {
        non_empty_str(self.message.as_ref())
    }

    fn error(&self) -> Option<String> {
        non_empty_str(self.error.as_ref())
    }

    fn field_errors(&self) -> Option<FieldErrors> {
        let Value::Object(map) = self.errors.as_ref()? else {
            return None;
        };
        let errors: FieldErrors = map
            .iter()
            .map(|(field, messages)| {
                let messages = match messages {
                    Value::Array(items) => items
                        .iter()
                        .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                        .collect(),
                    Value::String(s) => vec![s.clone()],
                    other => vec![other.to_string()],
                };
                (field.clone(), messages)
            })
            .collect();
        (!errors.is_empty()).then_some(errors)
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn first_field_error(errors: &FieldErrors) -> Option<String> {
    errors.values().flatten().find(|m| !m.trim().is_empty()).cloned()
}

/// Normalize a transport outcome into a successful envelope or an error.
pub fn normalize<T: DeserializeOwned>(
    outcome: Result<HttpResponse, TransportError>,
    op: &Operation,
) -> Result<Envelope<T>, ApiError> {
    let response = match outcome {
        Ok(response) => response,
        Err(source) => {
            warn!(error = %source, fallback = %op.fallback, "Transport failure");
            return Err(ApiError::Transport {
                message: op.fallback.clone(),
                source,
            });
        }
    };

    let Some(body) = RawBody::parse(&response.body) else {
        warn!(status = response.status, "Response body is not JSON");
        return Err(if response.is_success() {
            ApiError::MalformedResponse {
                message: op.fallback.clone(),
            }
        } else {
            status_error(response.status, &RawBody::default(), op)
        });
    };

    if !response.is_success() {
        let err = status_error(response.status, &body, op);
        warn!(status = response.status, message = %err, "Request failed");
        return Err(err);
    }

    // A 2xx without an explicit flag counts as success.
    let success = match &body.success {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() != Some(0),
        _ => true,
    };
    if !success {
        let message = body
            .message()
            .or_else(|| body.error())
            .unwrap_or_else(|| op.fallback.clone());
        return Err(match body.field_errors() {
            Some(errors) => ApiError::Validation { message, errors },
            None => ApiError::Rejected { message },
        });
    }

    let data = match body.data {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(error = %e, "Response data has an unexpected shape");
                return Err(ApiError::MalformedResponse {
                    message: op.fallback.clone(),
                });
            }
        },
    };
    let meta = match body.meta {
        Some(Value::Object(map)) => Some(PageInfo(map)),
        _ => None,
    };

    Ok(Envelope {
        success: true,
        message: non_empty_str(body.message.as_ref()),
        data,
        errors: None,
        meta,
    })
}

fn status_error(status: u16, body: &RawBody, op: &Operation) -> ApiError {
    let field_errors = body.field_errors();
    let described = || body.message().or_else(|| body.error());
    match status {
        401 => ApiError::Unauthorized {
            message: described().unwrap_or_else(|| op.fallback.clone()),
        },
        404 => ApiError::NotFound {
            message: op.not_found.clone(),
        },
        _ => match field_errors {
            Some(errors) => ApiError::Validation {
                message: described()
                    .or_else(|| first_field_error(&errors))
                    .unwrap_or_else(|| op.fallback.clone()),
                errors,
            },
            None => ApiError::Server {
                status,
                message: described().unwrap_or_else(|| op.fallback.clone()),
            },
        },
    }
}

/// Envelope convention: never fails.
pub fn to_envelope<T: DeserializeOwned>(
    outcome: Result<HttpResponse, TransportError>,
    op: &Operation,
) -> Envelope<T> {
    normalize(outcome, op).unwrap_or_else(Envelope::from_error)
}
