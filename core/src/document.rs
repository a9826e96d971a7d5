//! Document convention for report endpoints that answer with a PDF.
//!
//! Success is decided by the response content type, not by a JSON flag.
//! Anything other than `application/pdf` is read as a JSON error payload.

use serde_json::Value;
use tracing::warn;

use crate::error::TransportError;
use crate::http::HttpResponse;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const GENERATED: &str = "PDF generated successfully.";
const UNKNOWN_ERROR: &str = "Unknown error while generating the PDF.";
const SERVER_ERROR: &str = "Server error while generating the PDF.";
const NETWORK_ERROR: &str = "Network error while generating the PDF.";
const UNEXPECTED_ERROR: &str = "An unexpected error occurred while generating the PDF.";

/// A downloaded binary report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content_type: String,
    /// From `content-disposition`, when the server sent one.
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// Outcome of a document call. `file` is present exactly when `success` is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentResult {
    pub success: bool,
    pub message: String,
    pub file: Option<Document>,
}

impl DocumentResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            file: None,
        }
    }
}

/// Interpret the outcome of a report request.
pub fn to_document(outcome: Result<HttpResponse, TransportError>) -> DocumentResult {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Report request failed");
            return DocumentResult::failure(UNEXPECTED_ERROR);
        }
    };

    let content_type = response.content_type();
    if response.is_success() && content_type.as_deref() == Some(PDF_CONTENT_TYPE) {
        let filename = response
            .header("content-disposition")
            .and_then(disposition_filename);
        return DocumentResult {
            success: true,
            message: GENERATED.to_string(),
            file: Some(Document {
                content_type: PDF_CONTENT_TYPE.to_string(),
                filename,
                bytes: response.body,
            }),
        };
    }

    let parsed = serde_json::from_slice::<Value>(&response.body).ok();
    let message = match parsed {
        Some(json) => {
            let text = |key: &str| {
                json.get(key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
            };
            if response.is_success() {
                text("message").unwrap_or_else(|| UNKNOWN_ERROR.to_string())
            } else {
                text("message")
                    .or_else(|| text("error"))
                    .unwrap_or_else(|| SERVER_ERROR.to_string())
            }
        }
        None => NETWORK_ERROR.to_string(),
    };
    warn!(status = response.status, content_type = ?content_type, %message, "Report not generated");
    DocumentResult::failure(message)
}

/// Extract the filename from a `content-disposition` header value.
pub fn disposition_filename(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let name = value.trim().trim_matches('"');
        (!name.is_empty()).then(|| name.to_string())
    })
}
