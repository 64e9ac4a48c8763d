//! Shared HTTP response handling for the provider and backend clients.

use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Checks the response status; returns the response on success or a
/// normalized provider error carrying whatever detail the body offers.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(operation, status, body))
}

fn error_from_body(operation: &'static str, status: u16, body: String) -> Error {
    let ErrorBody {
        error_code,
        msg,
        error_description,
        error,
    } = serde_json::from_str(&body).unwrap_or_default();
    let detail = msg.or(error_description).or(error).unwrap_or(body);
    Error::Provider {
        operation,
        status: Some(status),
        code: error_code,
        detail,
    }
}
