//! Maps HTTP transport failures and error responses onto [`AppError`].

use celoris_core::{AppError, AppResult};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Fields BaaS error bodies use for the human-readable reason, in lookup order.
const MESSAGE_FIELDS: [&str; 4] = ["message", "msg", "error_description", "error"];

/// Converts a transport failure into an application error.
pub(crate) fn transport_error(context: &str, error: reqwest::Error) -> AppError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        AppError::Transient(format!("{context}: {error}"))
    } else {
        AppError::Internal(format!("{context}: {error}"))
    }
}

/// Passes successful responses through and turns the rest into errors.
///
/// Server errors and throttling are transient, `404` is not-found and any
/// other client error is an auth failure carrying the service's message.
pub(crate) async fn check_status(context: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let reason = error_reason(&body).unwrap_or_else(|| format!("{context} returned {status}"));

    Err(status_error(status, reason))
}

/// Parses a successful JSON response body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    context: &str,
    response: Response,
) -> AppResult<T> {
    let response = check_status(context, response).await?;
    response.json::<T>().await.map_err(|error| {
        AppError::Internal(format!("failed to parse {context} response body: {error}"))
    })
}

fn status_error(status: StatusCode, reason: String) -> AppError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        AppError::Transient(reason)
    } else if status == StatusCode::NOT_FOUND {
        AppError::NotFound(reason)
    } else {
        AppError::Auth(reason)
    }
}

fn error_reason(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    MESSAGE_FIELDS
        .iter()
        .filter_map(|field| value.get(field).and_then(Value::as_str))
        .map(str::trim)
        .find(|reason| !reason.is_empty())
        .map(str::to_owned)
}
