// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Clients for the managed services the booking app depends on, and the
//! response handling they share.

pub(crate) mod backend;
pub(crate) mod flights;
pub(crate) mod payments;
pub(crate) mod phone_auth;

use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Longest raw body quoted back when it isn't a recognizable error document.
const MAX_DETAIL_CHARS: usize = 200;

/// A managed service answered, but not with a 2xx.
#[derive(Debug, thiserror::Error)]
#[error("{service} responded with {status}: {detail}")]
pub struct ServiceError {
    pub service: &'static str,
    pub status: StatusCode,
    /// Error code and description pulled out of the response body.
    pub detail: String,
}

/// Configure an HTTP client with user-agent, default headers, and timeout.
pub(crate) fn build_client(headers: header::HeaderMap, timeout: u64) -> Result<reqwest::Client> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"),);
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout))
        .build()?)
}

/// Read the body of a response, turning non-2xx statuses into a
/// [ServiceError].
pub(crate) async fn read_body(
    service: &'static str,
    response: reqwest::Response,
) -> Result<String> {
    let status = response.status();
    debug!("{} status: {}", service, status);
    let content = response.text().await?;
    debug!("{} content: {}", service, content);

    if !status.is_success() {
        return Err(ServiceError {
            service,
            status,
            detail: describe_failure(&content),
        }
        .into());
    }
    Ok(content)
}

pub(crate) fn parse_json<T: DeserializeOwned>(service: &str, content: &str) -> Result<T> {
    serde_json::from_str(content)
        .with_context(|| format!("JSON from {} was malformed: {}", service, content))
}

/// Human-readable reason for a failed call, preferring a structured error
/// code/description and falling back to the (truncated) body.
pub fn describe_failure(body: &str) -> String {
    if let Some(detail) = error_detail(body) {
        return detail;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_owned()
    } else if trimmed.chars().count() > MAX_DETAIL_CHARS {
        format!(
            "{}...",
            trimmed.chars().take(MAX_DETAIL_CHARS).collect::<String>()
        )
    } else {
        trimmed.to_owned()
    }
}

/// Extracts `code: description` from the error documents the managed services
/// return.
///
/// Recognized shapes:
///
/// - OAuth: `{"error": "invalid_client", "error_description": "..."}`
/// - Amadeus: `{"errors": [{"code": 38190, "title": "...", "detail": "..."}]}`
/// - Google APIs: `{"error": {"code": 400, "message": "..."}}`
/// - Payment gateway: `{"error": {"code": "BAD_REQUEST_ERROR", "description": "..."}}`
/// - PostgREST/GoTrue: `{"code": "42P01", "message": "..."}` or `{"msg": "..."}`
pub fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    if let Some(first) = value.get("errors").and_then(|errors| errors.get(0)) {
        let message = first
            .get("detail")
            .or_else(|| first.get("title"))
            .and_then(Value::as_str);
        return join_code(first.get("code"), message);
    }

    match value.get("error") {
        Some(Value::String(_)) => {
            let description = value.get("error_description").and_then(Value::as_str);
            return join_code(value.get("error"), description);
        }
        Some(nested) if nested.is_object() => {
            let message = nested
                .get("description")
                .or_else(|| nested.get("message"))
                .and_then(Value::as_str);
            return join_code(nested.get("code"), message);
        }
        _ => {}
    }

    let message = value
        .get("message")
        .or_else(|| value.get("msg"))
        .and_then(Value::as_str);
    join_code(value.get("code").or_else(|| value.get("error_code")), message)
}

fn join_code(code: Option<&Value>, message: Option<&str>) -> Option<String> {
    let code = code.and_then(|code| match code {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    match (code, message) {
        (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
        (Some(code), None) => Some(code),
        (None, Some(message)) => Some(message.to_owned()),
        (None, None) => None,
    }
}
