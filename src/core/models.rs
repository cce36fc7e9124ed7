// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Serialization of managed-service responses, and the reports built from
//! them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::app_config::Service;

/// One row from the hosted backend (a booking, quote, or payment).
///
/// Table schemas belong to the web app, so rows are kept as opaque JSON with
/// accessors for the few columns every table shares.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BackendRecord(pub Map<String, Value>);

impl BackendRecord {
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(Value::as_str)
    }

    /// Creation timestamp, e.g. `2024-03-01T10:20:30.123456+00:00`.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.0.get("created_at").and_then(Value::as_str)?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }

    /// `id created_at status`, with `-` for absent columns.
    pub fn summary_line(&self) -> String {
        format!(
            "{} {} {}",
            self.id().unwrap_or_else(|| "-".to_owned()),
            self.created_at()
                .map(|date| date.to_rfc3339())
                .unwrap_or_else(|| "-".to_owned()),
            self.status().unwrap_or("-")
        )
    }
}

/// GoTrue's `/health` response.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthHealth {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// OAuth2 client-credentials token from the flight-search API.
#[derive(Clone, Debug, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
    /// `approved` for a usable token.
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FlightOfferSearch {
    #[serde(default)]
    pub meta: Option<SearchMeta>,
    #[serde(default)]
    pub data: Vec<Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SearchMeta {
    pub count: usize,
}

impl FlightOfferSearch {
    pub fn offer_count(&self) -> usize {
        self.meta
            .as_ref()
            .map(|meta| meta.count)
            .unwrap_or_else(|| self.data.len())
    }
}

/// Paged list envelope used by the payment gateway.
#[derive(Clone, Debug, Deserialize)]
pub struct OrderCollection {
    pub count: usize,
    #[serde(default)]
    pub items: Vec<GatewayOrder>,
}

/// A payment gateway order (the object a checkout is opened against).
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in the currency's smallest unit.
    pub amount: u64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecaptchaParams {
    #[serde(default)]
    pub recaptcha_site_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub authorized_domains: Vec<String>,
}

/// Outcome of one check against one managed service.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeReport {
    pub service: Service,
    pub check: &'static str,
    pub passed: bool,
    pub message: String,
}

impl ProbeReport {
    pub fn passed(service: Service, check: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            check,
            passed: true,
            message: message.into(),
        }
    }

    pub fn failed(service: Service, check: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            check,
            passed: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed { " ok " } else { "FAIL" };
        write!(
            f,
            "[{}] {}/{}: {}",
            verdict, self.service, self.check, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> BackendRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_backend_record_accessors() {
        let booking = record(json!({
            "id": "b7c1e0c2-7a0e-4a8e-9d43-0c1f0a3e9f11",
            "created_at": "2024-03-01T10:20:30.123456+00:00",
            "status": "confirmed",
            "total_amount": 45999,
        }));
        assert_eq!(
            booking.id().unwrap(),
            "b7c1e0c2-7a0e-4a8e-9d43-0c1f0a3e9f11"
        );
        assert_eq!(booking.status(), Some("confirmed"));
        assert_eq!(
            booking.created_at().unwrap().to_rfc3339(),
            "2024-03-01T10:20:30.123456+00:00"
        );
    }

    #[test]
    fn test_backend_record_summary_with_missing_columns() {
        let payment = record(json!({"id": 42, "created_at": "not a date"}));
        assert_eq!(payment.summary_line(), "42 - -");
    }

    #[test]
    fn test_flight_offer_count_falls_back_to_data() {
        let search: FlightOfferSearch =
            serde_json::from_value(json!({"data": [{"id": "1"}, {"id": "2"}]})).unwrap();
        assert_eq!(search.offer_count(), 2);

        let search: FlightOfferSearch =
            serde_json::from_value(json!({"meta": {"count": 7}, "data": []})).unwrap();
        assert_eq!(search.offer_count(), 7);
    }

    #[test]
    fn test_probe_report_display() {
        let report = ProbeReport::failed(Service::PhoneAuth, "recaptcha", "400: API key not valid");
        assert_eq!(
            report.to_string(),
            "[FAIL] phone-auth/recaptcha: 400: API key not valid"
        );
        let report = ProbeReport::passed(Service::Flights, "token", "approved");
        assert_eq!(report.to_string(), "[ ok ] flights/token: approved");
    }
}
