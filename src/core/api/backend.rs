// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Interact with the hosted backend.
//!
//! The backend is Postgres behind Supabase, so table reads go through
//! PostgREST (`/rest/v1`) and auth health through GoTrue (`/auth/v1`).

use anyhow::Result;
use chrono::NaiveDate;
use log::debug;
use reqwest::{header, Url};
use strum_macros::{Display, EnumString, EnumVariantNames};

use super::{build_client, parse_json, read_body};
use crate::core::models::{AuthHealth, BackendRecord};

const SERVICE: &str = "Supabase";

/// Configuration for interacting with the hosted backend.
#[derive(Debug)]
pub struct BackendApiConfig {
    /// Project URL
    pub base_url: Url,
    /// HTTP client
    pub client: reqwest::Client,
}

impl BackendApiConfig {
    /// Configure HTTP client with the service-role key as both the gateway
    /// `apikey` and the bearer token.
    pub fn new_with_params(base_url: Url, service_role_key: &str, timeout: u64) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert("apikey", header::HeaderValue::from_str(service_role_key)?);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", service_role_key))?,
        );
        Ok(Self {
            client: build_client(headers, timeout)?,
            base_url,
        })
    }
}

/// Tables the booking app keeps its records in.
#[derive(EnumString, EnumVariantNames, Display, Clone, Copy, Debug, PartialEq)]
pub enum Table {
    #[strum(serialize = "bookings")]
    Bookings,
    #[strum(serialize = "quotes")]
    Quotes,
    #[strum(serialize = "payments")]
    Payments,
}

/// Available record sorting options
#[derive(EnumString, EnumVariantNames, Display, Debug)]
pub enum RecordOrdering {
    /// Sort by creation date, ascending (i.e. oldest first)
    #[strum(serialize = "created_at.asc")]
    CreatedAtAsc,
    /// Sort by creation date, descending (i.e. most recent first)
    #[strum(serialize = "created_at.desc")]
    CreatedAtDesc,
}

/// Options for filtering a record list query.
#[derive(Debug, Default)]
pub struct RecordQuery {
    /// Filter to a specific record
    pub id: Option<String>,
    /// Filter by the `status` column (e.g. "confirmed", "captured")
    pub status: Option<String>,
    /// Filter quotes/payments to those of one booking
    pub booking_id: Option<String>,
    /// Filter to records created before a date
    pub before_date: Option<NaiveDate>,
    /// Filter to records created on or after a date
    pub after_date: Option<NaiveDate>,
    pub order: Option<RecordOrdering>,
    /// Number of records to show.
    pub limit: Option<usize>,
}

/// Get a list of records from one table.
///
/// # Errors
///
/// Returns an error if the backend returns a non-200 response (e.g. if the
/// key is invalid, the table doesn't exist, or the server is unreachable) or
/// if the returned data is malformed (e.g. not json).
pub async fn records_get(
    configuration: &BackendApiConfig,
    table: Table,
    params: &RecordQuery,
) -> Result<Vec<BackendRecord>> {
    debug!("building get request for {}: {:?}", table, params);
    let client = &configuration.client;

    let mut api_url = configuration.base_url.clone();
    api_url.set_path(&format!("rest/v1/{}", table));
    let mut req_builder = client.get(api_url.as_str()).query(&[("select", "*")]);

    if let Some(id) = &params.id {
        req_builder = req_builder.query(&[("id", format!("eq.{}", id))]);
    }
    if let Some(status) = &params.status {
        req_builder = req_builder.query(&[("status", format!("eq.{}", status))]);
    }
    if let Some(booking_id) = &params.booking_id {
        req_builder = req_builder.query(&[("booking_id", format!("eq.{}", booking_id))]);
    }
    if let Some(before_date) = &params.before_date {
        req_builder = req_builder.query(&[("created_at", format!("lt.{}", before_date))]);
    }
    if let Some(after_date) = &params.after_date {
        req_builder = req_builder.query(&[("created_at", format!("gte.{}", after_date))]);
    }
    if let Some(order) = &params.order {
        req_builder = req_builder.query(&[("order", order.to_string())]);
    }
    if let Some(limit) = &params.limit {
        req_builder = req_builder.query(&[("limit", limit)]);
    }

    let response = req_builder.send().await?;
    let content = read_body(SERVICE, response).await?;
    parse_json(SERVICE, &content)
}

/// Check that the auth service answers for this project.
pub async fn auth_health(configuration: &BackendApiConfig) -> Result<AuthHealth> {
    let mut api_url = configuration.base_url.clone();
    api_url.set_path("auth/v1/health");
    debug!("building auth health request: {}", api_url);

    let response = configuration.client.get(api_url.as_str()).send().await?;
    let content = read_body(SERVICE, response).await?;
    parse_json(SERVICE, &content)
}
