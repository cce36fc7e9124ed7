// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Interact with the payment gateway's orders API.

use anyhow::Result;
use log::debug;
use reqwest::{header, Url};
use serde_json::json;

use super::{build_client, parse_json, read_body};
use crate::core::models::{GatewayOrder, OrderCollection};

const SERVICE: &str = "Payment gateway";

#[derive(Debug)]
pub struct PaymentsApiConfig {
    pub base_url: Url,
    /// HTTP client, authenticating every request with the key pair
    pub client: reqwest::Client,
}

impl PaymentsApiConfig {
    /// Configure HTTP client with basic auth (`key_id:key_secret`).
    pub fn new_with_params(
        base_url: Url,
        key_id: &str,
        key_secret: &str,
        timeout: u64,
    ) -> Result<Self> {
        let credentials = base64::encode(format!("{}:{}", key_id, key_secret));
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Basic {}", credentials))?,
        );
        Ok(Self {
            client: build_client(headers, timeout)?,
            base_url,
        })
    }
}

/// List the most recent order. Succeeds only if the key pair is accepted.
pub async fn orders_get(configuration: &PaymentsApiConfig) -> Result<OrderCollection> {
    let mut api_url = configuration.base_url.clone();
    api_url.set_path("v1/orders");
    debug!("building orders get request: {}", api_url);

    let response = configuration
        .client
        .get(api_url.as_str())
        .query(&[("count", 1)])
        .send()
        .await?;
    let content = read_body(SERVICE, response).await?;
    parse_json(SERVICE, &content)
}

/// Create an order, the first step of a checkout.
///
/// `amount` is in the currency's smallest unit (paise for INR).
///
/// # Errors
///
/// Returns an error if the gateway rejects the order or the credentials, or
/// if the returned data is malformed.
pub async fn orders_post(
    configuration: &PaymentsApiConfig,
    amount: u64,
    currency: &str,
    receipt: &str,
) -> Result<GatewayOrder> {
    debug!(
        "building orders post request for: {} {} {}",
        amount, currency, receipt
    );
    let mut api_url = configuration.base_url.clone();
    api_url.set_path("v1/orders");

    let req_body = json!({
        "amount": amount,
        "currency": currency,
        "receipt": receipt,
    });
    let response = configuration
        .client
        .post(api_url.as_str())
        .json(&req_body)
        .send()
        .await?;
    let content = read_body(SERVICE, response).await?;
    parse_json(SERVICE, &content)
}
