// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Interact with the flight-search API (Amadeus self-service).

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use log::debug;
use reqwest::{header, Url};

use super::{build_client, parse_json, read_body};
use crate::core::models::{AccessToken, FlightOfferSearch};

const SERVICE: &str = "Amadeus";

#[derive(Debug)]
pub struct FlightsApiConfig {
    /// API host, e.g. `https://test.api.amadeus.com`
    pub base_url: Url,
    /// HTTP client
    pub client: reqwest::Client,
}

impl FlightsApiConfig {
    pub fn new_with_params(base_url: Url, timeout: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(header::HeaderMap::new(), timeout)?,
            base_url,
        })
    }
}

/// A one-way, one-adult offer search used as a smoke test.
#[derive(Clone, Debug, PartialEq)]
pub struct FlightSearch {
    /// IATA code, e.g. `BLR`
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
}

impl FromStr for FlightSearch {
    type Err = anyhow::Error;

    /// Parses `ORIGIN:DESTINATION:YYYY-MM-DD`, e.g. `BLR:DEL:2026-12-01`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            bail!("Flight search must look like ORIGIN:DESTINATION:YYYY-MM-DD, got {}", s);
        }
        let is_iata = |code: &str| code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic());
        if !is_iata(parts[0]) || !is_iata(parts[1]) {
            bail!("Airport codes must be three letters, got {} and {}", parts[0], parts[1]);
        }
        let departure_date = NaiveDate::from_str(parts[2])
            .with_context(|| format!("Invalid departure date {}", parts[2]))?;
        Ok(Self {
            origin: parts[0].to_ascii_uppercase(),
            destination: parts[1].to_ascii_uppercase(),
            departure_date,
        })
    }
}

/// Exchange the API key and secret for an access token (OAuth2 client
/// credentials grant).
///
/// # Errors
///
/// Returns an error if the credentials are rejected (the error carries the
/// `error`/`error_description` the API returns), if the server is
/// unreachable, or if the token response is malformed.
pub async fn access_token(
    configuration: &FlightsApiConfig,
    api_key: &str,
    api_secret: &str,
) -> Result<AccessToken> {
    let mut api_url = configuration.base_url.clone();
    api_url.set_path("v1/security/oauth2/token");
    debug!("building token request: {}", api_url);

    let response = configuration
        .client
        .post(api_url.as_str())
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", api_key),
            ("client_secret", api_secret),
        ])
        .send()
        .await?;
    let content = read_body(SERVICE, response).await?;
    let token: AccessToken = parse_json(SERVICE, &content)?;
    if token.access_token.is_empty() {
        return Err(anyhow!("{} issued an empty access token", SERVICE));
    }
    Ok(token)
}

/// Search for at most one flight offer.
pub async fn flight_offers(
    configuration: &FlightsApiConfig,
    token: &AccessToken,
    search: &FlightSearch,
) -> Result<FlightOfferSearch> {
    let mut api_url = configuration.base_url.clone();
    api_url.set_path("v2/shopping/flight-offers");
    debug!("building flight offers request for: {:?}", search);

    let response = configuration
        .client
        .get(api_url.as_str())
        .bearer_auth(&token.access_token)
        .query(&[
            ("originLocationCode", search.origin.clone()),
            ("destinationLocationCode", search.destination.clone()),
            ("departureDate", search.departure_date.to_string()),
            ("adults", "1".to_owned()),
            ("max", "1".to_owned()),
        ])
        .send()
        .await?;
    let content = read_body(SERVICE, response).await?;
    parse_json(SERVICE, &content)
}

#[cfg(test)]
mod tests {
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };
    use serde_json::json;

    use super::*;
    use crate::core::api::ServiceError;

    fn test_config(server: &MockServer) -> FlightsApiConfig {
        FlightsApiConfig::new_with_params(Url::parse(&server.base_url()).unwrap(), 10).unwrap()
    }

    #[test]
    fn test_flight_search_from_str() {
        let search = FlightSearch::from_str("blr:DEL:2026-12-01").unwrap();
        assert_eq!(search.origin, "BLR");
        assert_eq!(search.destination, "DEL");
        assert_eq!(
            search.departure_date,
            NaiveDate::from_ymd_opt(2026, 12, 1).unwrap()
        );

        FlightSearch::from_str("BLR:DEL").unwrap_err();
        FlightSearch::from_str("BLRX:DEL:2026-12-01").unwrap_err();
        FlightSearch::from_str("BLR:DEL:tomorrow").unwrap_err();
    }

    #[tokio::test]
    async fn test_access_token_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/security/oauth2/token")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body_contains("grant_type=client_credentials")
                .body_contains("client_id=KEY")
                .body_contains("client_secret=SECRET");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "type": "amadeusOAuth2Token",
                    "username": "dev@example.com",
                    "application_name": "trip-app",
                    "client_id": "KEY",
                    "token_type": "Bearer",
                    "access_token": "AnAccessToken",
                    "expires_in": 1799,
                    "state": "approved",
                    "scope": "",
                }));
        });

        let token = access_token(&test_config(&server), "KEY", "SECRET")
            .await
            .unwrap();

        mock.assert();
        assert_eq!(token.access_token, "AnAccessToken");
        assert_eq!(token.expires_in, 1799);
        assert_eq!(token.state.as_deref(), Some("approved"));
    }

    #[tokio::test]
    async fn test_access_token_invalid_client() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/security/oauth2/token");
            then.status(401)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "error": "invalid_client",
                    "error_description": "Client credentials are invalid",
                    "code": 38187,
                    "title": "Invalid parameters",
                }));
        });

        let result = access_token(&test_config(&server), "KEY", "WRONG")
            .await
            .expect_err("Expected credentials to be rejected");
        let downcast = result.downcast_ref::<ServiceError>().unwrap();

        mock.assert();
        assert_eq!(downcast.status, reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(
            downcast.detail,
            "invalid_client: Client credentials are invalid"
        );
    }

    #[tokio::test]
    async fn test_flight_offers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v2/shopping/flight-offers")
                .header("Authorization", "Bearer AnAccessToken")
                .query_param("originLocationCode", "BLR")
                .query_param("destinationLocationCode", "DEL")
                .query_param("departureDate", "2026-12-01")
                .query_param("adults", "1")
                .query_param("max", "1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "meta": {"count": 1},
                    "data": [{"type": "flight-offer", "id": "1"}],
                }));
        });

        let token = AccessToken {
            access_token: "AnAccessToken".to_owned(),
            expires_in: 1799,
            state: Some("approved".to_owned()),
        };
        let search = FlightSearch::from_str("BLR:DEL:2026-12-01").unwrap();
        let offers = flight_offers(&test_config(&server), &token, &search)
            .await
            .unwrap();

        mock.assert();
        assert_eq!(offers.offer_count(), 1);
    }
}
