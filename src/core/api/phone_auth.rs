// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Interact with the identity provider's phone sign-in setup (Firebase
//! Identity Toolkit).

use anyhow::Result;
use log::debug;
use reqwest::{header, Url};

use super::{build_client, parse_json, read_body};
use crate::core::models::{ProjectConfig, RecaptchaParams};

const SERVICE: &str = "Identity Toolkit";

#[derive(Debug)]
pub struct PhoneAuthApiConfig {
    pub base_url: Url,
    /// Web API key, sent as the `key` query parameter
    pub api_key: String,
    pub client: reqwest::Client,
}

impl PhoneAuthApiConfig {
    pub fn new_with_params(base_url: Url, api_key: String, timeout: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(header::HeaderMap::new(), timeout)?,
            base_url,
            api_key,
        })
    }
}

/// Get the reCAPTCHA parameters phone sign-in verifies against. Fails if the
/// API key is invalid or restricted.
pub async fn recaptcha_params(configuration: &PhoneAuthApiConfig) -> Result<RecaptchaParams> {
    let mut api_url = configuration.base_url.clone();
    api_url.set_path("v1/recaptchaParams");
    debug!("building recaptcha params request: {}", api_url);

    let response = configuration
        .client
        .get(api_url.as_str())
        .query(&[("key", &configuration.api_key)])
        .send()
        .await?;
    let content = read_body(SERVICE, response).await?;
    parse_json(SERVICE, &content)
}

/// Get the project's public auth config, including its authorized domains.
pub async fn project_config(configuration: &PhoneAuthApiConfig) -> Result<ProjectConfig> {
    let mut api_url = configuration.base_url.clone();
    api_url.set_path("v1/projects");
    debug!("building project config request: {}", api_url);

    let response = configuration
        .client
        .get(api_url.as_str())
        .query(&[("key", &configuration.api_key)])
        .send()
        .await?;
    let content = read_body(SERVICE, response).await?;
    parse_json(SERVICE, &content)
}

#[cfg(test)]
mod tests {
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    use super::*;

    fn test_config(server: &MockServer) -> PhoneAuthApiConfig {
        PhoneAuthApiConfig::new_with_params(
            Url::parse(&server.base_url()).unwrap(),
            "AIza-TEST".to_owned(),
            10,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_recaptcha_params() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/recaptchaParams")
                .query_param("key", "AIza-TEST");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "kind": "identitytoolkit#GetRecaptchaParamResponse",
                    "recaptchaSiteKey": "6LcMZR0UAAAAALgPMcgHwga7gY5p8QMg1Hj-bmUv",
                }));
        });

        let params = recaptcha_params(&test_config(&server)).await.unwrap();

        mock.assert();
        assert_eq!(
            params.recaptcha_site_key.as_deref(),
            Some("6LcMZR0UAAAAALgPMcgHwga7gY5p8QMg1Hj-bmUv")
        );
    }

    #[tokio::test]
    async fn test_recaptcha_params_invalid_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/recaptchaParams");
            then.status(400)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "error": {
                        "code": 400,
                        "message": "API key not valid. Please pass a valid API key.",
                        "status": "INVALID_ARGUMENT",
                    }
                }));
        });

        let result = recaptcha_params(&test_config(&server))
            .await
            .expect_err("Expected invalid key error");

        mock.assert();
        assert_eq!(
            result.to_string(),
            "Identity Toolkit responded with 400 Bad Request: 400: API key not valid. Please pass a valid API key."
        );
    }

    #[tokio::test]
    async fn test_project_config() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/projects")
                .query_param("key", "AIza-TEST");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "projectId": "482910573311",
                    "authorizedDomains": ["localhost", "trip-app.firebaseapp.com", "trip-app.web.app"],
                }));
        });

        let project = project_config(&test_config(&server)).await.unwrap();

        mock.assert();
        assert_eq!(project.project_id.as_deref(), Some("482910573311"));
        assert_eq!(project.authorized_domains.len(), 3);
    }
}
