// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

use std::collections::HashMap;
use std::env;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, EnumVariantNames};

/// Used when `--config` isn't given. Unlike an explicit `--config`, it's fine
/// for this file to be absent (everything can come from the environment).
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/tripcheck/tripcheck.toml";

/// Plain environment variables the deployed booking app already uses, paired
/// with the config key each one fills.
pub const WELL_KNOWN_ENV: [(&str, &str); 8] = [
    ("SUPABASE_URL", "supabase.url"),
    ("SUPABASE_SERVICE_ROLE_KEY", "supabase.service_role_key"),
    ("AMADEUS_API_KEY", "amadeus.api_key"),
    ("AMADEUS_API_SECRET", "amadeus.api_secret"),
    ("PAYMENT_KEY_ID", "payments.key_id"),
    ("PAYMENT_KEY_SECRET", "payments.key_secret"),
    ("FIREBASE_API_KEY", "firebase.api_key"),
    ("FIREBASE_PROJECT_ID", "firebase.project_id"),
];

/// Config keys whose values are masked whenever they're echoed back.
pub const SECRET_KEYS: [&str; 4] = ["service_role_key", "api_key", "api_secret", "key_secret"];

/// Managed services tripcheck knows how to check.
#[derive(AsRefStr, Display, EnumVariantNames, EnumString, EnumIter, Clone, Copy, Debug, PartialEq)]
pub enum Service {
    /// Hosted Postgres behind Supabase's PostgREST and GoTrue.
    #[strum(serialize = "database")]
    Database,
    /// Amadeus flight-search API.
    #[strum(serialize = "flights")]
    Flights,
    #[strum(serialize = "payments")]
    Payments,
    /// Firebase Identity Toolkit phone sign-in.
    #[strum(serialize = "phone-auth")]
    PhoneAuth,
}

impl Service {
    /// Config keys that must be non-empty before the service can be probed.
    pub fn credential_keys(&self) -> &'static [&'static str] {
        match *self {
            Service::Database => &["supabase.url", "supabase.service_role_key"],
            Service::Flights => &["amadeus.api_key", "amadeus.api_secret"],
            Service::Payments => &["payments.key_id", "payments.key_secret"],
            Service::PhoneAuth => &["firebase.api_key", "firebase.project_id"],
        }
    }
}

/// Name of the plain environment variable that fills `key`, if there is one.
pub fn env_var_for(key: &str) -> Option<&'static str> {
    WELL_KNOWN_ENV
        .iter()
        .find(|(_, k)| *k == key)
        .map(|(var, _)| *var)
}

/// A `config` source that maps the plain variables in [WELL_KNOWN_ENV] onto
/// their config keys.
///
/// Merged after the config file and before `TRIPCHECK_*` overrides, so a
/// deploy environment's existing variables win over the file but can still be
/// overridden explicitly.
#[derive(Clone, Debug, Default)]
pub struct WellKnownEnv {
    values: HashMap<String, String>,
}

impl WellKnownEnv {
    pub fn from_process() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let values = WELL_KNOWN_ENV
            .iter()
            .filter_map(|(var, key)| lookup(var).map(|value| ((*key).to_owned(), value)))
            .collect();
        Self { values }
    }
}

impl config::Source for WellKnownEnv {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<HashMap<String, config::Value>, config::ConfigError> {
        let origin = "the environment".to_owned();
        Ok(self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), config::Value::new(Some(&origin), value.clone())))
            .collect())
    }
}

/// Layer the config file, well-known variables and `TRIPCHECK_*` overrides.
pub fn build_settings(
    config_file: Option<&str>,
    well_known: WellKnownEnv,
) -> Result<config::Config> {
    let mut settings = config::Config::default();
    // Use cmdline arg config file if provided, otherwise fall back to the
    // default path if it exists
    if let Some(config_file) = config_file {
        settings.merge(config::File::with_name(config_file))?;
    } else {
        settings.merge(
            config::File::with_name(&shellexpand::tilde(DEFAULT_CONFIG_PATH)).required(false),
        )?;
    }

    settings.merge(well_known)?;

    // Example of overriding: TRIPCHECK_AMADEUS__BASE_URL=https://api.amadeus.com
    // (Note double underscore to reach into sections!)
    settings.merge(config::Environment::with_prefix("TRIPCHECK").separator("__"))?;
    Ok(settings)
}

pub fn load_settings(config_file: Option<&str>) -> Result<config::Config> {
    build_settings(config_file, WellKnownEnv::from_process())
}

/// Non-empty value of `key`, if set anywhere in the layered config.
pub fn credential(settings: &config::Config, key: &str) -> Option<String> {
    settings
        .get_str(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Show the first few characters of a secret, enough to tell keys apart.
pub fn mask(value: &str) -> String {
    if value.chars().count() <= 4 {
        return "****".to_owned();
    }
    let visible: String = value.chars().take(4).collect();
    format!("{}****", visible)
}

/// Reads the `role` claim out of a Supabase API key (a JWT) without verifying
/// its signature.
pub fn supabase_key_role(key: &str) -> Result<String> {
    let payload = key
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow!("Supabase key isn't a JWT (expected three dot-separated parts)"))?;
    let decoded = base64::decode_config(payload.trim_end_matches('='), base64::URL_SAFE_NO_PAD)
        .context("Supabase key payload isn't valid base64url")?;
    let claims: serde_json::Value =
        serde_json::from_slice(&decoded).context("Supabase key payload isn't JSON")?;
    claims
        .get("role")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("Supabase key has no role claim"))
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HttpSettings {
    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AssetSettings {
    /// Filenames never copied by `copy-assets`, in addition to any `--exclude`.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssetConfig {
    #[serde(default)]
    pub assets: AssetSettings,
}

#[derive(Debug, Deserialize)]
pub struct SupabaseConfig {
    pub supabase: SupabaseSettings,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
pub struct SupabaseSettings {
    /// Project URL, e.g. `https://abcdefgh.supabase.co`.
    pub url: String,
    pub service_role_key: String,
}

#[derive(Debug, Deserialize)]
pub struct AmadeusConfig {
    pub amadeus: AmadeusSettings,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
pub struct AmadeusSettings {
    /// Test environment by default; production is `https://api.amadeus.com`.
    #[serde(default = "default_amadeus_url")]
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

fn default_amadeus_url() -> String {
    "https://test.api.amadeus.com".to_owned()
}

#[derive(Debug, Deserialize)]
pub struct PaymentsConfig {
    pub payments: PaymentsSettings,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
pub struct PaymentsSettings {
    #[serde(default = "default_payments_url")]
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    /// Currency for the `--checkout` test order.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_payments_url() -> String {
    "https://api.razorpay.com".to_owned()
}

fn default_currency() -> String {
    "INR".to_owned()
}

#[derive(Debug, Deserialize)]
pub struct FirebaseConfig {
    pub firebase: FirebaseSettings,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
pub struct FirebaseSettings {
    #[serde(default = "default_firebase_url")]
    pub base_url: String,
    pub api_key: String,
    pub project_id: String,
    /// Domain the web app is served from. Defaults to the project's
    /// `firebaseapp.com` domain.
    pub authorized_domain: Option<String>,
}

impl FirebaseSettings {
    pub fn expected_domain(&self) -> String {
        self.authorized_domain
            .clone()
            .unwrap_or_else(|| format!("{}.firebaseapp.com", self.project_id))
    }
}

fn default_firebase_url() -> String {
    "https://identitytoolkit.googleapis.com".to_owned()
}
