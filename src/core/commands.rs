// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

use std::fmt;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use byte_unit::Byte;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, warn};
use reqwest::Url;

use super::api::backend::{self, BackendApiConfig, RecordQuery, Table};
use super::api::flights::{self, FlightSearch, FlightsApiConfig};
use super::api::payments::{self, PaymentsApiConfig};
use super::api::phone_auth::{self, PhoneAuthApiConfig};
use super::assets::{AssetCopier, CopyOutcome, MirrorMismatch};
use super::models::ProbeReport;
use crate::app_config::{
    self, AmadeusConfig, AssetConfig, FirebaseConfig, PaymentsConfig, Service, SupabaseConfig,
    SECRET_KEYS,
};

/// Amount of the `--checkout` test order, in the currency's smallest unit.
const CHECKOUT_TEST_AMOUNT: u64 = 100;

/// Show the merged configuration, with secrets masked.
pub fn print_config(config: config::Config) -> Result<()> {
    let mut merged: toml::Value = config.try_into()?;
    mask_secrets(&mut merged);
    println!("{}", toml::to_string(&merged)?);

    Ok(())
}

fn mask_secrets(value: &mut toml::Value) {
    if let toml::Value::Table(table) = value {
        for (key, value) in table.iter_mut() {
            match value {
                toml::Value::String(s) if SECRET_KEYS.contains(&key.as_str()) => {
                    *s = app_config::mask(s)
                }
                toml::Value::Table(_) => mask_secrets(value),
                _ => {}
            }
        }
    }
}

/// Presence of one credential.
#[derive(Debug, PartialEq)]
pub struct CredentialStatus {
    pub service: Service,
    pub key: &'static str,
    /// Already masked.
    pub value: Option<String>,
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<11} {}", self.service.as_ref(), self.key)?;
        if let Some(var) = app_config::env_var_for(self.key) {
            write!(f, " ({})", var)?;
        }
        match &self.value {
            Some(value) => write!(f, ": set ({})", value),
            None => write!(f, ": MISSING"),
        }
    }
}

pub fn credential_statuses(config: &config::Config, services: &[Service]) -> Vec<CredentialStatus> {
    services
        .iter()
        .flat_map(|service| {
            service.credential_keys().iter().map(move |&key| CredentialStatus {
                service: *service,
                key,
                value: app_config::credential(config, key).map(|value| {
                    if key.ends_with("url") || key.ends_with("project_id") {
                        value
                    } else {
                        app_config::mask(&value)
                    }
                }),
            })
        })
        .collect()
}

/// Report which credentials are present, failing if any are missing.
pub fn check_env(config: &config::Config, services: &[Service]) -> Result<()> {
    let statuses = credential_statuses(config, services);
    for status in &statuses {
        println!("{}", status);
    }

    if services.contains(&Service::Database) {
        if let Some(key) = app_config::credential(config, "supabase.service_role_key") {
            match app_config::supabase_key_role(&key) {
                Ok(role) if role == "service_role" => println!("Supabase key role: {}", role),
                Ok(role) => warn!(
                    "Supabase key has role {}, expected service_role; \
                     queries will be limited by row-level security",
                    role
                ),
                Err(e) => warn!("Couldn't read Supabase key role: {:#}", e),
            }
        }
    }

    let missing: Vec<&str> = statuses
        .iter()
        .filter(|status| status.value.is_none())
        .map(|status| status.key)
        .collect();
    if !missing.is_empty() {
        bail!("Missing credentials: {}", missing.join(", "));
    }
    Ok(())
}

/// Extra work `probe` may do beyond authenticating.
#[derive(Debug, Default)]
pub struct ProbeOptions {
    /// Create a test order with the payment gateway.
    pub checkout: bool,
    /// Run a flight offer search with the issued token.
    pub search: Option<FlightSearch>,
}

/// Probe each service in turn, printing one line per check.
#[tokio::main(flavor = "current_thread")]
pub async fn probe(
    config: config::Config,
    services: Vec<Service>,
    options: ProbeOptions,
) -> Result<()> {
    let reports = run_probes(&config, &services, &options).await;
    for report in &reports {
        println!("{}", report);
    }

    let failures = reports.iter().filter(|report| !report.passed).count();
    if failures > 0 {
        bail!("{} of {} probe checks failed", failures, reports.len());
    }
    Ok(())
}

pub async fn run_probes(
    config: &config::Config,
    services: &[Service],
    options: &ProbeOptions,
) -> Vec<ProbeReport> {
    let mut reports = Vec::new();
    for service in services {
        debug!("Probing {}", service);
        let result = match service {
            Service::Database => probe_database(config).await,
            Service::Flights => probe_flights(config, options.search.as_ref()).await,
            Service::Payments => probe_payments(config, options.checkout).await,
            Service::PhoneAuth => probe_phone_auth(config).await,
        };
        match result {
            Ok(mut service_reports) => reports.append(&mut service_reports),
            Err(e) => {
                error!("Can't probe {}: {:#}", service, e);
                reports.push(ProbeReport::failed(*service, "config", format!("{:#}", e)));
            }
        }
    }
    reports
}

/// Turn the result of one check into a report, logging failures.
fn report(service: Service, check: &'static str, result: Result<String>) -> ProbeReport {
    match result {
        Ok(message) => ProbeReport::passed(service, check, message),
        Err(e) => {
            error!("{} {} check failed: {:#}", service, check, e);
            ProbeReport::failed(service, check, format!("{:#}", e))
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("Invalid base URL {}", raw))
}

fn backend_api(config: &config::Config) -> Result<BackendApiConfig> {
    let settings = config.clone().try_into::<SupabaseConfig>()?;
    BackendApiConfig::new_with_params(
        parse_base_url(&settings.supabase.url)?,
        &settings.supabase.service_role_key,
        settings.http.timeout_secs,
    )
}

async fn probe_database(config: &config::Config) -> Result<Vec<ProbeReport>> {
    let api = backend_api(config)?;

    let health = backend::auth_health(&api).await.map(|health| {
        format!(
            "{} {}",
            health.name.unwrap_or_else(|| "auth".to_owned()),
            health.version.unwrap_or_else(|| "(unknown version)".to_owned())
        )
    });
    let params = RecordQuery {
        limit: Some(1),
        ..Default::default()
    };
    let read = backend::records_get(&api, Table::Bookings, &params)
        .await
        .map(|records| {
            format!(
                "read access to {} ({} row sampled)",
                Table::Bookings,
                records.len()
            )
        });

    Ok(vec![
        report(Service::Database, "auth-health", health),
        report(Service::Database, "rest", read),
    ])
}

async fn probe_flights(
    config: &config::Config,
    search: Option<&FlightSearch>,
) -> Result<Vec<ProbeReport>> {
    let settings = config.clone().try_into::<AmadeusConfig>()?;
    let api = FlightsApiConfig::new_with_params(
        parse_base_url(&settings.amadeus.base_url)?,
        settings.http.timeout_secs,
    )?;

    let token = match flights::access_token(
        &api,
        &settings.amadeus.api_key,
        &settings.amadeus.api_secret,
    )
    .await
    {
        Ok(token) => token,
        Err(e) => return Ok(vec![report(Service::Flights, "token", Err(e))]),
    };
    let mut reports = vec![report(
        Service::Flights,
        "token",
        Ok(format!(
            "{} token, expires in {}s",
            token.state.as_deref().unwrap_or("issued"),
            token.expires_in
        )),
    )];

    if let Some(search) = search {
        let offers = flights::flight_offers(&api, &token, search)
            .await
            .map(|offers| {
                format!(
                    "{} offer(s) {} -> {} on {}",
                    offers.offer_count(),
                    search.origin,
                    search.destination,
                    search.departure_date
                )
            });
        reports.push(report(Service::Flights, "search", offers));
    }
    Ok(reports)
}

async fn probe_payments(config: &config::Config, checkout: bool) -> Result<Vec<ProbeReport>> {
    let settings = config.clone().try_into::<PaymentsConfig>()?;
    let api = PaymentsApiConfig::new_with_params(
        parse_base_url(&settings.payments.base_url)?,
        &settings.payments.key_id,
        &settings.payments.key_secret,
        settings.http.timeout_secs,
    )?;

    let orders = payments::orders_get(&api).await.map(|orders| match orders.items.first() {
        Some(latest) => format!(
            "authenticated, {} order(s) listed, latest {} ({})",
            orders.count, latest.id, latest.status
        ),
        None => "authenticated, no orders yet".to_owned(),
    });
    let mut reports = vec![report(Service::Payments, "auth", orders)];

    if checkout {
        let receipt = format!("tripcheck-{}", Utc::now().timestamp());
        let order = payments::orders_post(
            &api,
            CHECKOUT_TEST_AMOUNT,
            &settings.payments.currency,
            &receipt,
        )
        .await
        .map(|order| {
            format!(
                "created order {} for {} {} ({}, receipt {})",
                order.id,
                order.amount,
                order.currency,
                order.status,
                order.receipt.as_deref().unwrap_or("-")
            )
        });
        reports.push(report(Service::Payments, "checkout", order));
    }
    Ok(reports)
}

async fn probe_phone_auth(config: &config::Config) -> Result<Vec<ProbeReport>> {
    let settings = config.clone().try_into::<FirebaseConfig>()?;
    let api = PhoneAuthApiConfig::new_with_params(
        parse_base_url(&settings.firebase.base_url)?,
        settings.firebase.api_key.clone(),
        settings.http.timeout_secs,
    )?;

    let recaptcha = phone_auth::recaptcha_params(&api)
        .await
        .and_then(|params| match params.recaptcha_site_key {
            Some(site_key) if !site_key.is_empty() => {
                Ok(format!("reCAPTCHA site key {}", app_config::mask(&site_key)))
            }
            _ => Err(anyhow!("phone sign-in has no reCAPTCHA site key configured")),
        });

    let expected = settings.firebase.expected_domain();
    let domains = phone_auth::project_config(&api).await.and_then(|project| {
        if project.authorized_domains.iter().any(|domain| *domain == expected) {
            Ok(format!(
                "{} is authorized for project {}",
                expected,
                project.project_id.as_deref().unwrap_or(&settings.firebase.project_id)
            ))
        } else {
            Err(anyhow!(
                "{} is not an authorized domain (authorized: {})",
                expected,
                project.authorized_domains.join(", ")
            ))
        }
    });

    Ok(vec![
        report(Service::PhoneAuth, "recaptcha", recaptcha),
        report(Service::PhoneAuth, "domains", domains),
    ])
}

/// List records from one backend table.
#[tokio::main(flavor = "current_thread")]
pub async fn query(
    config: config::Config,
    table: Table,
    params: RecordQuery,
    as_json: bool,
) -> Result<()> {
    let api = backend_api(&config)?;
    let records = backend::records_get(&api, table, &params).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No {} found", table);
    } else {
        for record in records.iter() {
            println!("{}", record.summary_line());
        }
    }
    Ok(())
}

/// Mirror `source` into `destination`, skipping `exclude` plus the configured
/// `assets.exclude` names.
pub fn copy_assets(
    config: &config::Config,
    source: &Path,
    destination: &Path,
    exclude: Vec<String>,
    verify: bool,
) -> Result<()> {
    let mut exclusions = config.clone().try_into::<AssetConfig>()?.assets.exclude;
    exclusions.extend(exclude);
    debug!("Copying assets excluding {:?}", exclusions);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} {pos} files"));
    spinner.set_message("Copying assets");

    let copier = AssetCopier::new(source, destination, exclusions).with_progress(spinner.clone());
    let outcome = copier.run();
    spinner.finish_and_clear();

    match outcome? {
        CopyOutcome::SourceMissing(path) => {
            println!("Source directory {} does not exist, nothing copied", path.display());
            return Ok(());
        }
        CopyOutcome::Copied(summary) => {
            println!(
                "Copied {} files ({}) in {} directories to {}, skipped {}",
                summary.files,
                Byte::from_bytes(summary.bytes.into()).get_appropriate_unit(false),
                summary.directories,
                destination.display(),
                summary.skipped.len()
            );
        }
    }

    if verify {
        let mismatches = copier.verify()?;
        for mismatch in &mismatches {
            match mismatch {
                MirrorMismatch::Missing(path) => println!("missing: {}", path.display()),
                MirrorMismatch::ContentDiffers(path) => println!("differs: {}", path.display()),
            }
        }
        if !mismatches.is_empty() {
            bail!("Destination doesn't mirror source ({} mismatches)", mismatches.len());
        }
        println!("Verified {} against {}", destination.display(), source.display());
    }
    Ok(())
}
