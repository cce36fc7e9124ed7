// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{crate_authors, crate_description, crate_version};
use clap::{Arg, ArgMatches, Command};
use strum::{IntoEnumIterator, VariantNames};

use crate::app_config::Service;
use crate::core::api::backend::{RecordOrdering, RecordQuery, Table};
use crate::core::api::flights::FlightSearch;
use crate::core::commands;

/// Match commands
pub fn cli_match(config: config::Config, cli_matches: ArgMatches) -> Result<()> {
    match cli_matches.subcommand() {
        Some(("config", _config_matches)) => commands::print_config(config),
        Some(("check-env", check_matches)) => {
            commands::check_env(&config, &selected_services(check_matches)?)
        }
        Some(("probe", probe_matches)) => {
            let options = commands::ProbeOptions {
                checkout: probe_matches.is_present("checkout"),
                search: probe_matches
                    .value_of("search")
                    .map(FlightSearch::from_str)
                    .transpose()?,
            };
            commands::probe(config, selected_services(probe_matches)?, options)
        }
        Some(("query", query_matches)) => {
            let table = Table::from_str(required(query_matches, "table")?)?;
            let params = RecordQuery {
                id: query_matches.value_of("id").map(str::to_owned),
                status: query_matches.value_of("status").map(str::to_owned),
                booking_id: query_matches.value_of("booking_id").map(str::to_owned),
                before_date: parsed(query_matches, "before"),
                after_date: parsed(query_matches, "after"),
                order: parsed::<RecordOrdering>(query_matches, "order"),
                limit: parsed(query_matches, "limit"),
            };
            commands::query(config, table, params, query_matches.is_present("json"))
        }
        Some(("copy-assets", copy_matches)) => {
            let exclude = copy_matches
                .values_of("exclude")
                .map(|names| names.map(str::to_owned).collect())
                .unwrap_or_default();
            commands::copy_assets(
                &config,
                Path::new(required(copy_matches, "source")?),
                Path::new(required(copy_matches, "destination")?),
                exclude,
                copy_matches.is_present("verify"),
            )
        }
        _ => {
            // Arguments are required by default (in Clap).
            // This section should never execute.
            unreachable!("No matching subcommand!");
        }
    }
}

/// Services named on the command line, or all of them.
fn selected_services(matches: &ArgMatches) -> Result<Vec<Service>> {
    match matches.values_of("service") {
        Some(names) => names
            .map(|name| Service::from_str(name).map_err(|e| anyhow!("{}: {}", name, e)))
            .collect(),
        None => Ok(Service::iter().collect()),
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| anyhow!("Missing required argument <{}>", name))
}

/// Parse an optional argument, exiting with clap's usage error if it's invalid.
fn parsed<T>(matches: &ArgMatches, name: &str) -> Option<T>
where
    T: FromStr,
    <T as FromStr>::Err: Display,
{
    if matches.is_present(name) {
        Some(matches.value_of_t(name).unwrap_or_else(|e| e.exit()))
    } else {
        None
    }
}

fn service_arg(help: &'static str) -> Arg<'static> {
    Arg::new("service")
        .value_name("SERVICE")
        .help(help)
        .possible_values(Service::VARIANTS.iter().copied())
        .multiple_values(true)
        .takes_value(true)
}

/// Configure Clap
/// This function will configure clap and match arguments
pub fn cli_config() -> Command<'static> {
    Command::new("tripcheck")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .version(crate_version!())
        .about(crate_description!())
        .author(crate_authors!("\n"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Set a custom config file")
                .takes_value(true),
        )
        .subcommand(Command::new("config").about("Show configuration, with secrets masked"))
        .subcommand(
            Command::new("check-env")
                .about("Report which service credentials are set")
                .arg(service_arg("Services to check (default: all)")),
        )
        .subcommand(
            Command::new("probe")
                .about("Authenticate against managed services")
                .arg(service_arg("Services to probe (default: all)"))
                .arg(
                    Arg::new("checkout")
                        .long("checkout")
                        .help("Also create a test order with the payment gateway"),
                )
                .arg(
                    Arg::new("search")
                        .long("search")
                        .value_name("ORIGIN:DEST:DATE")
                        .help("Also search flight offers, e.g. BLR:DEL:2026-12-01")
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("query")
                .about("List booking records from the backend")
                .arg(
                    Arg::new("table")
                        .required(true)
                        .possible_values(Table::VARIANTS.iter().copied())
                        .takes_value(true),
                )
                .arg(
                    Arg::new("id")
                        .long("id")
                        .value_name("ID")
                        .help("Show only the record with this id")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("status")
                        .long("status")
                        .value_name("STATUS")
                        .help("Filter by status, e.g. confirmed")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("booking_id")
                        .long("booking-id")
                        .value_name("ID")
                        .help("Filter quotes or payments to one booking")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("after")
                        .long("after")
                        .value_name("DATE")
                        .help("Records created on or after DATE (YYYY-MM-DD)")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("before")
                        .long("before")
                        .value_name("DATE")
                        .help("Records created before DATE (YYYY-MM-DD)")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("order")
                        .long("order")
                        .value_name("ORDER")
                        .possible_values(RecordOrdering::VARIANTS.iter().copied())
                        .takes_value(true),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_name("N")
                        .help("Maximum number of records to show")
                        .default_value("20")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print full records as JSON"),
                ),
        )
        .subcommand(
            Command::new("copy-assets")
                .about("Mirror a build's static assets into another directory")
                .arg(Arg::new("source").value_name("SRC").required(true).takes_value(true))
                .arg(
                    Arg::new("destination")
                        .value_name("DEST")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::new("exclude")
                        .short('x')
                        .long("exclude")
                        .value_name("NAME")
                        .help("File or directory name to leave out, at any depth")
                        .multiple_occurrences(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::new("verify")
                        .long("verify")
                        .help("Check the destination mirrors the source afterwards"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli_config().debug_assert();
    }

    #[test]
    fn test_selected_services_defaults_to_all() {
        let matches = cli_config().get_matches_from(vec!["tripcheck", "check-env"]);
        let (_, check_matches) = matches.subcommand().unwrap();
        assert_eq!(
            selected_services(check_matches).unwrap(),
            vec![
                Service::Database,
                Service::Flights,
                Service::Payments,
                Service::PhoneAuth
            ]
        );

        let matches =
            cli_config().get_matches_from(vec!["tripcheck", "probe", "phone-auth", "flights"]);
        let (_, probe_matches) = matches.subcommand().unwrap();
        assert_eq!(
            selected_services(probe_matches).unwrap(),
            vec![Service::PhoneAuth, Service::Flights]
        );
    }

    #[test]
    fn test_unknown_service_is_rejected() {
        cli_config()
            .try_get_matches_from(vec!["tripcheck", "probe", "hotels"])
            .unwrap_err();
    }

    #[test]
    fn test_query_limit_default() {
        let matches = cli_config().get_matches_from(vec!["tripcheck", "query", "bookings"]);
        let (_, query_matches) = matches.subcommand().unwrap();
        assert_eq!(parsed::<usize>(query_matches, "limit"), Some(20));
        assert_eq!(parsed::<usize>(query_matches, "id"), None);
    }
}
