//! Tripcheck is a Command Line Interface (CLI) for the operational chores
//! around the travel-booking web app: mirroring a build's static assets,
//! checking that service credentials are present, probing the managed
//! services the app depends on, and looking up booking records.
//!
//! # Usage
//!
//! View CLI help with `tripcheck help` or `tripcheck help <subcommand>`.
//!
//! ## Configuration
//!
//! Credentials and endpoints are read, in increasing order of precedence,
//! from:
//!
//! - The config file given with `--config path/to/tripcheck.toml`, or
//!   `~/.config/tripcheck/tripcheck.toml` if it exists
//! - The environment variables the deployed app already uses, e.g.
//!   `SUPABASE_URL`, `AMADEUS_API_KEY`, `PAYMENT_KEY_SECRET`,
//!   `FIREBASE_PROJECT_ID`
//! - `TRIPCHECK_<SECTION>__<KEY>` overrides, e.g.
//!   `TRIPCHECK_AMADEUS__BASE_URL=https://api.amadeus.com`
//!
//! ## Commands
//!
//! ```tripcheck config```
//!
//! Echoes current config (with any overrides applied and secrets masked) and
//! exits.
//!
//! <br>
//!
//! ---
//!
//! ```tripcheck check-env [service]...```
//!
//! Lists each credential the given services (default: all of `database`,
//! `flights`, `payments`, `phone-auth`) need, and whether it's set. Exits
//! non-zero if any is missing. Also warns if the Supabase key isn't a
//! service-role key.
//!
//! <br>
//!
//! ---
//!
//! ```tripcheck probe [service]... [--checkout] [--search ORIGIN:DEST:DATE]```
//!
//! Authenticates against each service and prints one line per check. With
//! `--checkout`, also creates a small test order with the payment gateway;
//! with `--search`, also runs a one-adult flight offer search.
//!
//! <br>
//!
//! ---
//!
//! ```tripcheck query <table> [OPTIONS]```
//!
//! Lists `bookings`, `quotes` or `payments` from the backend, optionally
//! filtered by id, status, booking or creation date.
//!
//! <br>
//!
//! ---
//!
//! ```tripcheck copy-assets <src> <dest> [-x name]... [--verify]```
//!
//! Copies the source tree into the destination, creating directories as
//! needed and overwriting existing files. Files and directories whose name
//! matches an exclusion (from `-x` or the config's `assets.exclude`) are left
//! out at any depth. A missing source is reported and nothing is copied.
//! Symlinks are not followed.
//!
//! ## Examples
//!
//! ```shell
//! # Publish the web build without the SPA entry page, which is served
//! # separately
//! tripcheck copy-assets dist/ public/ -x index.html --verify
//!
//! # Check only the payment gateway, including order creation
//! tripcheck probe payments --checkout
//!
//! # Recent confirmed bookings, most recent first
//! tripcheck query bookings --status confirmed --order created_at.desc --limit 5
//! ```

#[cfg(not(debug_assertions))]
use human_panic::setup_panic;

mod app_config;
mod cli;
mod core;

use anyhow::Result;

#[doc(hidden)]
/// Main entrypoint
pub fn run() -> Result<()> {
    // Human Panic. Only enabled when *not* debugging.
    #[cfg(not(debug_assertions))]
    {
        setup_panic!();
    }

    // Better Panic. Only enabled *when* debugging.
    #[cfg(debug_assertions)]
    {
        better_panic::Settings::debug()
            .most_recent_first(false)
            .lineno_suffix(true)
            .verbosity(better_panic::Verbosity::Full)
            .install();
    }

    env_logger::init();

    // Get CLI arguments and flags (one may have provided the config file to use)
    let cli_matches = cli::cli_config().get_matches();

    let settings = app_config::load_settings(cli_matches.value_of("config"))?;

    // Match against CLI subcommands, which delegate to functions
    cli::cli_match(settings, cli_matches)
}
