//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use seismodash::client::{StatsKind, StatsResource};
use seismodash::colorize::MapMetric;
use seismodash::transform::{SortDirection, SortField};

use crate::output::Format;

/// Earthquake monitoring and prediction dashboard client.
#[derive(Parser, Debug)]
#[command(name = "seismodash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Path to a config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List earthquakes matching the saved filters
    Earthquakes(TableArgs),

    /// List predictions matching the saved filters
    Predictions(PredictionArgs),

    /// Fetch a statistics series
    Stats(StatsArgs),

    /// List or download generated reports
    #[command(subcommand)]
    Reports(ReportsCommand),

    /// Per-city map colors
    Map(MapArgs),

    /// Show or change the saved filters
    #[command(subcommand)]
    Filter(FilterCommand),

    /// Account: register, verify, log in and out
    #[command(subcommand)]
    Auth(AuthCommand),

    /// Edit the signed-in user's profile
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Start the web UI server
    Ui(UiArgs),
}

/// Table options shared by the list commands.
#[derive(Args, Debug)]
pub struct TableArgs {
    /// Page to show (1-based)
    #[arg(long, short = 'p', default_value = "1")]
    pub page: u32,

    /// Rows per page (defaults to the configured size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Sort field, e.g. magnitude, depth, location.city, occurrenceDate
    #[arg(long, value_parser = parse_sort_field)]
    pub sort: Option<SortField>,

    /// Sort direction
    #[arg(long, default_value = "asc", value_parser = parse_direction)]
    pub dir: SortDirection,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `predictions` command.
#[derive(Args, Debug)]
pub struct PredictionArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// Show the most severe predictions instead of the filtered list
    #[arg(long)]
    pub most_severe: bool,
}

/// Arguments for the `stats` command.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Record family: earthquake or prediction
    #[arg(value_parser = parse_resource)]
    pub resource: StatsResource,

    /// Series: monthly, magnitude-distribution, city-distribution
    #[arg(value_parser = parse_stats_kind)]
    pub kind: StatsKind,

    /// Output format
    #[arg(long, short = 'f', default_value = "json", value_parser = parse_format)]
    pub format: Format,
}

/// `reports` subcommands.
#[derive(Subcommand, Debug)]
pub enum ReportsCommand {
    /// List available reports
    List {
        /// Output format
        #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
        format: Format,
    },

    /// Download a report
    Download {
        /// Report id
        id: String,

        /// Where to write it (defaults to the server-provided filename)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

/// Arguments for the `map` command.
#[derive(Args, Debug)]
pub struct MapArgs {
    /// Color by magnitude (observed) or possibility (predicted)
    #[arg(long, default_value = "magnitude", value_parser = parse_metric)]
    pub metric: MapMetric,

    /// GeoJSON file with named city polygons; styles every region
    #[arg(long)]
    pub boundaries: Option<PathBuf>,

    /// City whose popup to place (needs --boundaries)
    #[arg(long, requires = "boundaries")]
    pub select: Option<String>,

    /// Map width in pixels for popup anchors
    #[arg(long, default_value = "960")]
    pub width: f64,

    /// Map height in pixels for popup anchors
    #[arg(long, default_value = "540")]
    pub height: f64,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// `filter` subcommands.
#[derive(Subcommand, Debug)]
pub enum FilterCommand {
    /// Print the saved filters
    Show {
        /// Output format
        #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
        format: Format,
    },

    /// Change some of the saved filters; the rest are kept
    Set(FilterSetArgs),

    /// Restore the defaults
    Reset,
}

/// Arguments for `filter set`.
#[derive(Args, Debug)]
pub struct FilterSetArgs {
    /// City name
    #[arg(long, conflicts_with = "clear_city")]
    pub city: Option<String>,

    /// Remove the city filter
    #[arg(long)]
    pub clear_city: bool,

    /// Minimum magnitude
    #[arg(long)]
    pub min_magnitude: Option<f64>,

    /// Maximum magnitude
    #[arg(long)]
    pub max_magnitude: Option<f64>,

    /// First day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_dates")]
    pub start_date: Option<NaiveDate>,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_dates")]
    pub end_date: Option<NaiveDate>,

    /// Remove both date bounds
    #[arg(long)]
    pub clear_dates: bool,
}

/// `auth` subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        /// Accept the terms of use
        #[arg(long)]
        accept_terms: bool,
    },

    /// Confirm the email address with the emailed code
    Verify {
        #[arg(long)]
        email: String,
        code: String,
    },

    /// Send another verification code
    Resend {
        #[arg(long)]
        email: String,
    },

    /// Sign in
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Request a password reset email
    Forgot {
        #[arg(long)]
        email: String,
    },

    /// Sign out and forget the local session
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Output format
        #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
        format: Format,
    },
}

/// `profile` subcommands.
#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Change name or email
    Update {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Change the password
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

/// Arguments for the `ui` command.
#[derive(Args, Debug)]
pub struct UiArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "3000")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

fn parse_sort_field(s: &str) -> Result<SortField, String> {
    s.parse()
}

fn parse_direction(s: &str) -> Result<SortDirection, String> {
    s.parse()
}

fn parse_resource(s: &str) -> Result<StatsResource, String> {
    s.parse()
}

fn parse_stats_kind(s: &str) -> Result<StatsKind, String> {
    s.parse()
}

fn parse_metric(s: &str) -> Result<MapMetric, String> {
    s.parse()
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date {s}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_earthquakes() {
        let cli = Cli::try_parse_from([
            "seismodash",
            "earthquakes",
            "--sort",
            "location.city",
            "--dir",
            "desc",
            "-p",
            "2",
        ])
        .expect("parse");
        let Command::Earthquakes(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.sort, Some(SortField::City));
        assert_eq!(args.dir, SortDirection::Descending);
        assert_eq!(args.page, 2);
    }

    #[test]
    fn test_map_select_needs_boundaries() {
        assert!(Cli::try_parse_from(["seismodash", "map", "--select", "Van"]).is_err());

        let cli = Cli::try_parse_from([
            "seismodash",
            "map",
            "--boundaries",
            "tr-cities.geojson",
            "--select",
            "Van",
        ])
        .expect("parse");
        let Command::Map(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.select.as_deref(), Some("Van"));
        assert_eq!(args.width, 960.0);
    }

    #[test]
    fn test_filter_set_conflicts() {
        let res = Cli::try_parse_from([
            "seismodash",
            "filter",
            "set",
            "--city",
            "Van",
            "--clear-city",
        ]);
        assert!(res.is_err());
    }
}
