//! Command-line arguments for the gateway client.
//!
//! Connection settings may also come from the environment (`CRMS_ADDR`,
//! `CRMS_USER`, `CRMS_PASSWORD`, `CRMS_CODEC`).
use clap::{Parser, Subcommand};
use crms_common::codec::WireCodec;
use crms_common::net::default_gateway_addr;
use crms_common::{AxisSelection, Observations2DLayout};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Gateway address as host:port.
    #[clap(long, env = "CRMS_ADDR", default_value_t = default_gateway_addr())]
    pub addr: String,

    /// Account name. Without it the gateway's default identity is used.
    #[clap(long, env = "CRMS_USER")]
    pub user: Option<String>,

    /// Account password.
    #[clap(long, env = "CRMS_PASSWORD", hide_env_values = true, default_value = "")]
    pub password: String,

    /// Payload encoding on the wire.
    #[clap(long, env = "CRMS_CODEC", value_enum, default_value_t = WireCodec::Json)]
    pub codec: WireCodec,

    /// Seconds allowed to establish the connection.
    #[clap(long, default_value_t = 5)]
    pub connect_timeout_secs: u64,

    /// Seconds allowed for each read or write.
    #[clap(long, default_value_t = 30)]
    pub io_timeout_secs: u64,

    /// Print responses as JSON instead of tables.
    #[clap(long)]
    pub json: bool,

    /// Operation to run.
    #[command(subcommand)]
    pub action: Action,
}

/// Gateway operation selected on the command line.
#[derive(Debug, Subcommand)]
pub enum Action {
    /// Check the gateway is reachable and the session is valid.
    TestLink {
        /// Text echoed back in the diagnostic.
        #[clap(long, default_value = "Test message")]
        message: String,
    },
    /// Read a grid of observations.
    Retrieve {
        /// Axes and layout of the query.
        #[command(flatten)]
        axes: AxisArgs,
        /// Date range, e.g. 01/01/2018 or 01/01/2018-31/12/2018.
        #[clap(long)]
        date_range: Option<String>,
    },
    /// Write a grid of observations.
    Store {
        /// Axes and layout of the values.
        #[command(flatten)]
        axes: AxisArgs,
        /// Three letter currency code of the values.
        #[clap(long)]
        currency: Option<String>,
        /// One row of comma separated values, repeated for each row.
        #[clap(long = "row", required = true)]
        rows: Vec<String>,
    },
}

/// Axis selection shared by retrieve and store.
#[derive(Debug, clap::Args)]
pub struct AxisArgs {
    /// Subject code, repeat for several.
    #[clap(long = "subject", required = true)]
    pub subjects: Vec<String>,

    /// Data type name, repeat for several.
    #[clap(long = "data-type", required = true)]
    pub data_types: Vec<String>,

    /// Publisher code, repeat for several.
    #[clap(long = "publisher")]
    pub publishers: Vec<String>,

    /// Observed period token, repeat for several.
    #[clap(long = "period")]
    pub observed_periods: Vec<String>,

    /// Grid layout.
    #[clap(long, value_enum, default_value_t = Observations2DLayout::default())]
    pub layout: Observations2DLayout,

    /// Swap rows and columns.
    #[clap(long)]
    pub transpose: bool,
}

impl From<AxisArgs> for AxisSelection {
    fn from(args: AxisArgs) -> Self {
        AxisSelection {
            subjects: args.subjects,
            data_types: args.data_types,
            publishers: args.publishers,
            observed_periods: args.observed_periods,
            layout: args.layout,
            transpose_view: args.transpose,
        }
    }
}

/// Split a `--row` argument into cells. Whitespace around cells is dropped.
pub fn parse_row(row: &str) -> Vec<String> {
    row.split(',').map(|cell| cell.trim().to_string()).collect()
}
