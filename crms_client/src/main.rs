//! Gateway client: runs one gateway operation from the command line and
//! prints the response.
//!
//! Usage example (CLI):
//! ```bash
//! crms_client --user analyst --password analyst-password test-link
//! crms_client retrieve --subject BHP --data-type "CLOSE PRICE" --date-range 01/01/2018
//! crms_client store --subject BHP --subject NAB --data-type "CLOSE PRICE" \
//!     --currency AUD --row 45 --row 20
//! ```
//!
//! The process exits with status 1 when the gateway reports a failure.
#![warn(missing_docs)]
mod args;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use crms_client::{ClientConfig, Gateway};
use crms_common::{
    Result, RetrieveObservations2DCommand, StoreObservations2DCommand, ValueGrid,
};
use log::{error, info};

use crate::args::{Action, Args, parse_row};

fn main() -> ExitCode {
    init_logger();
    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run the selected action. `Ok(false)` means the gateway reported a failure.
fn run(args: Args) -> Result<bool> {
    let config = ClientConfig::new(args.addr.trim())
        .with_codec(args.codec)
        .with_connect_timeout(Duration::from_secs(args.connect_timeout_secs))
        .with_io_timeout(Duration::from_secs(args.io_timeout_secs));
    info!("Using gateway at {} ({})", config.address, config.codec);

    let mut gateway = Gateway::connect(config);
    if let Some(user) = args.user {
        gateway.login(user, args.password);
    }

    let succeeded = match args.action {
        Action::TestLink { message } => {
            let diagnostic = gateway.test_link(&message);
            if args.json {
                println!("{}", serde_json::json!({ "message": diagnostic }));
            } else {
                println!("{}", diagnostic);
            }
            !diagnostic.contains("failed")
        }
        Action::Retrieve { axes, date_range } => {
            let mut command = RetrieveObservations2DCommand::new();
            command.select_axes(axes.into());
            if let Some(range) = date_range {
                command.set_date_range(range);
            }

            let response = gateway.retrieve_observations_2d(&command)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("Status: {}", response.status);
                if let Some(message) = &response.message {
                    println!("Message: {}", message);
                }
                if !response.values.is_empty() {
                    println!("{}", response.values);
                }
            }
            response.is_available()
        }
        Action::Store {
            axes,
            currency,
            rows,
        } => {
            let mut command = StoreObservations2DCommand::new();
            command.select_axes(axes.into());
            if let Some(currency) = currency {
                command.set_currency(currency);
            }
            command.set_values(ValueGrid::from_rows(
                rows.iter().map(|row| parse_row(row)).collect(),
            )?);

            let response = gateway.store_observations_2d(&command)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("Errors: {}", response.errors_total);
                for cell in &response.errors {
                    println!("  row {} column {}: {}", cell.row, cell.column, cell.reason);
                }
                if let Some(message) = &response.message {
                    println!("Message: {}", message);
                }
            }
            response.is_success()
        }
    };

    gateway.disconnect();
    Ok(succeeded)
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
