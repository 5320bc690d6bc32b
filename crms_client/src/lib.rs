//! Client library for the observation gateway.
//!
//! The crate aggregates:
//! - `config`: where the gateway lives and how to talk to it.
//! - `sender`: the `Transport` seam and its framed TCP implementation.
//! - `gateway`: the session-holding `Gateway` with the four gateway operations.
//!
//! ```no_run
//! use crms_client::{ClientConfig, Gateway};
//! use crms_common::RetrieveObservations2DCommand;
//!
//! let mut gateway = Gateway::connect(ClientConfig::default());
//! gateway.login("analyst", "analyst-password");
//! println!("{}", gateway.test_link("Test message"));
//!
//! let mut query = RetrieveObservations2DCommand::new();
//! query.add_subject("BHP").add_data_type("CLOSE PRICE").set_date_range("01/01/2018");
//! let response = gateway.retrieve_observations_2d(&query)?;
//! println!("{}", response.values);
//! # Ok::<(), crms_common::GatewayError>(())
//! ```
#![warn(missing_docs)]
pub mod config;
pub mod gateway;
pub mod sender;

pub use config::ClientConfig;
pub use gateway::{Gateway, Session};
pub use sender::{TcpTransport, Transport};
