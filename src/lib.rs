//! A client library for Prefinery, a service for running invite-gated beta programs.
//!
//! # Overview
//!
//! The library revolves around a [`Client`] that knows the account credentials and the betas
//! the account manages. Each [`Beta`] is reached through a [`BetaRef`], which implements
//! [`TesterRepository`]: listing, fetching, adding, updating and deleting [`Tester`]s, checking
//! them in and validating their invite codes.
//!
//! ```no_run
//! # use prefinery::{Settings, ClientConfig, TesterRepository};
//! # fn main() -> prefinery::Result<()> {
//! let settings = Settings::from_path("prefinery.json")?;
//! let client = ClientConfig::from_settings(settings).to_client();
//!
//! if let Some(beta) = client.beta_by_name("launch") {
//!     for tester in beta.get_testers()? {
//!         let tester = tester?;
//!         println!("{} is {}", tester.email, tester.status);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Invite codes can also be checked locally with [`Beta::is_valid_invite_code`], which derives
//! the expected code from the beta's decode key instead of asking the server.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Precondition failures (for example updating a
//! tester that was never added) are detected before any request is sent and can be told apart
//! with [`Error::is_precondition`]. Errors reported by Prefinery surface as [`Error::Service`].
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages under the `prefinery` target. API keys are never logged.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod beta;
mod client;
mod config;
mod error;
mod invite_code;
mod request;
mod response;
mod tester;
pub mod transport;

pub use beta::{Beta, BetaRef, TesterRepository};
pub use client::Client;
pub use config::{AccountSettings, BetaSettings, ClientConfig, Settings};
pub use error::{Error, Result};
pub use response::Testers;
pub use tester::{Profile, Tester, TesterStatus};
