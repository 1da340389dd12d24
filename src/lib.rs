//! Fetch one 24-hour window of Pulsonic weather-station observations as CSV.
//!
//! The flow is linear: resolve the observation window from an optional date, log in to get a
//! session token, request the CSV export for the window, then hand the CSV to the caller and
//! remove every file staged along the way.
//!
//! ## Quick start
//! - Configure credentials via environment variables (`PULSONIC_MAIL`, `PULSONIC_PASSWORD`,
//!   optionally `PULSONIC_URL` / `PULSONIC_VERIFY`) or a `.pulsonicrc` file (current directory
//!   or home directory).
//! - Build a [`Pipeline`] and run it for a date.
//!
//! ```no_run
//! use anyhow::Result;
//! use pulsonic::{Client, Pipeline};
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let now = chrono::Local::now().naive_local();
//!     let mut stdout = std::io::stdout().lock();
//!     Pipeline::new(client).run(Some("2025-12-30"), now, &mut stdout)?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
mod export;
mod pipeline;
mod staging;
mod util;
mod window;

pub use client::{Client, ClientConfig, Credentials, SessionToken};
pub use config::{ConfigOverrides, DEFAULT_URL};
pub use error::ExportError;
pub use export::{ExportFormat, ExportSpec, Observation};
pub use pipeline::{DEFAULT_MIN_CSV_LEN, Outcome, Pipeline};
pub use staging::StagingArea;
pub use window::{DateRange, ObservationWindow, WindowMode, resolve as resolve_window};
