//! The run from date argument to printed CSV.

use chrono::NaiveDateTime;
use log::{error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::client::Client;
use crate::error::ExportError;
use crate::export::ExportSpec;
use crate::staging::StagingArea;
use crate::window::{self, WindowMode};

/// Content at or below this many characters is treated as headers-only.
///
/// Provisional: a single short data row could fall under it and a long header could exceed it.
pub const DEFAULT_MIN_CSV_LEN: usize = 50;

/// How a run ended, short of a fatal error.
#[derive(Debug)]
pub enum Outcome {
    /// CSV was written to the output; `chars` is its length.
    Delivered { chars: usize },
    /// Nothing was written; the reason has already been logged.
    NoData(ExportError),
}

impl Outcome {
    pub fn delivered(&self) -> bool {
        matches!(self, Outcome::Delivered { .. })
    }
}

#[derive(Debug)]
pub struct Pipeline {
    client: Client,
    work_dir: PathBuf,
    min_csv_len: usize,
}

impl Pipeline {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            work_dir: PathBuf::from("."),
            min_csv_len: DEFAULT_MIN_CSV_LEN,
        }
    }

    /// Directory the transient CSV file is staged in.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_min_csv_len(mut self, min: usize) -> Self {
        self.min_csv_len = min;
        self
    }

    /// Resolves the window for `date_arg`, logs in, exports and writes the CSV to `out`.
    ///
    /// `now` is the local wall-clock time used when no usable date is given. Only an
    /// authentication failure is returned as `Err`; every other problem is logged and reported
    /// as [`Outcome::NoData`]. Staged files are removed on every path.
    pub fn run<W: Write>(
        &self,
        date_arg: Option<&str>,
        now: NaiveDateTime,
        out: &mut W,
    ) -> Result<Outcome, ExportError> {
        let (window, mode) = window::resolve(date_arg, now);
        match &mode {
            WindowMode::Auto => info!("AUTO mode: target {}", window.to().date()),
            WindowMode::Manual => info!("manual mode: target {}", window.to().date()),
            WindowMode::Fallback { input, reason } => warn!(
                "invalid date '{}' ({}), falling back to AUTO mode: target {}",
                input,
                reason,
                window.to().date()
            ),
        }
        info!("requested period: {} to {}", window.from(), window.to());

        let mut staging = StagingArea::new(&self.work_dir);

        let token = match self.client.login() {
            Ok(token) => token,
            Err(e) => {
                error!("{}", e);
                staging.cleanup();
                return Err(e);
            }
        };

        let spec = ExportSpec::for_window(&window);
        let csv_path = staging.csv_path();

        let outcome = match self.client.export(&token, &spec, &csv_path) {
            Ok(_) => self.emit(&csv_path, out),
            Err(e) => Outcome::NoData(e),
        };

        match &outcome {
            Outcome::Delivered { chars } => info!("delivered {} character(s) of CSV", *chars),
            Outcome::NoData(e) => error!("{}", e),
        }

        staging.cleanup();
        Ok(outcome)
    }

    fn emit<W: Write>(&self, csv_path: &Path, out: &mut W) -> Outcome {
        if !csv_path.exists() {
            return Outcome::NoData(ExportError::ExportArtifactMissing(csv_path.to_path_buf()));
        }

        let content = match std::fs::read_to_string(csv_path) {
            Ok(c) => c,
            Err(source) => {
                return Outcome::NoData(ExportError::ExportReadFailed {
                    path: csv_path.to_path_buf(),
                    source,
                });
            }
        };

        let chars = content.chars().count();
        if chars <= self.min_csv_len {
            return Outcome::NoData(ExportError::ExportEmpty {
                len: chars,
                min: self.min_csv_len,
            });
        }

        if let Err(e) = out.write_all(content.as_bytes()).and_then(|_| out.flush()) {
            return Outcome::NoData(ExportError::OutputWriteFailed(e));
        }

        Outcome::Delivered { chars }
    }
}
