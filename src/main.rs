use clap::Parser;
use log::{Level, LevelFilter, Log, Metadata, error};
use std::process::ExitCode;
use std::time::Duration;

use pulsonic::{Client, ConfigOverrides, DEFAULT_MIN_CSV_LEN, Pipeline};

/// Print one 24-hour window (08:00 to 08:00) of Pulsonic station observations as CSV.
///
/// The CSV goes to stdout and nothing else does; diagnostics go to stderr. Exits with 1 only
/// when login fails or credentials are missing. An empty stdout with status 0 means no usable
/// data was produced.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Target date as YYYY-MM-DD, or AUTO / "" / undefined for today.
    ///
    /// Anything else, including values starting with `-`, falls back to today with a warning.
    #[arg(allow_hyphen_values = true)]
    date: Option<String>,

    /// Base API URL [env: PULSONIC_URL].
    #[arg(long)]
    url: Option<String>,

    /// Login mail [env: PULSONIC_MAIL].
    #[arg(long)]
    mail: Option<String>,

    /// Login password [env: PULSONIC_PASSWORD].
    #[arg(long)]
    password: Option<String>,

    /// Verify the provider's TLS certificate [env: PULSONIC_VERIFY].
    #[arg(long, conflicts_with = "insecure")]
    verify: bool,

    /// Skip TLS certificate verification (the default).
    #[arg(long)]
    insecure: bool,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// User-Agent sent on both requests.
    #[arg(long, default_value = "Mozilla/5.0")]
    user_agent: String,

    /// CSV at or below this many characters is treated as empty.
    #[arg(long, default_value_t = DEFAULT_MIN_CSV_LEN)]
    min_csv_len: usize,

    /// Show a download progress bar on stderr.
    #[arg(long)]
    progress: bool,
}

/// Log target prefix shared by the library (`pulsonic::*`) and this binary (`pulsonic_export`).
const LOG_TARGET: &str = "pulsonic";

fn log_builder() -> env_logger::Builder {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.target(env_logger::Target::Stderr);
    builder
}

/// Stderr logging from `RUST_LOG` (default `info`).
///
/// Warnings and errors from this crate are the caller's only failure signal, so they stay
/// enabled even when `RUST_LOG` silences them.
fn init_logging() {
    let warning = Metadata::builder()
        .target(LOG_TARGET)
        .level(Level::Warn)
        .build();

    let mut builder = log_builder();
    if !log_builder().build().enabled(&warning) {
        builder.filter_module(LOG_TARGET, LevelFilter::Warn);
    }
    builder.init();
}

fn main() -> ExitCode {
    init_logging();

    let args = Args::parse();

    let verify = if args.verify {
        Some(true)
    } else if args.insecure {
        Some(false)
    } else {
        None
    };

    let client = match Client::new(ConfigOverrides {
        url: args.url,
        mail: args.mail,
        password: args.password,
        verify,
    }) {
        Ok(c) => c
            .with_timeout(Duration::from_secs(args.timeout))
            .with_user_agent(args.user_agent)
            .with_progress(args.progress),
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = Pipeline::new(client).with_min_csv_len(args.min_csv_len);
    let now = chrono::Local::now().naive_local();
    let mut stdout = std::io::stdout().lock();

    match pipeline.run(args.date.as_deref(), now, &mut stdout) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) if e.is_fatal() => ExitCode::FAILURE,
        Err(_) => ExitCode::SUCCESS,
    }
}
