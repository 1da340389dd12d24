use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

/// Arguments that mean "use the current date".
const AUTO_SENTINELS: [&str; 3] = ["AUTO", "", "undefined"];

/// Timestamp layout the export endpoint expects for `date_range`.
const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Hour of day at which every observation window closes.
pub const ANCHOR_HOUR: u32 = 8;

/// A 24-hour `[from, to)` observation range closing at 08:00 on the reference date.
///
/// The provider interprets both bounds in the export's own `timezone`, so the wall-clock
/// time is sent as-is with the `Z` designator it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationWindow {
    from: NaiveDateTime,
    to: NaiveDateTime,
}

/// How the reference date was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowMode {
    /// No date (or a sentinel) was given.
    Auto,
    /// A valid `YYYY-MM-DD` date was given.
    Manual,
    /// The argument did not parse or was out of range; the current date was used instead.
    Fallback { input: String, reason: String },
}

/// Serialized form used inside the export request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

impl ObservationWindow {
    /// Window ending at 08:00 on `date`, or `None` when its start falls before the earliest
    /// representable date.
    pub fn ending_on(date: NaiveDate) -> Option<Self> {
        let anchor = NaiveTime::from_hms_opt(ANCHOR_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
        let to = date.and_time(anchor);
        let from = to.checked_sub_signed(TimeDelta::hours(24))?;
        Some(Self { from, to })
    }

    /// Window for the current date.
    ///
    /// `now` comes from the system clock, so the `None` branch is only reachable for a clock
    /// set to chrono's first representable day; the window then starts at that bound.
    fn today(now: NaiveDateTime) -> Self {
        Self::ending_on(now.date()).unwrap_or_else(|| Self {
            from: NaiveDateTime::MIN,
            to: NaiveDateTime::MIN + TimeDelta::hours(24),
        })
    }

    pub fn from(&self) -> NaiveDateTime {
        self.from
    }

    pub fn to(&self) -> NaiveDateTime {
        self.to
    }

    pub fn from_api(&self) -> String {
        self.from.format(API_TIME_FORMAT).to_string()
    }

    pub fn to_api(&self) -> String {
        self.to.format(API_TIME_FORMAT).to_string()
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            from: self.from_api(),
            to: self.to_api(),
        }
    }
}

/// Resolves the observation window from the optional command-line date.
///
/// `now` is the caller's local time; it is used for the sentinels and whenever the argument
/// does not parse or yields a window outside chrono's range. Resolution never fails.
pub fn resolve(arg: Option<&str>, now: NaiveDateTime) -> (ObservationWindow, WindowMode) {
    let arg = match arg {
        Some(a) if !AUTO_SENTINELS.contains(&a) => a,
        _ => return (ObservationWindow::today(now), WindowMode::Auto),
    };

    let parsed = NaiveDate::parse_from_str(arg, "%Y-%m-%d")
        .map_err(|e| e.to_string())
        .and_then(|date| {
            ObservationWindow::ending_on(date).ok_or_else(|| "date out of range".to_string())
        });

    match parsed {
        Ok(window) => (window, WindowMode::Manual),
        Err(reason) => (
            ObservationWindow::today(now),
            WindowMode::Fallback {
                input: arg.to_string(),
                reason,
            },
        ),
    }
}
