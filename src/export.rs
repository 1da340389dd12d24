use serde::Serialize;

use crate::window::{DateRange, ObservationWindow};

/// Stations included in every export.
pub const STATIONS: [u32; 4] = [269, 1008, 982, 1006];

/// Observation codes requested for each station.
pub const OBSERVATION_CODES: [&str; 6] = ["32031", "32032", "32033", "32034", "32035", "32036"];

pub const TIMEZONE: &str = "Europe/Paris";

/// Body of the `export_data` request.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSpec {
    pub stations: Vec<u32>,
    pub observations: Vec<Observation>,
    pub timezone: String,
    pub date_range: DateRange,
    pub configuration: ExportFormat,
    /// `0` means no limit.
    pub limit_rows: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub code: String,
    pub aux: u32,
}

/// CSV formatting options understood by the provider.
#[derive(Debug, Clone, Serialize)]
pub struct ExportFormat {
    pub format: String,
    pub delimiter: String,
    pub compression: String,
    pub date_format: String,
    pub headers: bool,
    pub language: String,
    pub date_sorter: String,
    pub default_values: bool,
    pub missing_value_placeholder: String,
    pub decimal: String,
    pub missing_values: bool,
    pub timezone: String,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self {
            format: "CSV".into(),
            delimiter: ",".into(),
            compression: "none".into(),
            date_format: "DD/MM/YYYY HH:MM".into(),
            headers: true,
            language: "en".into(),
            date_sorter: "desc".into(),
            default_values: false,
            missing_value_placeholder: String::new(),
            decimal: ".".into(),
            missing_values: false,
            timezone: TIMEZONE.into(),
        }
    }
}

impl ExportSpec {
    /// The fixed station/observation export for `window`.
    pub fn for_window(window: &ObservationWindow) -> Self {
        Self {
            stations: STATIONS.to_vec(),
            observations: OBSERVATION_CODES
                .iter()
                .map(|code| Observation {
                    code: (*code).to_string(),
                    aux: 0,
                })
                .collect(),
            timezone: TIMEZONE.into(),
            date_range: window.date_range(),
            configuration: ExportFormat::default(),
            limit_rows: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn spec_serializes_to_provider_layout() {
        let window =
            ObservationWindow::ending_on(NaiveDate::from_ymd_opt(2025, 12, 30).unwrap()).unwrap();
        let v = serde_json::to_value(ExportSpec::for_window(&window)).unwrap();

        assert_eq!(v["stations"], json!([269, 1008, 982, 1006]));
        assert_eq!(v["observations"].as_array().unwrap().len(), 6);
        assert_eq!(v["observations"][0], json!({"code": "32031", "aux": 0}));
        assert_eq!(v["observations"][5], json!({"code": "32036", "aux": 0}));
        assert_eq!(v["timezone"], "Europe/Paris");
        assert_eq!(
            v["date_range"],
            json!({"from": "2025-12-29T08:00:00.000Z", "to": "2025-12-30T08:00:00.000Z"})
        );
        assert_eq!(v["limit_rows"], 0);
    }

    #[test]
    fn format_options_request_plain_csv_with_headers() {
        let v = serde_json::to_value(ExportFormat::default()).unwrap();
        assert_eq!(
            v,
            json!({
                "format": "CSV",
                "delimiter": ",",
                "compression": "none",
                "date_format": "DD/MM/YYYY HH:MM",
                "headers": true,
                "language": "en",
                "date_sorter": "desc",
                "default_values": false,
                "missing_value_placeholder": "",
                "decimal": ".",
                "missing_values": false,
                "timezone": "Europe/Paris"
            })
        );
    }
}
