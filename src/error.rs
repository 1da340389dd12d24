use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between login and printing the CSV.
///
/// Only [`ExportError::AuthenticationFailed`] is fatal; the rest are soft failures that leave
/// stdout empty but still exit successfully.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("export request could not be sent to {url}")]
    ExportRequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    ExportRejected(String),

    #[error("CSV export could not be streamed into '{path}'")]
    ExportStreamFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV export was not produced ({0})")]
    ExportArtifactMissing(PathBuf),

    #[error("CSV export '{path}' could not be read")]
    ExportReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write CSV to the output")]
    OutputWriteFailed(#[source] std::io::Error),

    #[error("CSV export looks empty or truncated ({len} character(s), need more than {min})")]
    ExportEmpty { len: usize, min: usize },
}

impl ExportError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExportError::AuthenticationFailed(_))
    }
}

/// Error payload returned by the provider on non-success responses.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default, alias = "error")]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
}

/// Builds a diagnostic for a non-success response, using the provider's message when the body
/// carries one.
pub(crate) fn format_api_error(status: StatusCode, url: &str, body: &str) -> String {
    let e = serde_json::from_str::<ApiErrorResponse>(body).unwrap_or_default();
    let title = e.title.as_deref().or(e.message.as_deref()).unwrap_or("");
    let detail = e.detail.as_deref().unwrap_or("");

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return format!(
            "Pulsonic rejected the credentials (HTTP {}).\n- Check PULSONIC_MAIL / PULSONIC_PASSWORD or the `mail:`/`password:` entries in .pulsonicrc\n- The session may have expired between login and export\n\nServer message: {}\n{}\nrequest: {}",
            status.as_u16(),
            title,
            detail,
            url
        );
    }

    if status == StatusCode::NOT_FOUND {
        return format!(
            "Pulsonic endpoint not found (HTTP 404).\n- Check the configured base URL (default https://app.pulsonic.com/api)\n\nServer message: {}\n{}\nrequest: {}",
            title, detail, url
        );
    }

    if title.is_empty() && detail.is_empty() {
        let snippet: String = body.chars().take(200).collect();
        return format!(
            "request failed: HTTP {} for url ({})\n{}",
            status.as_u16(),
            url,
            snippet
        );
    }

    format!(
        "request failed: HTTP {} for url ({})\n{}\n{}",
        status.as_u16(),
        url,
        title,
        detail
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_points_at_credentials() {
        let msg = format_api_error(
            StatusCode::UNAUTHORIZED,
            "https://app.pulsonic.com/api/login/",
            r#"{"message":"bad password"}"#,
        );
        assert!(msg.contains("HTTP 401"));
        assert!(msg.contains("PULSONIC_MAIL"));
        assert!(msg.contains("bad password"));
    }

    #[test]
    fn non_json_body_is_quoted() {
        let msg = format_api_error(StatusCode::BAD_GATEWAY, "u", "<html>upstream down</html>");
        assert!(msg.contains("HTTP 502"));
        assert!(msg.contains("upstream down"));
    }

    #[test]
    fn only_authentication_is_fatal() {
        assert!(ExportError::AuthenticationFailed("x".into()).is_fatal());
        assert!(!ExportError::ExportEmpty { len: 3, min: 50 }.is_fatal());
        assert!(!ExportError::ExportArtifactMissing(PathBuf::from("a.csv")).is_fatal());
        assert!(!ExportError::ExportRejected("x".into()).is_fatal());
    }
}
