use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::config::{ConfigOverrides, load_config};
use crate::error::{ExportError, format_api_error};
use crate::export::ExportSpec;
use crate::util::urljoin;

/// Header carrying the session token on export calls.
const TOKEN_HEADER: &str = "access-token";

/// Token field names accepted in the login reply, in order of preference.
const TOKEN_FIELDS: [&str; 2] = ["token", "access_token"];

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL, typically `https://app.pulsonic.com/api`.
    pub url: String,
    pub credentials: Credentials,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

/// Login body. The password never shows up in `Debug` output.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub mail: String,
    pub password: String,
    pub remember_me: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("mail", &self.mail)
            .field("password", &"[REDACTED]")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

/// Opaque bearer value returned by the login endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken([REDACTED])")
    }
}

/// Blocking client for the Pulsonic login and export endpoints.
///
/// The session cookie set at login lives in the client's cookie store and is replayed on the
/// export call, so the same `Client` must be used for both.
#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    credentials: Credentials,

    user_agent: String,
    timeout: Duration,
    progress: bool,

    http: HttpClient,
}

impl Client {
    /// Creates a client using environment variables and/or `.pulsonicrc`.
    pub fn from_env() -> Result<Self> {
        Self::new(ConfigOverrides::default())
    }

    /// Creates a client using (in order of precedence):
    /// - explicit overrides
    /// - environment variables `PULSONIC_URL` / `PULSONIC_MAIL` / `PULSONIC_PASSWORD` /
    ///   `PULSONIC_VERIFY`
    /// - config file from `PULSONIC_RC` or `.pulsonicrc`
    pub fn new(overrides: ConfigOverrides) -> Result<Self> {
        Self::with_config(load_config(overrides)?)
    }

    pub fn with_config(cfg: ClientConfig) -> Result<Self> {
        let mut builder = HttpClient::builder().cookie_store(true);

        if !cfg.verify {
            debug!("TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            url: cfg.url,
            credentials: cfg.credentials,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            progress: false,
            http,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Exchanges the configured credentials for a session token.
    ///
    /// Every way this can go wrong (transport, HTTP status, body shape, missing token) is
    /// reported as [`ExportError::AuthenticationFailed`].
    pub fn login(&self) -> Result<SessionToken, ExportError> {
        let url = urljoin(&self.url, "login/");
        debug!("logging in as {} at {}", self.credentials.mail, url);

        let resp = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .header(USER_AGENT, self.user_agent_header())
            .json(&self.credentials)
            .send()
            .map_err(|e| {
                ExportError::AuthenticationFailed(format!("login request failed: {e}"))
            })?;

        let status = resp.status();
        let text = resp.text().map_err(|e| {
            ExportError::AuthenticationFailed(format!("could not read login response: {e}"))
        })?;

        if !status.is_success() {
            return Err(ExportError::AuthenticationFailed(format_api_error(
                status, &url, &text,
            )));
        }

        extract_token(&text)
    }

    /// Requests the CSV export described by `spec` and streams the body into `target`.
    ///
    /// Returns the number of bytes written. `target` is only created once the server has
    /// answered with a success status.
    pub fn export(
        &self,
        token: &SessionToken,
        spec: &ExportSpec,
        target: &Path,
    ) -> Result<u64, ExportError> {
        let url = urljoin(&self.url, "export_data/");
        debug!(
            "requesting export of {} station(s) from {} to {}",
            spec.stations.len(),
            spec.date_range.from,
            spec.date_range.to
        );

        let resp = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .header(USER_AGENT, self.user_agent_header())
            .header(TOKEN_HEADER, token.as_str())
            .json(spec)
            .send()
            .map_err(|source| ExportError::ExportRequestFailed {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(ExportError::ExportRejected(format_api_error(
                status, &url, &text,
            )));
        }

        self.download(resp, target)
    }

    fn download(&self, mut resp: Response, target: &Path) -> Result<u64, ExportError> {
        let stream_err = |source: std::io::Error| ExportError::ExportStreamFailed {
            path: target.to_path_buf(),
            source,
        };

        let mut out = File::create(target).map_err(stream_err)?;

        let pb = if self.progress {
            let pb = match resp.content_length() {
                Some(len) => ProgressBar::new(len),
                None => ProgressBar::new_spinner(),
            };
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            Some(pb)
        } else {
            None
        };

        let mut written: u64 = 0;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = match resp.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => return Err(stream_err(e)),
            };

            out.write_all(&buf[..n]).map_err(stream_err)?;
            written += n as u64;
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }

        out.flush().map_err(stream_err)?;
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        info!("received {} byte(s) of CSV", written);
        Ok(written)
    }

    fn user_agent_header(&self) -> HeaderValue {
        HeaderValue::from_str(&self.user_agent)
            .unwrap_or(HeaderValue::from_static("pulsonic-export"))
    }
}

/// Pulls the session token out of a login reply body.
pub(crate) fn extract_token(body: &str) -> Result<SessionToken, ExportError> {
    if body.trim().is_empty() {
        return Err(ExportError::AuthenticationFailed(
            "empty login response".into(),
        ));
    }

    let value: Value = serde_json::from_str(body).map_err(|e| {
        ExportError::AuthenticationFailed(format!("login response is not valid JSON: {e}"))
    })?;

    TOKEN_FIELDS
        .iter()
        .filter_map(|field| value.get(field).and_then(Value::as_str))
        .find(|t| !t.is_empty())
        .map(|t| SessionToken(t.to_string()))
        .ok_or_else(|| {
            ExportError::AuthenticationFailed("token not found in login response".into())
        })
}
