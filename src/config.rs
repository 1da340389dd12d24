use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::client::{ClientConfig, Credentials};

pub const DEFAULT_URL: &str = "https://app.pulsonic.com/api";

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    mail: Option<String>,
    password: Option<String>,
    verify: Option<bool>,
    remember_me: Option<bool>,
}

/// Values given explicitly by the caller; anything left `None` is looked up in the
/// environment and then in the rc file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub mail: Option<String>,
    pub password: Option<String>,
    pub verify: Option<bool>,
}

pub(crate) fn load_config(overrides: ConfigOverrides) -> Result<ClientConfig> {
    let mut url = overrides.url.or_else(|| env_string("PULSONIC_URL"));
    let mut mail = overrides.mail.or_else(|| env_string("PULSONIC_MAIL"));
    let mut password = overrides.password.or_else(|| env_string("PULSONIC_PASSWORD"));
    let verify = overrides
        .verify
        .or_else(|| env_string("PULSONIC_VERIFY").map(|v| parse_flag(&v)));

    let rc_candidates = rc_candidates();
    let mut file_verify: Option<bool> = None;
    let mut remember_me: Option<bool> = None;

    for rc_path in &rc_candidates {
        if rc_path.exists() {
            let cfg = read_rc(rc_path).with_context(|| {
                format!("failed to read configuration file {}", rc_path.display())
            })?;

            if url.is_none() {
                url = cfg.url;
            }
            if mail.is_none() {
                mail = cfg.mail;
            }
            if password.is_none() {
                password = cfg.password;
            }
            file_verify = cfg.verify;
            remember_me = cfg.remember_me;
            break;
        }
    }

    let Some(mail) = mail else {
        bail!(missing("mail", "PULSONIC_MAIL", &rc_candidates));
    };
    let Some(password) = password else {
        bail!(missing("password", "PULSONIC_PASSWORD", &rc_candidates));
    };

    Ok(ClientConfig {
        url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        credentials: Credentials {
            mail,
            password,
            remember_me: remember_me.unwrap_or(true),
        },
        // The provider's certificate chain does not validate; verification stays opt-in.
        verify: verify.or(file_verify).unwrap_or(false),
    })
}

fn missing(field: &str, env: &str, rc_candidates: &[PathBuf]) -> String {
    if rc_candidates.is_empty() {
        return format!("Missing configuration: {field} (set {env} or create .pulsonicrc)");
    }
    format!(
        "Missing configuration: {} (set {} or put `{}:` in one of: {})",
        field,
        env,
        field,
        rc_candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(v: &str) -> bool {
    !matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // `mail:` may sit on its own line with the value on the next one.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            if !line.contains(':') {
                set_value(&mut cfg, pk, strip_quotes(line));
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending_key = Some(k);
            } else {
                set_value(&mut cfg, k, v);
            }
        }
    }

    cfg
}

fn set_value(cfg: &mut RcConfig, key: &str, v: &str) {
    match key {
        "url" => cfg.url = Some(v.to_string()),
        "mail" => cfg.mail = Some(v.to_string()),
        "password" => cfg.password = Some(v.to_string()),
        "verify" => cfg.verify = Some(parse_flag(v)),
        "remember_me" => cfg.remember_me = Some(parse_flag(v)),
        _ => {}
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) PULSONIC_RC (explicit)
    // 2) ./.pulsonicrc
    // 3) ~/.pulsonicrc
    if let Ok(p) = std::env::var("PULSONIC_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".pulsonicrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".pulsonicrc"));
    }
    v
}
