use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "lab-voting.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub poll_interval: Duration,
    pub auth_token: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            poll_interval: Duration::from_secs(5),
            auth_token: None,
            request_timeout: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    base_url: Option<String>,
    poll_interval_seconds: Option<u64>,
    auth_token: Option<String>,
    request_timeout_seconds: Option<u64>,
}

/// Defaults, then the TOML file if present, then environment.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

pub fn load_settings_with(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        if let Some(v) = file_cfg.base_url {
            settings.base_url = v;
        }
        if let Some(v) = file_cfg.poll_interval_seconds {
            settings.poll_interval = Duration::from_secs(v);
        }
        if let Some(v) = file_cfg.auth_token {
            settings.auth_token = Some(v);
        }
        if let Some(v) = file_cfg.request_timeout_seconds {
            settings.request_timeout = Some(Duration::from_secs(v));
        }
    }

    if let Some(v) = env("LAB_VOTING_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = env("LAB_VOTING_POLL_SECONDS").or_else(|| env("APP__POLL_SECONDS")) {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.poll_interval = Duration::from_secs(parsed);
        }
    }

    if let Some(v) = env("LAB_VOTING_TOKEN") {
        settings.auth_token = Some(v);
    }
    if let Some(v) = env("APP__TOKEN") {
        settings.auth_token = Some(v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout = Some(Duration::from_secs(parsed));
        }
    }

    if settings.poll_interval.is_zero() {
        settings.poll_interval = Settings::default().poll_interval;
    }

    Ok(settings)
}

/// Accepts `host:port`, `http://host` or `https://host/prefix/` and returns
/// an absolute URL without a trailing slash.
pub fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Settings::default().base_url);
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let url = Url::parse(&candidate).with_context(|| format!("invalid base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("base url must use http or https, got '{}'", url.scheme());
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}
