use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

pub const DEFAULT_PORTAL_URL: &str = "https://spectrum.um.edu.my";
pub const DEFAULT_DATA_DIR: &str = "spectrum-buddy-data";
pub const DEFAULT_INTERVAL_MINUTES: u64 = 30;
pub const DEFAULT_INITIAL_DELAY_MINUTES: u64 = 1;

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: Url,
    /// Raw `Cookie` header value carrying the authenticated session.
    pub session_cookie: Option<String>,
    pub request_timeout: Duration,
}

impl PortalConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let raw = std::env::var("SPECTRUM_BUDDY_PORTAL_URL")
            .unwrap_or_else(|_| DEFAULT_PORTAL_URL.to_owned());
        let base_url = parse_portal_url(&raw)
            .with_context(|| format!("invalid SPECTRUM_BUDDY_PORTAL_URL={raw:?}"))?;
        let session_cookie = std::env::var("SPECTRUM_BUDDY_SESSION_COOKIE")
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());
        Ok(Self {
            base_url,
            session_cookie,
            request_timeout: Duration::from_secs(20),
        })
    }

    pub fn landing_url(&self) -> anyhow::Result<Url> {
        self.base_url.join("/my/").context("build landing page url")
    }

    pub fn service_url(&self) -> anyhow::Result<Url> {
        self.base_url
            .join("/lib/ajax/service.php")
            .context("build ajax service url")
    }

    pub fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }
}

pub fn parse_portal_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim()).context("parse portal url")?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("portal url must be http/https: {url}");
    }
    if url.host_str().is_none() {
        anyhow::bail!("portal url must have host: {url}");
    }
    Ok(url)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub interval: Duration,
    pub initial_delay: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_MINUTES * 60),
            initial_delay: Duration::from_secs(DEFAULT_INITIAL_DELAY_MINUTES * 60),
        }
    }
}

impl ScheduleConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let interval = minutes_from_env("SPECTRUM_BUDDY_INTERVAL_MINUTES", DEFAULT_INTERVAL_MINUTES)?;
        let initial_delay = minutes_from_env(
            "SPECTRUM_BUDDY_INITIAL_DELAY_MINUTES",
            DEFAULT_INITIAL_DELAY_MINUTES,
        )?;
        if interval.is_zero() {
            anyhow::bail!("SPECTRUM_BUDDY_INTERVAL_MINUTES must be at least 1");
        }
        Ok(Self {
            interval,
            initial_delay,
        })
    }
}

fn minutes_from_env(key: &str, default: u64) -> anyhow::Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => parse_minutes(&raw)
            .and_then(minutes_to_duration)
            .with_context(|| format!("invalid {key}={raw:?}")),
        Err(_) => minutes_to_duration(default),
    }
}

/// Upper bound for any schedule duration: one year.
pub const MAX_MINUTES: u64 = 366 * 24 * 60;

pub fn minutes_to_duration(minutes: u64) -> anyhow::Result<Duration> {
    if minutes > MAX_MINUTES {
        anyhow::bail!("at most {MAX_MINUTES} minutes allowed, got {minutes}");
    }
    let secs = minutes
        .checked_mul(60)
        .ok_or_else(|| anyhow::anyhow!("minutes out of range: {minutes}"))?;
    Ok(Duration::from_secs(secs))
}

fn parse_minutes(raw: &str) -> anyhow::Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|err| anyhow::anyhow!("expected whole minutes: {err}"))
}

/// Width of the medium-urgency band in the panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UrgencyScale {
    #[default]
    Week,
    FourDays,
}

impl UrgencyScale {
    pub fn from_env() -> anyhow::Result<Self> {
        let raw = std::env::var("SPECTRUM_BUDDY_URGENCY_SCALE").unwrap_or_default();
        Self::parse(&raw).with_context(|| {
            format!("invalid SPECTRUM_BUDDY_URGENCY_SCALE={raw:?}. expected one of: week, four-days")
        })
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "week" => Ok(Self::Week),
            "four-days" | "4d" => Ok(Self::FourDays),
            other => anyhow::bail!("unsupported urgency scale: {other}"),
        }
    }

    pub fn medium_window(self) -> chrono::Duration {
        match self {
            Self::Week => chrono::Duration::days(7),
            Self::FourDays => chrono::Duration::days(4),
        }
    }
}

pub fn data_dir_from_env() -> PathBuf {
    std::env::var("SPECTRUM_BUDDY_DATA_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}
