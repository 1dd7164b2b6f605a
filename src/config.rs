use std::{fmt, time::Duration};

use anyhow::Context;
use chrono::NaiveTime;
use serde::{Deserialize, de::DeserializeOwned};

use crate::scheduler::Schedule;

pub const DEFAULT_URL: &str = "https://homeinfopoint.de/";

const LOGIN_PAGE: &str = "default.php";
const DATA_PAGE: &str = "getdata.php";

/// Login data for one portal account. Fixed for the lifetime of a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    base_url: String,
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Always ends with `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn login_page_url(&self) -> String {
        format!("{}{LOGIN_PAGE}", self.base_url)
    }

    pub fn data_page_url(&self) -> String {
        format!("{}{DATA_PAGE}", self.base_url)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The env vars needed to talk to the portal.
#[derive(Debug, Deserialize)]
pub struct PortalEnv {
    #[serde(default = "default_url")]
    infopoint_url: String,
    infopoint_username: String,
    infopoint_password: String,
    #[serde(default = "default_interval_minutes")]
    infopoint_update_interval_minutes: u64,
    #[serde(default = "default_daily_update_at")]
    infopoint_daily_update_at: String,
    #[serde(default = "default_timeout_secs")]
    infopoint_http_timeout_secs: u64,
    #[serde(default)]
    infopoint_accept_invalid_certs: bool,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_interval_minutes() -> u64 {
    30
}

fn default_daily_update_at() -> String {
    "17:50".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Settings for the HTTP transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(default_timeout_secs()),
            accept_invalid_certs: false,
        }
    }
}

pub struct PortalConfig {
    pub credentials: Credentials,
    pub transport: TransportConfig,
    pub schedule: Schedule,
}

impl PortalConfig {
    pub fn new() -> anyhow::Result<Self> {
        let env = PortalEnv::load_from_env()?;
        Self::from_env(env)
    }

    pub fn from_env(env: PortalEnv) -> anyhow::Result<Self> {
        let credentials = Credentials::new(
            env.infopoint_url,
            env.infopoint_username,
            env.infopoint_password,
        );
        let transport = TransportConfig {
            timeout: Duration::from_secs(env.infopoint_http_timeout_secs),
            accept_invalid_certs: env.infopoint_accept_invalid_certs,
        };
        let interval = match env.infopoint_update_interval_minutes {
            0 => None,
            minutes => {
                let secs = minutes.checked_mul(60).with_context(|| {
                    format!("update interval of {minutes} minutes is too large")
                })?;
                Some(Duration::from_secs(secs))
            }
        };
        let daily_at = parse_daily_time(&env.infopoint_daily_update_at)?;
        Ok(Self {
            credentials,
            transport,
            schedule: Schedule { interval, daily_at },
        })
    }
}

/// Parses `HH:MM`; an empty value disables the daily refresh.
pub fn parse_daily_time(value: &str) -> anyhow::Result<Option<NaiveTime>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let time = NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("invalid daily update time {value:?}, expected HH:MM"))?;
    Ok(Some(time))
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
