use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PRAYER_API_URL: &str = "https://api.aladhan.com/v1";

#[derive(Debug, Clone, PartialEq)]
pub struct PrayerConfig {
    pub base_url: String,
    pub city: String,
    pub country: String,
    pub coordinates: Option<(f64, f64)>,
    /// Calculation method id understood by the provider (20 = Kemenag).
    pub method: u8,
    pub cache_ttl: Duration,
}

impl Default for PrayerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PRAYER_API_URL.to_string(),
            city: "Yogyakarta".to_string(),
            country: "Indonesia".to_string(),
            coordinates: Some((-7.7956, 110.3695)),
            method: 20,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub port: u16,
    pub prayer: PrayerConfig,
    pub remote_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/state.json"),
            port: 8080,
            prayer: PrayerConfig::default(),
            remote_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source, falling back to
    /// defaults for anything unset or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = var("APP_DATA_PATH") {
            config.data_path = PathBuf::from(path);
        }
        if let Some(port) = var("PORT") {
            config.port = parse_var("PORT", &port)?;
        }
        if let Some(url) = var("PRAYER_API_URL") {
            config.prayer.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(city) = var("PRAYER_CITY") {
            config.prayer.city = city;
        }
        if let Some(country) = var("PRAYER_COUNTRY") {
            config.prayer.country = country;
        }
        match (var("PRAYER_LATITUDE"), var("PRAYER_LONGITUDE")) {
            (Some(lat), Some(long)) => {
                config.prayer.coordinates = Some((
                    parse_var("PRAYER_LATITUDE", &lat)?,
                    parse_var("PRAYER_LONGITUDE", &long)?,
                ));
            }
            (None, None) => {
                // An explicit city without coordinates means "look up by city".
                if var("PRAYER_CITY").is_some() {
                    config.prayer.coordinates = None;
                }
            }
            (Some(_), None) => return Err(ConfigError::Missing("PRAYER_LONGITUDE")),
            (None, Some(_)) => return Err(ConfigError::Missing("PRAYER_LATITUDE")),
        }
        if let Some(method) = var("PRAYER_METHOD") {
            config.prayer.method = parse_var("PRAYER_METHOD", &method)?;
        }
        if let Some(secs) = var("PRAYER_CACHE_SECS") {
            config.prayer.cache_ttl = Duration::from_secs(parse_var("PRAYER_CACHE_SECS", &secs)?);
        }
        config.remote_url = var("REMOTE_STORE_URL");

        Ok(config)
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Invalid { name: &'static str, value: String },
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { name, value } => {
                write!(f, "invalid value for {name}: '{value}'")
            }
            ConfigError::Missing(name) => write!(f, "{name} must be set as well"),
        }
    }
}

impl std::error::Error for ConfigError {}
