//! Prayer-times provider client.
//!
//! The provider is treated as a read-only feed: only the daily timings and
//! the Hijri day/month are decoded from its response.

use crate::config::PrayerConfig;
use chrono::{DateTime, Local, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Timings {
    pub imsak: String,
    pub fajr: String,
    pub dhuhr: String,
    pub asr: String,
    pub maghrib: String,
    pub isha: String,
}

impl Timings {
    /// Daily schedule in chronological order.
    pub fn schedule(&self) -> [(&'static str, &str); 6] {
        [
            ("Imsak", self.imsak.as_str()),
            ("Fajr", self.fajr.as_str()),
            ("Dhuhr", self.dhuhr.as_str()),
            ("Asr", self.asr.as_str()),
            ("Maghrib", self.maghrib.as_str()),
            ("Isha", self.isha.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HijriMonth {
    pub en: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HijriDate {
    pub day: String,
    pub month: HijriMonth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerDate {
    pub hijri: HijriDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerData {
    pub timings: Timings,
    pub date: PrayerDate,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    data: PrayerData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextPrayer {
    pub name: String,
    pub label: String,
    pub time: String,
    pub minutes_until: u32,
    pub remaining: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrayerSummary {
    pub timings: Timings,
    pub hijri: String,
    pub next: Option<NextPrayer>,
}

impl PrayerSummary {
    pub fn at(data: PrayerData, minute_of_day: u32) -> Self {
        let next = next_prayer(&data.timings, minute_of_day);
        let hijri = format!("{} {}", data.date.hijri.month.en, data.date.hijri.day);
        Self {
            timings: data.timings,
            hijri,
            next,
        }
    }
}

/// Minutes past midnight for a provider time such as `"04:12"` or
/// `"04:12 (WIB)"`.
pub fn parse_minutes(value: &str) -> Option<u32> {
    let token = value.split_whitespace().next()?;
    let (hours, minutes) = token.split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

pub fn format_remaining(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// First prayer strictly after `minute_of_day`, wrapping to the first entry
/// of the next day once Isha has passed.
pub fn next_prayer(timings: &Timings, minute_of_day: u32) -> Option<NextPrayer> {
    let parsed: Vec<(&'static str, &str, u32)> = timings
        .schedule()
        .into_iter()
        .filter_map(|(name, time)| match parse_minutes(time) {
            Some(minutes) => Some((name, time, minutes)),
            None => {
                warn!(name, time, "skipping unparsable prayer time");
                None
            }
        })
        .collect();

    let (name, time, at) = parsed
        .iter()
        .find(|(_, _, at)| *at > minute_of_day)
        .or_else(|| parsed.first())
        .copied()?;

    let minutes_until = if at > minute_of_day {
        at - minute_of_day
    } else {
        at + 24 * 60 - minute_of_day
    };
    let label = if name == "Imsak" { "Sehri Ends" } else { "Upcoming Prayer" };

    Some(NextPrayer {
        name: name.to_string(),
        label: label.to_string(),
        time: time.split_whitespace().next().unwrap_or(time).to_string(),
        minutes_until,
        remaining: format_remaining(minutes_until),
    })
}

pub fn minute_of_day(now: DateTime<Local>) -> u32 {
    now.hour() * 60 + now.minute()
}

#[derive(Debug)]
pub enum PrayerError {
    Request(reqwest::Error),
    Status(reqwest::StatusCode),
}

impl fmt::Display for PrayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrayerError::Request(err) => write!(f, "prayer times request failed: {err}"),
            PrayerError::Status(status) => {
                write!(f, "prayer times provider answered {status}")
            }
        }
    }
}

impl std::error::Error for PrayerError {}

impl From<reqwest::Error> for PrayerError {
    fn from(err: reqwest::Error) -> Self {
        PrayerError::Request(err)
    }
}

pub struct PrayerClient {
    http: reqwest::Client,
    config: PrayerConfig,
}

impl PrayerClient {
    pub fn new(config: PrayerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Path and query for the timings of the day containing `timestamp`.
    pub fn request(&self, timestamp: i64) -> (String, Vec<(&'static str, String)>) {
        let method = ("method", self.config.method.to_string());
        match self.config.coordinates {
            Some((latitude, longitude)) => (
                format!("{}/timings/{timestamp}", self.config.base_url),
                vec![
                    ("latitude", latitude.to_string()),
                    ("longitude", longitude.to_string()),
                    method,
                ],
            ),
            None => (
                format!("{}/timingsByCity/{timestamp}", self.config.base_url),
                vec![
                    ("city", self.config.city.clone()),
                    ("country", self.config.country.clone()),
                    method,
                ],
            ),
        }
    }

    pub async fn fetch(&self, timestamp: i64) -> Result<PrayerData, PrayerError> {
        let (url, query) = self.request(timestamp);
        debug!(%url, "fetching prayer times");
        let response = self.http.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(PrayerError::Status(response.status()));
        }
        let body: ApiResponse = response.json().await?;
        Ok(body.data)
    }
}

struct CachedTimings {
    date: NaiveDate,
    fetched_at: Instant,
    data: PrayerData,
}

/// Provider client with a per-day cache.
pub struct PrayerService {
    client: PrayerClient,
    ttl: Duration,
    cache: Mutex<Option<CachedTimings>>,
}

impl PrayerService {
    pub fn new(config: PrayerConfig) -> Self {
        let ttl = config.cache_ttl;
        Self {
            client: PrayerClient::new(config),
            ttl,
            cache: Mutex::new(None),
        }
    }

    pub async fn timings(&self, now: DateTime<Local>) -> Result<PrayerData, PrayerError> {
        let today = now.date_naive();
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.date == today && cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.data.clone());
            }
        }

        match self.client.fetch(now.timestamp()).await {
            Ok(data) => {
                *cache = Some(CachedTimings {
                    date: today,
                    fetched_at: Instant::now(),
                    data: data.clone(),
                });
                Ok(data)
            }
            Err(err) => match cache.as_ref() {
                Some(cached) if cached.date == today => {
                    warn!("serving cached prayer times: {err}");
                    Ok(cached.data.clone())
                }
                _ => Err(err),
            },
        }
    }
}
