use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorshipTask {
    pub id: String,
    pub label: String,
    pub completed: bool,
}

impl WorshipTask {
    fn pending(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            completed: false,
        }
    }
}

/// The fixed catalogue every day starts from, in display order.
pub fn default_tasks() -> Vec<WorshipTask> {
    vec![
        WorshipTask::pending("fajr", "Fajr Prayer"),
        WorshipTask::pending("dhuhr", "Dhuhr Prayer"),
        WorshipTask::pending("asr", "Asr Prayer"),
        WorshipTask::pending("maghrib", "Maghrib Prayer"),
        WorshipTask::pending("isha", "Isha Prayer"),
        WorshipTask::pending("tarawih", "Tarawih Prayer"),
        WorshipTask::pending("quran", "Read Quran"),
        WorshipTask::pending("dhikr", "Morning/Evening Dhikr"),
    ]
}

/// Per-user document mirrored in the remote store. Field names match the
/// local storage keys so both sides share one wire shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteDocument {
    pub worship_history: BTreeMap<String, u8>,
    pub fasting_history: BTreeSet<String>,
}

impl RemoteDocument {
    pub fn is_empty(&self) -> bool {
        self.worship_history.is_empty() && self.fasting_history.is_empty()
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub task_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FastingRequest {
    pub date: Option<String>,
    pub fasted: bool,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    pub start: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: String,
    pub tasks: Vec<WorshipTask>,
    pub completion_percent: u8,
    pub fasting_today: bool,
    pub streak: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: Option<String>,
    pub synced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub date: String,
    pub value: u8,
    pub band: u8,
    pub applicable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: String,
    pub weekday: String,
    pub value: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WeeklyAveragePoint {
    pub week: String,
    pub start_date: String,
    pub end_date: String,
    pub days_counted: u8,
    pub avg_percent: f64,
    pub fasted_days: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub today: u8,
    pub completed_today: usize,
    pub streak: u32,
    pub last_7_days: Vec<DailyPoint>,
    pub heatmap: Vec<HeatmapCell>,
    pub weekly_averages: Vec<WeeklyAveragePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskToggled,
    FastingChanged,
    Merged,
    Reset,
    Bookmark,
}

/// Published after every committed ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub revision: u64,
    pub kind: EventKind,
}
