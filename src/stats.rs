use crate::ledger::Ledger;
use crate::models::{DailyPoint, HeatmapCell, StatsResponse, WeeklyAveragePoint, WorshipTask};
use crate::storage::KeyValueStore;
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::collections::BTreeSet;

pub const HEATMAP_DAYS: u32 = 30;
pub const MAX_HEATMAP_DAYS: u32 = 366;
const WEEK_COUNT: usize = 4;

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Share of completed tasks as a whole percentage, rounded half up.
pub fn completion_percent(tasks: &[WorshipTask]) -> u8 {
    let total = tasks.len();
    if total == 0 {
        return 0;
    }
    let completed = tasks.iter().filter(|task| task.completed).count();
    ((completed * 100 + total / 2) / total) as u8
}

/// Consecutive fasted days ending today, or ending yesterday when today is
/// not marked yet.
pub fn streak_at(today: NaiveDate, fasted: &BTreeSet<String>) -> u32 {
    let yesterday = today - Duration::days(1);
    let start = if fasted.contains(&date_key(today)) {
        today
    } else if fasted.contains(&date_key(yesterday)) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 0;
    let mut cursor = Some(start);
    while let Some(date) = cursor {
        if !fasted.contains(&date_key(date)) {
            break;
        }
        streak += 1;
        cursor = date.pred_opt();
    }
    streak
}

/// Heatmap intensity tier. Thresholds cascade: the highest one reached wins.
pub fn band(value: u8) -> u8 {
    let mut band = 0;
    if value > 0 {
        band = 1;
    }
    if value >= 40 {
        band = 2;
    }
    if value >= 70 {
        band = 3;
    }
    if value == 100 {
        band = 4;
    }
    band
}

pub fn heatmap_cell<S: KeyValueStore>(today: NaiveDate, ledger: &Ledger<S>, date: NaiveDate) -> HeatmapCell {
    let value = ledger.heatmap_value(today, date);
    HeatmapCell {
        date: date_key(date),
        value,
        band: band(value),
        applicable: date <= today,
    }
}

pub fn build_heatmap<S: KeyValueStore>(
    today: NaiveDate,
    ledger: &Ledger<S>,
    start: NaiveDate,
    days: u32,
) -> Vec<HeatmapCell> {
    start
        .iter_days()
        .take(days as usize)
        .map(|date| heatmap_cell(today, ledger, date))
        .collect()
}

/// Window of `HEATMAP_DAYS` ending today.
pub fn default_heatmap_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(HEATMAP_DAYS) - 1)
}

pub fn build_stats_at<S: KeyValueStore>(today: NaiveDate, ledger: &Ledger<S>) -> StatsResponse {
    let tasks = ledger.today_tasks(today);

    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Duration::days(offset);
        last_7_days.push(DailyPoint {
            date: date_key(date),
            weekday: date.format("%a").to_string(),
            value: ledger.heatmap_value(today, date),
        });
    }

    let current_week_start = week_start(today);
    let mut weekly_averages = Vec::with_capacity(WEEK_COUNT);
    for offset in (0..WEEK_COUNT).rev() {
        let start = current_week_start - Duration::weeks(offset as i64);
        let end = start + Duration::days(6);

        let mut percent_sum = 0u32;
        let mut fasted_days = 0u8;
        for day_offset in 0..7 {
            let date = start + Duration::days(day_offset);
            if date > today {
                break;
            }
            percent_sum += u32::from(ledger.heatmap_value(today, date));
            if ledger.fasted_on(date) {
                fasted_days += 1;
            }
        }

        let days_counted = if today < start {
            0
        } else if today > end {
            7
        } else {
            (today - start).num_days() as u8 + 1
        };
        let denom = if days_counted == 0 { 1.0 } else { f64::from(days_counted) };

        weekly_averages.push(WeeklyAveragePoint {
            week: week_label(start),
            start_date: date_key(start),
            end_date: date_key(end),
            days_counted,
            avg_percent: f64::from(percent_sum) / denom,
            fasted_days,
        });
    }

    StatsResponse {
        today: completion_percent(&tasks),
        completed_today: tasks.iter().filter(|task| task.completed).count(),
        streak: ledger.streak(today),
        last_7_days,
        heatmap: build_heatmap(today, ledger, default_heatmap_start(today), HEATMAP_DAYS),
        weekly_averages,
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}
