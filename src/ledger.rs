//! Worship and fasting ledger.
//!
//! The ledger owns the local key-value store and keeps the decoded history in
//! memory. Every mutation writes through to the store immediately; flushing
//! the store to disk is left to the caller.

use crate::models::{RemoteDocument, WorshipTask, default_tasks};
use crate::stats::{completion_percent, date_key, streak_at};
use crate::storage::{
    FASTING_HISTORY_KEY, FASTING_STATUS_KEY, KeyValueStore, LocalStore, TASKS_KEY_PREFIX,
    WORSHIP_HISTORY_KEY, read_json, tasks_key, write_json,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug)]
pub struct Ledger<S = LocalStore> {
    store: S,
    history: BTreeMap<String, u8>,
    fasting: BTreeSet<String>,
    revision: u64,
}

impl<S: KeyValueStore> Ledger<S> {
    /// Decodes the ledger from `store`. The stored `fastingStatus` flag is
    /// not trusted; today's fasting state always comes from the history.
    pub fn load(store: S) -> Self {
        let history = read_json(&store, WORSHIP_HISTORY_KEY).unwrap_or_default();
        let fasting = read_json::<Vec<String>, _>(&store, FASTING_HISTORY_KEY)
            .map(|dates| dates.into_iter().collect())
            .unwrap_or_default();

        Self {
            store,
            history,
            fasting,
            revision: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access for data that lives beside the ledger in the same store.
    pub fn store_mut(&mut self) -> &mut S {
        self.revision += 1;
        &mut self.store
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn streak(&self, today: NaiveDate) -> u32 {
        streak_at(today, &self.fasting)
    }

    pub fn fasting_today(&self, today: NaiveDate) -> bool {
        self.fasted_on(today)
    }

    pub fn fasted_on(&self, date: NaiveDate) -> bool {
        self.fasting.contains(&date_key(date))
    }

    /// Today's checklist, seeded from the default catalogue until the first
    /// toggle of the day is recorded.
    pub fn today_tasks(&self, today: NaiveDate) -> Vec<WorshipTask> {
        read_json(&self.store, &tasks_key(&date_key(today))).unwrap_or_else(default_tasks)
    }

    /// Flips one task and rolls today's percentage into the history. Unknown
    /// ids leave everything untouched and return `false`.
    pub fn toggle_task(&mut self, today: NaiveDate, task_id: &str) -> bool {
        let mut tasks = self.today_tasks(today);
        let Some(task) = tasks.iter_mut().find(|task| task.id == task_id) else {
            debug!(task_id, "ignoring toggle for unknown task");
            return false;
        };
        task.completed = !task.completed;

        let key = date_key(today);
        write_json(&mut self.store, &tasks_key(&key), &tasks);
        self.history.insert(key, completion_percent(&tasks));
        write_json(&mut self.store, WORSHIP_HISTORY_KEY, &self.history);
        self.revision += 1;
        true
    }

    pub fn set_fasting(&mut self, today: NaiveDate, date: NaiveDate, fasted: bool) {
        let key = date_key(date);
        if fasted {
            self.fasting.insert(key);
        } else {
            self.fasting.remove(&key);
        }
        write_json(&mut self.store, FASTING_HISTORY_KEY, &self.fasting);
        if date == today {
            self.store.set(FASTING_STATUS_KEY, fasted.to_string());
        }
        self.revision += 1;
    }

    /// Completion for one calendar day: live for today, recorded for the
    /// past, and 0 for days that have not happened yet.
    pub fn heatmap_value(&self, today: NaiveDate, date: NaiveDate) -> u8 {
        if date == today {
            completion_percent(&self.today_tasks(today))
        } else if date < today {
            self.history
                .get(&date_key(date))
                .copied()
                .unwrap_or(0)
                .min(100)
        } else {
            0
        }
    }

    pub fn snapshot(&self) -> RemoteDocument {
        RemoteDocument {
            worship_history: self.history.clone(),
            fasting_history: self.fasting.clone(),
        }
    }

    /// Replaces local history and fasting days with `document` wholesale.
    pub fn apply_remote(&mut self, today: NaiveDate, document: RemoteDocument) {
        self.history = document.worship_history;
        self.fasting = document.fasting_history;
        write_json(&mut self.store, WORSHIP_HISTORY_KEY, &self.history);
        write_json(&mut self.store, FASTING_HISTORY_KEY, &self.fasting);
        let fasting_today = self.fasting_today(today);
        self.store.set(FASTING_STATUS_KEY, fasting_today.to_string());
        self.revision += 1;
    }

    /// Drops every ledger record. Unrelated keys in the store survive.
    pub fn reset(&mut self) {
        for key in self.store.keys() {
            if key.starts_with(TASKS_KEY_PREFIX) {
                self.store.remove(&key);
            }
        }
        self.store.remove(WORSHIP_HISTORY_KEY);
        self.store.remove(FASTING_HISTORY_KEY);
        self.store.remove(FASTING_STATUS_KEY);
        self.history.clear();
        self.fasting.clear();
        self.revision += 1;
    }
}
