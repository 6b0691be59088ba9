//! Runtime State - the mutable record of one wizard session.
//!
//! Plain data: a persistence layer may serialize it verbatim and hand it back
//! later through `Engine::resume`, which re-validates every id it contains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub section_active_id: Option<String>,
    pub route_active_id: Option<String>,
    /// Visited route ids, oldest first.
    #[serde(default)]
    pub route_path: Vec<String>,
    #[serde(default)]
    pub status: BTreeMap<String, SectionStatus>,
    /// Current item of each repeating section, keyed by its array key.
    #[serde(default)]
    pub array_indexes: BTreeMap<String, usize>,
    /// Set once the terminal route has been committed; cleared by `prev`/`goto`.
    #[serde(default)]
    pub complete: bool,
}

impl State {
    pub fn section_status(&self, section_id: &str) -> Option<&SectionStatus> {
        self.status.get(section_id)
    }

    /// Status entry for `section_id`, created empty on first touch.
    pub fn status_mut(&mut self, section_id: &str) -> &mut SectionStatus {
        self.status.entry(section_id.to_string()).or_default()
    }

    pub fn is_completed(&self, section_id: &str) -> bool {
        self.status
            .get(section_id)
            .map(|s| s.completed)
            .unwrap_or(false)
    }

    pub fn array_index(&self, key: &str) -> usize {
        self.array_indexes.get(key).copied().unwrap_or(0)
    }

    /// Ids of every section currently flagged active.
    pub fn active_sections(&self) -> Vec<&str> {
        self.status
            .iter()
            .filter(|(_, s)| s.active)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SectionStatus {
    pub active: bool,
    pub started: bool,
    pub started_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub completed_date: Option<DateTime<Utc>>,
    /// Most recently visited route of this section.
    pub route_last: Option<String>,
}

impl SectionStatus {
    /// Flag the section active, stamping `started_date` on first entry.
    pub fn enter(&mut self, now: DateTime<Utc>) {
        self.active = true;
        if !self.started {
            self.started = true;
            self.started_date = Some(now);
        }
    }

    /// Flag the section completed. `completed_date` is written only the first time.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.completed = true;
        if self.completed_date.is_none() {
            self.completed_date = Some(now);
        }
    }
}
