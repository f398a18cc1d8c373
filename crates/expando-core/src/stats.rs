use crate::error::Result;
use crate::persist::{load_json_or_default, save_json};
use crate::traits::ExpansionRecorder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

/// Contents of `stats.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpansionStats {
    pub total_successful_expansions: u64,
    pub per_trigger_usage_counts: BTreeMap<String, u64>,
    pub last_used_trigger: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ExpansionStats {
    pub fn record(&mut self, trigger: &str, at: DateTime<Utc>) {
        self.total_successful_expansions += 1;
        *self
            .per_trigger_usage_counts
            .entry(trigger.to_string())
            .or_insert(0) += 1;
        self.last_used_trigger = Some(trigger.to_string());
        self.last_used_at = Some(at);
    }

    /// Triggers ordered by use, most used first.
    pub fn top_triggers(&self) -> Vec<(&str, u64)> {
        let mut counts: Vec<(&str, u64)> = self
            .per_trigger_usage_counts
            .iter()
            .map(|(t, c)| (t.as_str(), *c))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts
    }
}

#[derive(Debug)]
pub struct StatsStore {
    path: PathBuf,
    stats: ExpansionStats,
}

impl StatsStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            stats: ExpansionStats::default(),
        }
    }

    pub fn open(path: PathBuf) -> Self {
        let stats = load_json_or_default(&path);
        Self { path, stats }
    }

    pub fn stats(&self) -> &ExpansionStats {
        &self.stats
    }

    /// Reload, count, and write back, so a reset made by another process
    /// is not overwritten by a stale copy.
    pub fn record(&mut self, trigger: &str) -> Result<()> {
        self.stats = load_json_or_default(&self.path);
        self.stats.record(trigger, Utc::now());
        save_json(&self.path, &self.stats)?;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        self.stats = ExpansionStats::default();
        save_json(&self.path, &self.stats)?;
        Ok(())
    }
}

impl ExpansionRecorder for StatsStore {
    fn record_expansion(&mut self, trigger: &str) {
        if let Err(e) = self.record(trigger) {
            warn!(error = %e, "failed to save expansion stats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn records_totals_and_last_use() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        let mut store = StatsStore::new(path.clone());

        store.record(";eml/").unwrap();
        store.record(";sig/").unwrap();
        store.record(";eml/").unwrap();

        let reopened = StatsStore::open(path);
        let stats = reopened.stats();
        assert_eq!(stats.total_successful_expansions, 3);
        assert_eq!(stats.per_trigger_usage_counts[";eml/"], 2);
        assert_eq!(stats.last_used_trigger.as_deref(), Some(";eml/"));
        assert!(stats.last_used_at.is_some());
        assert_eq!(stats.top_triggers()[0], (";eml/", 2));
    }

    #[test]
    fn document_uses_camel_case_and_nulls() {
        let json = serde_json::to_value(ExpansionStats::default()).unwrap();
        assert_eq!(json["totalSuccessfulExpansions"], 0);
        assert!(json["perTriggerUsageCounts"].as_object().unwrap().is_empty());
        assert!(json["lastUsedTrigger"].is_null());
        assert!(json["lastUsedAt"].is_null());
    }

    #[test]
    fn reset_from_another_handle_survives_later_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        let mut daemon = StatsStore::open(path.clone());
        daemon.record_expansion(";a/");
        daemon.record_expansion(";a/");

        let mut cli = StatsStore::open(path.clone());
        cli.reset().unwrap();
        daemon.record_expansion(";b/");

        let reopened = StatsStore::open(path);
        let stats = reopened.stats();
        assert_eq!(stats.total_successful_expansions, 1);
        assert_eq!(stats.per_trigger_usage_counts.get(";a/"), None);
        assert_eq!(stats.per_trigger_usage_counts[";b/"], 1);
    }

    #[test]
    fn reset_clears_everything() {
        let dir = TempDir::new().unwrap();
        let mut store = StatsStore::new(dir.path().join("stats.json"));
        store.record_expansion(";a/");
        store.reset().unwrap();
        assert_eq!(store.stats(), &ExpansionStats::default());
    }
}
