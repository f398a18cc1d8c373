use crate::error::Result;
use crate::persist::{load_json_or_default, save_json};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_START_DELIMITER: &str = ";";
pub const DEFAULT_END_ANCHORS: [char; 2] = ['/', '.'];

/// How triggers are framed: a start delimiter and a set of one-character anchors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimiterConfig {
    pub start_delimiter: String,
    /// Distinct anchors in configured order.
    pub end_anchors: Vec<char>,
}

impl Default for DelimiterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_START_DELIMITER, DEFAULT_END_ANCHORS)
    }
}

impl DelimiterConfig {
    pub fn new(start_delimiter: &str, end_anchors: impl IntoIterator<Item = char>) -> Self {
        let mut anchors = Vec::new();
        for c in end_anchors {
            if !anchors.contains(&c) {
                anchors.push(c);
            }
        }
        Self {
            start_delimiter: start_delimiter.to_string(),
            end_anchors: anchors,
        }
    }

    pub fn is_anchor(&self, c: char) -> bool {
        self.end_anchors.contains(&c)
    }

    /// The anchor appended to triggers typed without one: the first configured.
    pub fn default_anchor(&self) -> Option<char> {
        self.end_anchors.first().copied()
    }
}

/// Contents of `settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub desired_enabled: bool,
    pub start_delimiter: String,
    #[serde(deserialize_with = "deserialize_anchors")]
    pub end_anchors: Vec<String>,
    pub play_sound: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            desired_enabled: true,
            start_delimiter: DEFAULT_START_DELIMITER.to_string(),
            end_anchors: DEFAULT_END_ANCHORS.iter().map(|c| c.to_string()).collect(),
            play_sound: false,
        }
    }
}

impl Settings {
    /// Sanitized delimiter configuration; blank values fall back to defaults.
    pub fn delimiter_config(&self) -> DelimiterConfig {
        let start = self.start_delimiter.trim();
        let start = if start.is_empty() {
            DEFAULT_START_DELIMITER
        } else {
            start
        };

        let anchors: Vec<char> = self
            .end_anchors
            .iter()
            .flat_map(|a| a.chars())
            .filter(|c| !c.is_whitespace())
            .collect();

        if anchors.is_empty() {
            DelimiterConfig::new(start, DEFAULT_END_ANCHORS)
        } else {
            DelimiterConfig::new(start, anchors)
        }
    }
}

/// Accepts `["/", "."]`, or the legacy single string `"/."`.
fn deserialize_anchors<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Anchors {
        List(Vec<String>),
        Legacy(String),
    }

    let anchors = match Anchors::deserialize(deserializer)? {
        Anchors::List(list) => list,
        Anchors::Legacy(s) => vec![s],
    };
    Ok(anchors
        .iter()
        .flat_map(|a| a.chars())
        .map(|c| c.to_string())
        .collect())
}

/// Durable settings document.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn delimiter_config(&self) -> DelimiterConfig {
        self.settings.delimiter_config()
    }

    /// Reload from disk; returns true when the settings differ from before.
    pub fn load(&mut self) -> bool {
        let loaded: Settings = load_json_or_default(&self.path);
        let changed = loaded != self.settings;
        if changed {
            info!(path = %self.path.display(), "settings reloaded");
        }
        self.settings = loaded;
        changed
    }

    pub fn save(&self) -> Result<()> {
        save_json(&self.path, &self.settings)?;
        Ok(())
    }

    /// Apply `f` and persist the result.
    pub fn update(&mut self, f: impl FnOnce(&mut Settings)) -> Result<()> {
        f(&mut self.settings);
        self.save()
    }
}
