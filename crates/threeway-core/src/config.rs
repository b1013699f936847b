//! Persisted user preferences (§4.12, §6 "Persisted state layout").
//!
//! A serde-derived struct with per-field defaults, loaded and saved as JSON
//! at a path the caller chooses. The core engine never reads this file
//! itself — the CLI loads a `Settings`, converts it to an [`Options`]
//! value, and passes that down.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::options::{LineEnding, Options, Source};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_tab_size")]
    pub tab_size: u32,
    #[serde(default)]
    pub ignore_white_space: bool,
    #[serde(default)]
    pub ignore_trivial_matches: bool,
    #[serde(default = "default_auto_solve")]
    pub auto_solve: bool,
    #[serde(default)]
    pub whitespace_2_file_merge_default: Option<Source>,
    #[serde(default)]
    pub whitespace_3_file_merge_default: Option<Source>,
    #[serde(default)]
    pub preserve_carriage_returns: bool,
    #[serde(default = "default_line_ending")]
    pub line_ending: LineEnding,
    #[serde(default)]
    pub write_backup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tab_size: default_tab_size(),
            ignore_white_space: false,
            ignore_trivial_matches: false,
            auto_solve: default_auto_solve(),
            whitespace_2_file_merge_default: None,
            whitespace_3_file_merge_default: None,
            preserve_carriage_returns: false,
            line_ending: default_line_ending(),
            write_backup: false,
        }
    }
}

fn default_tab_size() -> u32 {
    8
}
fn default_auto_solve() -> bool {
    true
}
fn default_line_ending() -> LineEnding {
    LineEnding::Lf
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl From<Settings> for Options {
    fn from(s: Settings) -> Self {
        Options {
            tab_size: s.tab_size,
            ignore_white_space: s.ignore_white_space,
            ignore_trivial_matches: s.ignore_trivial_matches,
            trivial_match_threshold: Options::default().trivial_match_threshold,
            auto_solve: s.auto_solve,
            whitespace_2_file_merge_default: s.whitespace_2_file_merge_default,
            whitespace_3_file_merge_default: s.whitespace_3_file_merge_default,
            preserve_carriage_returns: s.preserve_carriage_returns,
            line_ending: s.line_ending,
            write_backup: s.write_backup,
            wrap_column: Options::default().wrap_column,
            upper_case: Options::default().upper_case,
            ignore_numbers: Options::default().ignore_numbers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            tab_size: 4,
            ignore_white_space: true,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.tab_size, 4);
        assert!(loaded.ignore_white_space);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{}").unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.tab_size, default_tab_size());
        assert!(loaded.auto_solve);
    }

    #[test]
    fn converts_into_options() {
        let settings = Settings { tab_size: 2, ..Settings::default() };
        let options: Options = settings.into();
        assert_eq!(options.tab_size, 2);
    }
}
