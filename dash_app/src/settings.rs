//! Small key=value settings file in the platform data dir. Missing file or
//! unknown keys fall back to defaults; a commented template is written on
//! first run so the operator has something to edit.

use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::DEFAULT_API_BASE;
use crate::poll::{PollPeriods, DEFAULT_HISTORY_SECS, DEFAULT_MARKET_SECS, DEFAULT_STATUS_SECS};

const SETTINGS_FILE: &str = "settings.conf";
const MAX_POLL_SECS: u64 = 3600;

pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "dash_app")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[derive(Clone, Debug, PartialEq)]
pub struct DashSettings {
    pub api_base: String,
    pub history_poll_secs: u64,
    pub status_poll_secs: u64,
    pub market_poll_secs: u64,
}

impl Default for DashSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            history_poll_secs: DEFAULT_HISTORY_SECS,
            status_poll_secs: DEFAULT_STATUS_SECS,
            market_poll_secs: DEFAULT_MARKET_SECS,
        }
    }
}

impl DashSettings {
    /// Load from the data dir, writing a template on first run.
    pub fn load_or_write_default() -> Self {
        let dir = data_dir();
        let path = dir.join(SETTINGS_FILE);
        if path.exists() {
            Self::load_from(&path)
        } else {
            let settings = Self::default();
            settings.save_to_disk(&dir);
            settings
        }
    }

    fn load_from(path: &Path) -> Self {
        let mut settings = Self::default();
        let Ok(f) = File::open(path) else {
            return settings;
        };
        let reader = BufReader::new(f);

        for line in reader.lines().flatten() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((k, v)) = line.split_once('=') else {
                continue;
            };
            settings.apply_entry(k.trim(), v.trim());
        }

        settings
    }

    fn apply_entry(&mut self, key: &str, value: &str) {
        match key {
            "api_base" => {
                if !value.is_empty() {
                    self.api_base = value.trim_end_matches('/').to_string();
                }
            }
            "history_poll_secs" => self.history_poll_secs = parse_secs(value, self.history_poll_secs),
            "status_poll_secs" => self.status_poll_secs = parse_secs(value, self.status_poll_secs),
            "market_poll_secs" => self.market_poll_secs = parse_secs(value, self.market_poll_secs),
            _ => {}
        }
    }

    pub fn periods(&self) -> PollPeriods {
        PollPeriods {
            history: Duration::from_secs(self.history_poll_secs),
            status: Duration::from_secs(self.status_poll_secs),
            market: Duration::from_secs(self.market_poll_secs),
        }
    }

    fn save_to_disk(&self, dir: &Path) {
        if let Err(e) = create_dir_all(dir) {
            eprintln!("[settings] failed to create {}: {e}", dir.display());
            return;
        }

        let tmp = dir.join("settings.conf.tmp");
        let mut f = match File::create(&tmp) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("[settings] failed to write {}: {e}", tmp.display());
                return;
            }
        };

        let _ = writeln!(f, "# dash_app settings");
        let _ = writeln!(f, "api_base={}", self.api_base);
        let _ = writeln!(f, "history_poll_secs={}", self.history_poll_secs);
        let _ = writeln!(f, "status_poll_secs={}", self.status_poll_secs);
        let _ = writeln!(f, "market_poll_secs={}", self.market_poll_secs);

        // Atomic-ish replace
        let _ = std::fs::rename(tmp, dir.join(SETTINGS_FILE));
    }
}

fn parse_secs(value: &str, fallback: u64) -> u64 {
    value
        .parse::<u64>()
        .ok()
        .unwrap_or(fallback)
        .clamp(1, MAX_POLL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_lines(lines: &[&str]) -> DashSettings {
        let mut settings = DashSettings::default();
        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((k, v)) = line.split_once('=') {
                settings.apply_entry(k.trim(), v.trim());
            }
        }
        settings
    }

    #[test]
    fn defaults_match_polling_contract() {
        let s = DashSettings::default();
        assert_eq!(s.api_base, "http://127.0.0.1:8000");
        assert_eq!(s.history_poll_secs, 5);
        assert_eq!(s.status_poll_secs, 2);
        assert_eq!(s.market_poll_secs, 60);
    }

    #[test]
    fn entries_override_and_unknown_keys_are_ignored() {
        let s = parse_lines(&[
            "# comment",
            "api_base=http://10.0.0.2:9000/",
            "market_poll_secs=30",
            "does_not_exist=1",
        ]);
        assert_eq!(s.api_base, "http://10.0.0.2:9000");
        assert_eq!(s.market_poll_secs, 30);
        assert_eq!(s.history_poll_secs, 5);
    }

    #[test]
    fn periods_clamp_to_at_least_one_second() {
        let s = parse_lines(&["status_poll_secs=0", "history_poll_secs=999999"]);
        assert_eq!(s.status_poll_secs, 1);
        assert_eq!(s.history_poll_secs, 3600);
    }

    #[test]
    fn bad_numbers_keep_previous_value() {
        let s = parse_lines(&["market_poll_secs=abc"]);
        assert_eq!(s.market_poll_secs, 60);
    }
}
