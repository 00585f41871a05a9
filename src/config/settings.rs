use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::{ChallengeDuration, RepeatSet, WakeTime};
use crate::puzzle::{DEFAULT_MAX_OPERAND, DEFAULT_QUESTIONS};

/// Overrides the data directory (database and exports).
pub const DATA_DIR_ENV: &str = "NOOZE_DATA_DIR";

fn default_wake_time() -> WakeTime {
    WakeTime::default()
}
fn default_trigger_tolerance_secs() -> i64 {
    60
}
fn default_questions() -> usize {
    DEFAULT_QUESTIONS
}
fn default_max_operand() -> u32 {
    DEFAULT_MAX_OPERAND
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default = "default_wake_time")]
    pub default_wake_time: WakeTime,
    /// Weekdays used by `alarm set` when `--days` is not given.
    #[serde(default)]
    pub default_repeat: RepeatSet,
    /// How far from an armed trigger `ring` still treats an alarm as the one
    /// that rang.
    #[serde(default = "default_trigger_tolerance_secs")]
    pub trigger_tolerance_secs: i64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            default_wake_time: default_wake_time(),
            default_repeat: RepeatSet::empty(),
            trigger_tolerance_secs: default_trigger_tolerance_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    #[serde(default)]
    pub default_duration: ChallengeDuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleConfig {
    #[serde(default = "default_questions")]
    pub questions: usize,
    #[serde(default = "default_max_operand")]
    pub max_operand: u32,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            max_operand: default_max_operand(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub challenge: ChallengeConfig,
    #[serde(default)]
    pub puzzle: PuzzleConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "nooze")
            .context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("nooze.db"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
        let config: AppConfig = toml::from_str(&content).context("Parsing config.toml")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.alarm.default_wake_time.to_string(), "06:00");
        assert_eq!(config.challenge.default_duration.days(), 365);
        assert_eq!(config.puzzle.questions, 4);
        assert_eq!(config.puzzle.max_operand, 50);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[alarm]\ndefault_wake_time = \"05:30\"\ndefault_repeat = [1, 2, 3, 4, 5]\n\n[challenge]\ndefault_duration = 90\n",
        )
        .unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.alarm.default_wake_time, WakeTime::new(5, 30).unwrap());
        assert_eq!(config.alarm.default_repeat.label(), "Weekdays");
        assert_eq!(config.alarm.trigger_tolerance_secs, 60);
        assert_eq!(config.challenge.default_duration, ChallengeDuration::Days90);
        assert_eq!(config.puzzle, PuzzleConfig::default());
    }

    #[test]
    fn rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[challenge]\ndefault_duration = 30\n").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
        std::fs::write(&path, "[alarm]\ndefault_wake_time = \"27:00\"\n").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.alarm.default_repeat = "sat,sun".parse().unwrap();
        config.puzzle.questions = 6;
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }
}
