//! Runtime configuration loaded from TOML.
//!
//! # Invariants
//! - Every field has a default, so an empty file is a valid config.
//! - `slots_per_member * slot_percentage` must cover exactly 100%.

use crate::logging::default_log_level;
use crate::timeline::drag::DEFAULT_DRAG_THRESHOLD_PX;
use crate::timeline::slots::{SlotLayout, SLOTS_PER_MEMBER, SLOT_BASE_HEIGHT, SLOT_PERCENTAGE};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_PATH: &str = "planboard.sqlite3";
pub const DEFAULT_MIN_VISIBLE_WIDTH_PCT: f64 = 0.5;
pub const DEFAULT_TRACK_WIDTH_PX: f64 = 1200.0;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config TOML: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanboardConfig {
    pub database_path: PathBuf,
    pub logging: LoggingConfig,
    pub timeline: TimelineConfig,
}

impl Default for PlanboardConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            logging: LoggingConfig::default(),
            timeline: TimelineConfig::default(),
        }
    }
}

impl PlanboardConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database_path must not be empty".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "logging.level must not be empty".to_string(),
            ));
        }
        self.timeline.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Log directory; logging stays disabled when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Lane and gesture tuning for the timeline view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineConfig {
    pub slots_per_member: usize,
    pub slot_percentage: u8,
    pub slot_base_height: f64,
    pub min_visible_width_pct: f64,
    pub drag_threshold_px: f64,
    pub track_width_px: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            slots_per_member: SLOTS_PER_MEMBER,
            slot_percentage: SLOT_PERCENTAGE,
            slot_base_height: SLOT_BASE_HEIGHT,
            min_visible_width_pct: DEFAULT_MIN_VISIBLE_WIDTH_PCT,
            drag_threshold_px: DEFAULT_DRAG_THRESHOLD_PX,
            track_width_px: DEFAULT_TRACK_WIDTH_PX,
        }
    }
}

impl TimelineConfig {
    pub fn slot_layout(&self) -> SlotLayout {
        SlotLayout {
            slots_per_member: self.slots_per_member,
            slot_percentage: self.slot_percentage,
            base_height: self.slot_base_height,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slots_per_member == 0 || self.slot_percentage == 0 {
            return Err(ConfigError::Invalid(
                "timeline.slots_per_member and timeline.slot_percentage must be non-zero"
                    .to_string(),
            ));
        }
        if self.slots_per_member * usize::from(self.slot_percentage) != 100 {
            return Err(ConfigError::Invalid(format!(
                "timeline slots must cover 100%, got {} x {}%",
                self.slots_per_member, self.slot_percentage
            )));
        }
        let sizes = [
            ("slot_base_height", self.slot_base_height),
            ("min_visible_width_pct", self.min_visible_width_pct),
            ("drag_threshold_px", self.drag_threshold_px),
            ("track_width_px", self.track_width_px),
        ];
        for (name, value) in sizes {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "timeline.{name} must be a non-negative number"
                )));
            }
        }
        Ok(())
    }
}
