//! Editor configuration.
//!
//! # Responsibility
//! - Hold the tunable constants used by model operations.
//! - Parse shell-provided JSON configuration with per-field defaults.
//!
//! # Invariants
//! - A config returned by `from_json_str` has passed `validate()`.

use crate::model::task::CanvasSize;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Attachment ceiling: 5 MiB.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;
/// Left edge of newly stacked SubStep cards.
pub const DEFAULT_STACK_ORIGIN_X: f64 = 10.0;
/// Top edge of the first stacked SubStep card.
pub const DEFAULT_STACK_ORIGIN_Y: f64 = 10.0;
/// Vertical distance between stacked SubStep cards.
pub const DEFAULT_STACK_STEP_Y: f64 = 90.0;

const DEFAULT_SUB_STEP_TEXT: &str = "New sub-step";
const DEFAULT_ACTION_ITEM_TEXT: &str = "New action item";

/// Logging section of the editor config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling logs. `None` leaves logging off.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Editor-wide tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_attachment_bytes: u64,
    pub default_canvas_size: CanvasSize,
    pub stack_origin_x: f64,
    pub stack_origin_y: f64,
    pub stack_step_y: f64,
    pub default_sub_step_text: String,
    pub default_action_item_text: String,
    pub logging: LoggingConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            default_canvas_size: CanvasSize::default(),
            stack_origin_x: DEFAULT_STACK_ORIGIN_X,
            stack_origin_y: DEFAULT_STACK_ORIGIN_Y,
            stack_step_y: DEFAULT_STACK_STEP_Y,
            default_sub_step_text: DEFAULT_SUB_STEP_TEXT.to_string(),
            default_action_item_text: DEFAULT_ACTION_ITEM_TEXT.to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Errors from config parsing and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// Input is not valid JSON for the config shape.
    Parse(serde_json::Error),
    /// A field holds a value outside its allowed range.
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid editor config: {err}"),
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid editor config field `{field}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl EditorConfig {
    /// Parses a JSON config; missing fields keep their defaults.
    ///
    /// # Errors
    /// - Returns `Parse` for malformed JSON.
    /// - Returns `InvalidValue` when validation fails.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attachment_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attachment_bytes",
                reason: "must be positive",
            });
        }
        if !(self.default_canvas_size.width > 0.0 && self.default_canvas_size.height > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "default_canvas_size",
                reason: "width and height must be positive",
            });
        }
        if !(self.stack_step_y > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "stack_step_y",
                reason: "must be positive",
            });
        }
        if self.stack_origin_x < 0.0 || self.stack_origin_y < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "stack_origin",
                reason: "must not be negative",
            });
        }
        Ok(())
    }
}
