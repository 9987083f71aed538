use crate::display::{DisplayStyle, ManualJumpPolicy};
use crate::error::{CoreError, Result};
use crate::estimator::AverageLineDuration;
use crate::source::SimulatedClock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `analysis.api_key`
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthologyConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisProviderType {
    #[default]
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub provider: AnalysisProviderType,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

fn default_model() -> String {
    "gemini-3-pro-preview".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: AnalysisProviderType::default(),
            model: default_model(),
            api_key: String::new(),
            cache_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Track length assumed until a local file reports its own
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: f64,
    /// Simulated clock period
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Seconds added per simulated tick
    #[serde(default = "default_tick_step_secs")]
    pub tick_step_secs: f64,
    /// Seconds moved by the back/forward transport buttons
    #[serde(default = "default_skip_secs")]
    pub skip_secs: f64,
}

const fn default_duration_secs() -> f64 {
    crate::playback::DEFAULT_DURATION_SECS
}

const fn default_tick_interval_ms() -> u64 {
    500
}

const fn default_tick_step_secs() -> f64 {
    SimulatedClock::DEFAULT_STEP_SECS
}

const fn default_skip_secs() -> f64 {
    10.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: default_duration_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            tick_step_secs: default_tick_step_secs(),
            skip_secs: default_skip_secs(),
        }
    }
}

impl PlaybackConfig {
    #[must_use]
    pub const fn simulated_clock(&self) -> SimulatedClock {
        SimulatedClock::new(
            Duration::from_millis(self.tick_interval_ms),
            self.tick_step_secs,
        )
    }
}

/// How a tapped lyric line interacts with the time-derived estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualJumpMode {
    Soft,
    #[default]
    UntilTransport,
    Window,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    #[serde(default = "default_average_line_duration")]
    pub average_line_duration_secs: f64,
    #[serde(default)]
    pub manual_jump: ManualJumpMode,
    /// Only used with `manual_jump = "window"`
    #[serde(default = "default_manual_jump_window")]
    pub manual_jump_window_secs: f64,
}

const fn default_average_line_duration() -> f64 {
    crate::estimator::DEFAULT_AVERAGE_LINE_DURATION_SECS
}

const fn default_manual_jump_window() -> f64 {
    8.0
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            average_line_duration_secs: default_average_line_duration(),
            manual_jump: ManualJumpMode::default(),
            manual_jump_window_secs: default_manual_jump_window(),
        }
    }
}

impl LyricsConfig {
    #[must_use]
    pub const fn estimator(&self) -> AverageLineDuration {
        AverageLineDuration::new(self.average_line_duration_secs)
    }

    #[must_use]
    pub const fn jump_policy(&self) -> ManualJumpPolicy {
        match self.manual_jump {
            ManualJumpMode::Soft => ManualJumpPolicy::Soft,
            ManualJumpMode::UntilTransport => ManualJumpPolicy::UntilTransport,
            ManualJumpMode::Window => ManualJumpPolicy::Window {
                seconds: self.manual_jump_window_secs,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_max_blur")]
    pub max_blur: f64,
    #[serde(default = "default_opacity_step")]
    pub opacity_step: f64,
    #[serde(default = "default_min_opacity")]
    pub min_opacity: f64,
    #[serde(default = "default_active_scale")]
    pub active_scale: f64,
}

const fn default_max_blur() -> f64 {
    4.0
}

const fn default_opacity_step() -> f64 {
    0.2
}

const fn default_min_opacity() -> f64 {
    0.3
}

const fn default_active_scale() -> f64 {
    1.05
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_blur: default_max_blur(),
            opacity_step: default_opacity_step(),
            min_opacity: default_min_opacity(),
            active_scale: default_active_scale(),
        }
    }
}

impl DisplayConfig {
    #[must_use]
    pub const fn style(&self) -> DisplayStyle {
        DisplayStyle {
            max_blur: self.max_blur,
            opacity_step: self.opacity_step,
            min_opacity: self.min_opacity,
            active_scale: self.active_scale,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `anthology.log` in the config directory
    #[serde(default)]
    pub enabled: bool,
}

impl AnthologyConfig {
    /// Get the configuration directory path (~/.config/anthology/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/anthology/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template on first run,
    /// or an error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Load and validate a config file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config text
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigParseError`] for invalid TOML and
    /// [`CoreError::ConfigInvalid`] for out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the configured API key with a non-empty override
    pub fn apply_env_overrides(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.analysis.api_key = key;
        }
    }

    /// Reject values the playback and display code cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("playback.default_duration_secs", self.playback.default_duration_secs),
            ("playback.tick_step_secs", self.playback.tick_step_secs),
            ("playback.skip_secs", self.playback.skip_secs),
            (
                "lyrics.average_line_duration_secs",
                self.lyrics.average_line_duration_secs,
            ),
            ("lyrics.manual_jump_window_secs", self.lyrics.manual_jump_window_secs),
            ("display.active_scale", self.display.active_scale),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{field} must be a positive number, got {value}"),
                });
            }
        }

        if self.playback.tick_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "playback.tick_interval_ms must be greater than zero".to_string(),
            });
        }

        let non_negative = [
            ("display.max_blur", self.display.max_blur),
            ("display.opacity_step", self.display.opacity_step),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{field} must not be negative, got {value}"),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.display.min_opacity) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "display.min_opacity must be between 0 and 1, got {}",
                    self.display.min_opacity
                ),
            });
        }

        Ok(())
    }

    /// The API key, if one is configured
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        let key = self.analysis.api_key.trim();
        (!key.is_empty()).then_some(key)
    }
}

/// Template written on first run
pub const CONFIG_TEMPLATE: &str = r#"# Anthology Configuration
# ~/.config/anthology/config.toml

[analysis]
# Analysis provider: "gemini"
provider = "gemini"
model = "gemini-3-pro-preview"
# Gemini API key. The GEMINI_API_KEY environment variable takes precedence.
api_key = ""
# Keep successful analyses on disk so each song is only analysed once
cache_enabled = true

[playback]
# Track length used in preview mode, before a local file reports its own
default_duration_secs = 240.0
# Preview mode clock: advance tick_step_secs every tick_interval_ms
tick_interval_ms = 500
tick_step_secs = 0.5
# Seconds moved by the back/forward buttons
skip_secs = 10.0

[lyrics]
# Lyrics carry no timing; the active line is guessed at this many seconds per line
average_line_duration_secs = 4.5
# What happens after tapping a lyric line:
#   "soft"            - the next clock update takes over again
#   "until_transport" - the tapped line stays active until play/pause/seek
#   "window"          - the tapped line stays active for manual_jump_window_secs
manual_jump = "until_transport"
manual_jump_window_secs = 8.0

[display]
max_blur = 4.0
opacity_step = 0.2
min_opacity = 0.3
active_scale = 1.05

[logging]
# Write logs to ~/.config/anthology/anthology.log
enabled = false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = AnthologyConfig::from_toml_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.analysis.provider, AnalysisProviderType::Gemini);
        assert_eq!(config.analysis.model, "gemini-3-pro-preview");
        assert!(config.analysis.cache_enabled);
        assert_eq!(config.playback.tick_interval_ms, 500);
        assert_eq!(config.lyrics.manual_jump, ManualJumpMode::UntilTransport);
        assert_eq!(config.display.style(), DisplayStyle::default());
        assert!(!config.logging.enabled);
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AnthologyConfig::from_toml_str("").unwrap();
        assert!((config.playback.default_duration_secs - 240.0).abs() < f64::EPSILON);
        assert_eq!(config.playback.simulated_clock(), SimulatedClock::default());
        assert_eq!(config.lyrics.estimator(), AverageLineDuration::default());
    }

    #[test]
    fn test_partial_section() {
        let config = AnthologyConfig::from_toml_str(
            r#"
            [lyrics]
            manual_jump = "window"
            manual_jump_window_secs = 3.0
            "#,
        )
        .unwrap();
        assert_eq!(
            config.lyrics.jump_policy(),
            ManualJumpPolicy::Window { seconds: 3.0 }
        );
        assert!((config.lyrics.average_line_duration_secs - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let err = AnthologyConfig::from_toml_str("[playback]\ndefault_duration_secs = 0.0")
            .unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));

        let err = AnthologyConfig::from_toml_str("[playback]\ntick_interval_ms = 0").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));

        let err = AnthologyConfig::from_toml_str("[lyrics]\naverage_line_duration_secs = -1.0")
            .unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));

        let err =
            AnthologyConfig::from_toml_str("[display]\nmin_opacity = 1.5").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = AnthologyConfig::from_toml_str("[analysis\nmodel = 1").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParseError(_)));
    }

    #[test]
    fn test_env_override() {
        let mut config = AnthologyConfig::default();
        config.analysis.api_key = "from-file".to_string();

        config.apply_env_overrides(Some("   ".to_string()));
        assert_eq!(config.api_key(), Some("from-file"));

        config.apply_env_overrides(Some("from-env".to_string()));
        assert_eq!(config.api_key(), Some("from-env"));

        config.apply_env_overrides(None);
        assert_eq!(config.api_key(), Some("from-env"));
    }
}
