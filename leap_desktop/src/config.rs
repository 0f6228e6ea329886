//! Configuration for the gesture listener.
//!
//! Stored as TOML, by default at `~/.config/leap-desktop/config.toml`.
//! Every field has a default, so a missing file or a partial file both
//! work.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::action::{Action, ExternalCommand};
use crate::error::{Error, Result};
use crate::gesture::GestureKind;

/// Swipe classification thresholds.
///
/// A swipe is horizontal when `|direction.y| < tolerance`; it goes left when
/// `direction.x < detect` and right when `direction.x > detect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeConfig {
    #[serde(default = "default_swipe_detect")]
    pub detect: f32,
    #[serde(default = "default_swipe_tolerance")]
    pub tolerance: f32,
}

fn default_swipe_detect() -> f32 {
    0.00
}
fn default_swipe_tolerance() -> f32 {
    0.20
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            detect: default_swipe_detect(),
            tolerance: default_swipe_tolerance(),
        }
    }
}

/// Command run for each action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(default = "default_previous_desktop")]
    pub previous_desktop: ExternalCommand,
    #[serde(default = "default_next_desktop")]
    pub next_desktop: ExternalCommand,
    #[serde(default = "default_lock_screen")]
    pub lock_screen: ExternalCommand,
}

fn default_previous_desktop() -> ExternalCommand {
    ExternalCommand::xte_chord(&["Control_L", "Alt_L"], "Left")
}
fn default_next_desktop() -> ExternalCommand {
    ExternalCommand::xte_chord(&["Control_L", "Alt_L"], "Right")
}
fn default_lock_screen() -> ExternalCommand {
    ExternalCommand::new(["gnome-screensaver-command", "--lock"])
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            previous_desktop: default_previous_desktop(),
            next_desktop: default_next_desktop(),
            lock_screen: default_lock_screen(),
        }
    }
}

impl CommandConfig {
    pub fn command_for(&self, action: Action) -> &ExternalCommand {
        match action {
            Action::PreviousDesktop => &self.previous_desktop,
            Action::NextDesktop => &self.next_desktop,
            Action::LockScreen => &self.lock_screen,
        }
    }
}

/// Gesture kinds enabled on the controller when it connects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    #[serde(default = "default_enabled_gestures")]
    pub enabled: Vec<GestureKind>,
}

fn default_enabled_gestures() -> Vec<GestureKind> {
    GestureKind::ALL.to_vec()
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_gestures(),
        }
    }
}

/// Logging settings; CLI flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Force colors on or off; unset means detect from `TERM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Log a summary line for every frame that carries two hands.
    #[serde(default)]
    pub frame_summaries: bool,
}

fn default_log_level() -> String {
    "debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            color: None,
            file: None,
            frame_summaries: false,
        }
    }
}

/// Complete listener configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesktopConfig {
    #[serde(default)]
    pub swipe: SwipeConfig,
    #[serde(default)]
    pub commands: CommandConfig,
    #[serde(default)]
    pub gestures: GestureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DesktopConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("leap-desktop")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DesktopConfig = toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_toml()?).map_err(io_err)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.swipe.tolerance.is_finite() || self.swipe.tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "swipe.tolerance must be a non-negative number, got {}",
                self.swipe.tolerance
            )));
        }
        if !self.swipe.detect.is_finite() {
            return Err(Error::InvalidConfig("swipe.detect must be finite".into()));
        }
        for (name, cmd) in [
            ("previous_desktop", &self.commands.previous_desktop),
            ("next_desktop", &self.commands.next_desktop),
            ("lock_screen", &self.commands.lock_screen),
        ] {
            if cmd.program().map_or(true, str::is_empty) {
                return Err(Error::InvalidConfig(format!("commands.{name} is empty")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_desktop_shortcuts() {
        let config = DesktopConfig::default();
        assert_eq!(config.swipe.detect, 0.0);
        assert_eq!(config.swipe.tolerance, 0.20);
        assert_eq!(config.commands.lock_screen.argv, ["gnome-screensaver-command", "--lock"]);
        assert_eq!(config.commands.next_desktop.argv[3], "key Right");
        assert_eq!(config.gestures.enabled.len(), 4);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: DesktopConfig = toml::from_str(
            r#"
[swipe]
tolerance = 0.35

[commands]
lock_screen = ["loginctl", "lock-session"]
"#,
        )
        .unwrap();
        assert_eq!(config.swipe.tolerance, 0.35);
        assert_eq!(config.swipe.detect, 0.0);
        assert_eq!(config.commands.lock_screen.argv, ["loginctl", "lock-session"]);
        assert_eq!(config.commands.previous_desktop, default_previous_desktop());
    }

    #[test]
    fn gesture_kinds_use_snake_case() {
        let config: DesktopConfig = toml::from_str(
            r#"
[gestures]
enabled = ["swipe", "screen_tap"]
"#,
        )
        .unwrap();
        assert_eq!(config.gestures.enabled, vec![GestureKind::Swipe, GestureKind::ScreenTap]);
    }

    #[test]
    fn serialized_default_parses_back() {
        let text = DesktopConfig::default().to_toml().unwrap();
        assert!(text.contains("gnome-screensaver-command"));
        let parsed: DesktopConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, DesktopConfig::default());
    }

    #[test]
    fn rejects_empty_command_and_negative_tolerance() {
        let mut config = DesktopConfig::default();
        config.commands.next_desktop = ExternalCommand::new(Vec::<String>::new());
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = DesktopConfig::default();
        config.swipe.tolerance = -0.1;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = DesktopConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, DesktopConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = DesktopConfig::default();
        config.logging.frame_summaries = true;
        config.save(&path).unwrap();
        assert_eq!(DesktopConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[swipe\ntolerance = ").unwrap();
        match DesktopConfig::load(&path) {
            Err(Error::ConfigParse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
