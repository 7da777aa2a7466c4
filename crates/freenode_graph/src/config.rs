// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings.
//!
//! Stored as RON. Every section falls back to its defaults, so a file only
//! needs to mention what it changes.

use crate::command::MAX_HISTORY;
use crate::controller::WHEEL_ZOOM_BASE;
use crate::error::ConfigError;
use crate::geometry::{Viewport, MAX_SCALE, MIN_SCALE, RESIZE_HANDLE};
use crate::graph::MIN_NODE_SIZE;
use crate::node::DEFAULT_NODE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current config format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "freenode.ron";

/// Zoom limits and wheel sensitivity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Smallest zoom scale
    pub min_scale: f32,
    /// Largest zoom scale
    pub max_scale: f32,
    /// Zoom factor per wheel unit is `wheel_zoom_base ^ -delta_y`
    pub wheel_zoom_base: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            wheel_zoom_base: WHEEL_ZOOM_BASE,
        }
    }
}

impl ViewportConfig {
    /// Build an identity viewport with these limits
    pub fn to_viewport(&self) -> Viewport {
        Viewport::new(self.min_scale, self.max_scale)
    }
}

/// Node geometry settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Size of built-in node types that do not pick their own
    pub default_size: [f32; 2],
    /// Floor applied to every node size
    pub min_size: [f32; 2],
    /// Side of the bottom-right resize handle, in world units
    pub resize_handle: f32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_NODE_SIZE,
            min_size: MIN_NODE_SIZE,
            resize_handle: RESIZE_HANDLE,
        }
    }
}

/// Execution settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Cycles executed per frame
    pub cycles_per_tick: u32,
    /// Start the runner as soon as the editor is created
    pub autorun: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cycles_per_tick: 1,
            autorun: false,
        }
    }
}

/// Undo history settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Oldest entries are dropped beyond this depth
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: MAX_HISTORY }
    }
}

/// Complete editor settings tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Format version
    pub version: u32,
    /// Viewport settings
    pub viewport: ViewportConfig,
    /// Node settings
    pub nodes: NodeConfig,
    /// Runner settings
    pub runner: RunnerConfig,
    /// History settings
    pub history: HistoryConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            viewport: ViewportConfig::default(),
            nodes: NodeConfig::default(),
            runner: RunnerConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Parse settings from a RON string
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(content)?;
        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }
        Ok(config.sanitized())
    }

    /// Encode settings as pretty RON
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded editor config");
        Ok(config)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Repair values that would break the editor
    pub fn sanitized(mut self) -> Self {
        self.runner.cycles_per_tick = self.runner.cycles_per_tick.max(1);
        self.history.max_depth = self.history.max_depth.max(1);
        if self.viewport.min_scale <= 0.0 {
            self.viewport.min_scale = MIN_SCALE;
        }
        if self.viewport.max_scale < self.viewport.min_scale {
            self.viewport.max_scale = self.viewport.min_scale;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = EditorConfig::default();
        assert_eq!(config.viewport.min_scale, 0.25);
        assert_eq!(config.viewport.max_scale, 3.0);
        assert_eq!(config.nodes.min_size, [80.0, 40.0]);
        assert_eq!(config.runner.cycles_per_tick, 1);
        assert!(!config.runner.autorun);
        assert_eq!(config.history.max_depth, 100);
    }

    #[test]
    fn ron_round_trip() {
        let mut config = EditorConfig::default();
        config.runner.cycles_per_tick = 4;
        config.viewport.max_scale = 5.0;

        let ron_str = config.to_ron_string().unwrap();
        let loaded = EditorConfig::from_ron_str(&ron_str).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config = EditorConfig::from_ron_str("(runner: (autorun: true))").unwrap();
        assert!(config.runner.autorun);
        assert_eq!(config.runner.cycles_per_tick, 1);
        assert_eq!(config.nodes, NodeConfig::default());
    }

    #[test]
    fn bad_values_are_repaired() {
        let config = EditorConfig::from_ron_str(
            "(runner: (cycles_per_tick: 0), viewport: (min_scale: 2.0, max_scale: 1.0))",
        )
        .unwrap();
        assert_eq!(config.runner.cycles_per_tick, 1);
        assert_eq!(config.viewport.max_scale, 2.0);
    }

    #[test]
    fn newer_version_is_rejected() {
        let err = EditorConfig::from_ron_str("(version: 99)").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 99, .. }));
        assert!(matches!(
            EditorConfig::from_ron_str("(runner: "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn save_and_load_file() {
        let path = std::env::temp_dir().join(format!("freenode-config-{}.ron", std::process::id()));
        let mut config = EditorConfig::default();
        config.history.max_depth = 7;

        config.save(&path).unwrap();
        let loaded = EditorConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.history.max_depth, 7);
    }
}
