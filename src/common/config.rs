use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Layout behavior: tiling mode, split policy, gaps.
    #[serde(default)]
    pub layout: LayoutSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Tiling mode applied to workspaces that have not chosen one.
    #[serde(default)]
    pub mode: TilingMode,
    /// Split ratio given to freshly created splits. Must lie strictly
    /// between 0 and 1.
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f64,
    /// How the split axis is chosen when a window is paired into a leaf.
    #[serde(default)]
    pub split_preference: SplitPreference,
    /// Spawn new windows as the left/upper child instead of the
    /// right/lower one.
    #[serde(default)]
    pub spawn_left: bool,
    /// Gap configuration for window spacing
    #[serde(default)]
    pub gaps: GapSettings,
}

/// Tiling mode enum
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum TilingMode {
    /// Binary space partitioning tiling
    #[default]
    Bsp,
    /// Single-column stack, every window gets the full tiling area
    Monocle,
    /// Windows are left unmanaged
    Floating,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitPreference {
    /// Pick the axis from the aspect ratio of the leaf being split.
    #[default]
    Optimal,
    /// Always split into left/right columns.
    Vertical,
    /// Always split into upper/lower rows.
    Horizontal,
}

/// Gap configuration for window spacing
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    /// Outer gaps (space between windows and screen edges)
    #[serde(default)]
    pub outer: OuterGaps,
    /// Inner gaps (space between windows)
    #[serde(default)]
    pub inner: InnerGaps,
}

/// Outer gap configuration (space between windows and screen edges)
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy, Default)]
#[serde(deny_unknown_fields)]
pub struct OuterGaps {
    /// Gap at the top of the screen
    #[serde(default)]
    pub top: f64,
    /// Gap at the left of the screen
    #[serde(default)]
    pub left: f64,
    /// Gap at the bottom of the screen
    #[serde(default)]
    pub bottom: f64,
    /// Gap at the right of the screen
    #[serde(default)]
    pub right: f64,
}

/// Inner gap configuration (space between windows)
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy, Default)]
#[serde(deny_unknown_fields)]
pub struct InnerGaps {
    /// Horizontal gap between side-by-side windows
    #[serde(default)]
    pub horizontal: f64,
    /// Vertical gap between stacked windows
    #[serde(default)]
    pub vertical: f64,
}

fn default_split_ratio() -> f64 { 0.5 }

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            mode: TilingMode::default(),
            split_ratio: default_split_ratio(),
            split_preference: SplitPreference::default(),
            spawn_left: false,
            gaps: GapSettings::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.layout.validate());
        issues
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.split_ratio <= 0.0 || self.split_ratio >= 1.0 {
            issues.push(format!(
                "split_ratio must lie strictly between 0 and 1, got {}",
                self.split_ratio
            ));
        }

        issues.extend(self.gaps.validate());

        issues
    }
}

impl GapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (name, value) in [
            ("outer.top", self.outer.top),
            ("outer.left", self.outer.left),
            ("outer.bottom", self.outer.bottom),
            ("outer.right", self.outer.right),
            ("inner.horizontal", self.inner.horizontal),
            ("inner.vertical", self.inner.vertical),
        ] {
            if value < 0.0 {
                issues.push(format!("gaps.{name} must be non-negative, got {value}"));
            }
        }

        issues
    }
}

/// Default location of the configuration file.
pub fn config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("slate").join("config.toml"))
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}
