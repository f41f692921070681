use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::importer::ImportOptions;

// ── Layout ────────────────────────────────────────────────────────────────────

/// Card geometry and spacing, all in scene pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between vertically adjacent cards.
    pub sibling_gap: f64,
    /// Gap between depth columns.
    pub column_gap: f64,
    /// Horizontal control-point offset of link curves.
    pub link_curvature: f64,
    /// Spacing multiplier between leaves that belong to different parents.
    pub subtree_separation: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 260.0,
            node_height: 120.0,
            sibling_gap: 30.0,
            column_gap: 80.0,
            link_curvature: 36.0,
            subtree_separation: 1.0,
        }
    }
}

impl LayoutConfig {
    /// Distance between neighbouring leaves on the sibling axis.
    pub fn row_spacing(&self) -> f64 {
        self.node_height + self.sibling_gap
    }

    /// Distance between neighbouring leaves of different parents.
    /// Never tighter than `row_spacing`, or cousin cards would overlap.
    pub fn subtree_spacing(&self) -> f64 {
        self.row_spacing() * self.subtree_separation.max(1.0)
    }

    /// Distance between depth columns.
    pub fn column_spacing(&self) -> f64 {
        self.node_width + self.column_gap
    }
}

// ── Viewport ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Upper bound for fit-to-view, kept inside `max_scale`.
    pub fit_max_scale: f64,
    pub fit_padding: f64,
    /// Multiplier applied per zoom key press or wheel notch.
    pub zoom_step: f64,
    /// Screen pixels moved per pan key press.
    pub pan_step: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.3,
            max_scale: 2.5,
            fit_max_scale: 2.0,
            fit_padding: 60.0,
            zoom_step: 1.2,
            pan_step: 48.0,
        }
    }
}

// ── Minimap ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimapConfig {
    pub enabled: bool,
    pub height: f64,
    pub pad: f64,
    /// Viewbox growth per wheel notch over the minimap.
    pub wheel_step: f64,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            height: 160.0,
            pad: 8.0,
            wheel_step: 1.15,
        }
    }
}

// ── Animation ─────────────────────────────────────────────────────────────────

/// Transition durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub enter_ms: u64,
    pub exit_ms: u64,
    pub fit_ms: u64,
    pub recentre_ms: u64,
    pub brush_ms: u64,
    /// Redraw interval while anything is moving.
    pub frame_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enter_ms: 350,
            exit_ms: 300,
            fit_ms: 400,
            recentre_ms: 160,
            brush_ms: 220,
            frame_ms: 16,
        }
    }
}

// ── Import ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub include_system: bool,
    pub include_tool: bool,
}

// ── Terminal ──────────────────────────────────────────────────────────────────

/// How scene pixels map onto terminal cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub cell_width: f64,
    pub cell_height: f64,
    pub mouse: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cell_width: 8.0,
            cell_height: 16.0,
            mouse: true,
        }
    }
}

// ── Panel ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Panel width in terminal columns.
    pub width: u16,
    /// Characters kept in fork and sibling previews.
    pub preview_chars: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: 48,
            preview_chars: 180,
        }
    }
}

// ── Config file ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub minimap: MinimapConfig,
    pub animation: AnimationConfig,
    pub import: ImportConfig,
    pub terminal: TerminalConfig,
    pub panel: PanelConfig,
}

impl ConfigFile {
    /// Load from disk, or return a default config if the file doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
    }

    /// Write a starter config file to disk (only if it doesn't exist).
    pub fn write_default_if_missing() -> Result<PathBuf> {
        let path = config_path();
        Self::write_default_to(&path)?;
        Ok(path)
    }

    pub fn write_default_to(path: &Path) -> Result<()> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, DEFAULT_CONFIG_TOML)
            .with_context(|| format!("Failed to write config file at {}", path.display()))
    }
}

/// Smallest zoom factor any config may ask for.
pub const MIN_SCALE_FLOOR: f64 = 0.01;

// ── Resolved runtime config (after merging file + CLI overrides) ──────────────

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub minimap: MinimapConfig,
    pub animation: AnimationConfig,
    pub terminal: TerminalConfig,
    pub panel: PanelConfig,
    /// Role filters and conversation choice handed to the importer
    pub import: ImportOptions,
}

impl ResolvedConfig {
    /// Merge config file with CLI overrides.
    /// Priority: CLI args > env vars (handled by clap) > config file > built-in defaults
    pub fn resolve(
        file: &ConfigFile,
        conversation_override: Option<&str>,
        include_system: bool,
        include_tool: bool,
    ) -> Self {
        let mut viewport = file.viewport.clone();
        // Keep the bounds ordered even when the file disagrees.
        if viewport.max_scale < viewport.min_scale {
            std::mem::swap(&mut viewport.min_scale, &mut viewport.max_scale);
        }
        // A zero scale cannot be inverted.
        viewport.min_scale = viewport.min_scale.max(MIN_SCALE_FLOOR);
        viewport.max_scale = viewport.max_scale.max(viewport.min_scale);
        viewport.fit_max_scale = viewport
            .fit_max_scale
            .clamp(viewport.min_scale, viewport.max_scale);

        Self {
            layout: file.layout.clone(),
            viewport,
            minimap: file.minimap.clone(),
            animation: file.animation.clone(),
            terminal: file.terminal.clone(),
            panel: file.panel.clone(),
            import: ImportOptions {
                conversation_id: conversation_override.map(str::to_string),
                include_system: include_system || file.import.include_system,
                include_tool: include_tool || file.import.include_tool,
            },
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::resolve(&ConfigFile::default(), None, false, false)
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

pub fn config_path() -> PathBuf {
    dirs_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("branchview")
        .join("config.toml")
}

fn dirs_config_dir() -> Option<PathBuf> {
    // XDG_CONFIG_HOME or ~/.config
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

// ── Default config template written on first run ──────────────────────────────

const DEFAULT_CONFIG_TOML: &str = r#"# branchview configuration
# Run `branchview --init` to regenerate this file.
# Every key is optional; missing keys use the values shown here.

# ── Card geometry (scene pixels) ─────────────────────────────────────────────
[layout]
node_width         = 260.0
node_height        = 120.0
sibling_gap        = 30.0
column_gap         = 80.0
link_curvature     = 36.0
subtree_separation = 1.0

# ── Zoom and fit ─────────────────────────────────────────────────────────────
[viewport]
min_scale     = 0.3
max_scale     = 2.5
fit_max_scale = 2.0
fit_padding   = 60.0
zoom_step     = 1.2
pan_step      = 48.0

# ── Overview strip ───────────────────────────────────────────────────────────
[minimap]
enabled    = true
height     = 160.0
pad        = 8.0
wheel_step = 1.15

# ── Transition durations (ms) ────────────────────────────────────────────────
[animation]
enter_ms    = 350
exit_ms     = 300
fit_ms      = 400
recentre_ms = 160
brush_ms    = 220
frame_ms    = 16

# ── Export import ────────────────────────────────────────────────────────────
[import]
include_system = false
include_tool   = false   # covers both "tool" and "function" roles

# ── Terminal mapping ─────────────────────────────────────────────────────────
# One cell covers cell_width × cell_height scene pixels at zoom 1.0.
[terminal]
cell_width  = 8.0
cell_height = 16.0
mouse       = true

# ── Side panel ───────────────────────────────────────────────────────────────
[panel]
width         = 48
preview_chars = 180
"#;
