use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::services::visibility::PageBounds;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct PresentationConfig {
    /// 0 shows every row on one page.
    #[serde(default)]
    pub rows_per_page: usize,
    #[serde(default)]
    pub page_bounds: PageBounds,
    #[serde(
        default = "default_row_fly_animation_seconds",
        alias = "row_move_animation_seconds"
    )]
    pub row_fly_animation_seconds: f32,
    #[serde(default = "default_refresh_interval_seconds")]
    pub refresh_interval_seconds: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            rows_per_page: 0,
            page_bounds: PageBounds::default(),
            row_fly_animation_seconds: default_row_fly_animation_seconds(),
            refresh_interval_seconds: default_refresh_interval_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub show_team_group: bool,
    #[serde(default = "default_animation")]
    pub animation: bool,
    /// Award ceremony mode. Combined with `award_hide_name` it masks team identities.
    #[serde(default)]
    pub award_mode: bool,
    #[serde(default)]
    pub award_hide_name: bool,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            show_team_group: false,
            animation: default_animation(),
            award_mode: false,
            award_hide_name: false,
            presentation: PresentationConfig::default(),
        }
    }
}

impl BoardConfig {
    pub fn hides_team_identity(&self) -> bool {
        self.award_mode && self.award_hide_name
    }
}

fn default_animation() -> bool {
    true
}

fn default_row_fly_animation_seconds() -> f32 {
    0.45
}

fn default_refresh_interval_seconds() -> u64 {
    5
}

pub fn load_board_config(data_folder: &Path) -> Result<BoardConfig> {
    let config_path = data_folder.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        info!(
            "config.toml not found in data folder, using defaults: {}",
            config_path.display()
        );
        return Ok(BoardConfig::default());
    }

    let raw = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config.toml at {}", config_path.display()))?;

    toml::from_str::<BoardConfig>(&raw)
        .with_context(|| format!("Failed to parse config.toml at {}", config_path.display()))
}
