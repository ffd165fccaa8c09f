use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::playlist::DEFAULT_PLAYLIST_PATH;

/// Persisted player configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Directory standing in for the SD card root.
    pub storage_root: PathBuf,
    /// Playlist path, relative to the storage root.
    pub playlist_path: String,
    pub target_fps: u32,
    pub watch: bool,
    pub width: u16,
    pub height: u16,
    pub brightness: u8,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("sd"),
            playlist_path: DEFAULT_PLAYLIST_PATH.to_string(),
            target_fps: 60,
            watch: true,
            width: 24,
            height: 24,
            brightness: 32,
        }
    }
}

impl PlayerConfig {
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("bitgrid").join("player.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Missing file gives defaults; a malformed one is logged and ignored.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded player config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse player config: {e}");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No player config found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::debug!("Saved player config to {}", path.display());
        Ok(())
    }

    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(root) = &args.root {
            self.storage_root.clone_from(root);
        }
        if let Some(playlist) = &args.playlist {
            self.playlist_path.clone_from(playlist);
        }
        if args.no_watch {
            self.watch = false;
        }
    }

    /// Milliseconds per frame at the target rate.
    pub fn frame_interval_ms(&self) -> u32 {
        1000 / self.target_fps.max(1)
    }
}

/// Command-line overrides for a single run.
#[derive(Parser, Debug, Default)]
#[command(name = "bitgrid", version, about = "Play a BitGrid playlist on an LED matrix")]
pub struct CliArgs {
    /// Storage root directory.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Playlist path inside the storage root.
    #[arg(long)]
    pub playlist: Option<String>,

    /// Stop after this many frames.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Disable reloading on storage changes.
    #[arg(long, default_value_t = false)]
    pub no_watch: bool,

    /// Write the final frame to this PNG.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Save the effective configuration as the new defaults.
    #[arg(long, default_value_t = false)]
    pub save_config: bool,
}
