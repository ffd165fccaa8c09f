use std::path::Path;

use anyhow::{Context, Result};

use crate::matrix::{LedMatrix, PixelSink};
use crate::playback::PlaybackManager;
use crate::playlist::PlaylistLoader;
use crate::scene::{Scene, SceneFactory, TestPattern};
use crate::settings::PlayerConfig;
use crate::storage::DirStorage;
use crate::watcher::PlaylistWatcher;

/// Snapshot pixels per LED.
pub const SNAPSHOT_SCALE: u32 = 16;

pub struct App {
    pub config: PlayerConfig,
    pub matrix: LedMatrix,
    storage: DirStorage,
    playback: Option<PlaybackManager<DirStorage>>,
    fallback: TestPattern,
    watcher: Option<PlaylistWatcher>,
}

impl App {
    pub fn new(config: PlayerConfig) -> Self {
        let storage = DirStorage::new(&config.storage_root);
        let matrix = LedMatrix::new(config.width, config.height, config.brightness);

        let watcher = if config.watch {
            match PlaylistWatcher::new(storage.root()) {
                Ok(w) => Some(w),
                Err(e) => {
                    log::warn!("Playlist watcher unavailable: {e}");
                    None
                }
            }
        } else {
            None
        };

        let mut app = Self {
            config,
            matrix,
            storage,
            playback: None,
            fallback: TestPattern::new(),
            watcher,
        };
        app.reload_playlist();
        app
    }

    /// Drop the current playlist and load it again from storage. On failure
    /// the player is left without a playlist and shows the test pattern.
    pub fn reload_playlist(&mut self) -> bool {
        self.playback = None;

        let path = self.config.playlist_path.clone();
        match PlaylistLoader::load(&self.storage, &path) {
            Ok(playlist) => {
                log::info!(
                    "Playlist {path} loaded: {} scenes (v{})",
                    playlist.scene_count(),
                    playlist.version
                );
                self.matrix.apply_display(&playlist.display);
                let factory = SceneFactory::new(
                    self.storage.clone(),
                    self.matrix.width(),
                    self.matrix.height(),
                );
                let mut playback = PlaybackManager::new(playlist, factory);
                playback.start();
                self.playback = Some(playback);
                true
            }
            Err(e) => {
                log::error!("Failed to load playlist {path}: {e}");
                log::warn!("Running built-in test pattern");
                self.fallback = TestPattern::new();
                false
            }
        }
    }

    /// Reload if the watcher saw playlist or animation changes.
    pub fn poll_reload(&mut self) -> bool {
        let Some(watcher) = &self.watcher else {
            return false;
        };
        let changes = watcher.drain_changes();
        if changes.is_empty() {
            return false;
        }
        for path in &changes {
            log::info!("Storage changed: {}", path.display());
        }
        self.reload_playlist();
        true
    }

    pub fn tick(&mut self, dt_ms: u32) {
        match &mut self.playback {
            Some(playback) => {
                if playback.tick(dt_ms) {
                    let info = playback.info();
                    log::debug!(
                        "Scene[{}/{}] '{}' {} {:?} ({}), elapsed {} ms, pending {:?}",
                        info.current_index,
                        info.scene_count,
                        info.scene_id,
                        info.scene_type,
                        info.state,
                        playback.current_scene().map_or("none", Scene::name),
                        info.scene_elapsed_ms,
                        info.pending
                    );
                }
            }
            None => self.fallback.tick(dt_ms),
        }
    }

    /// Scenes draw over the previous frame, so the last image holds while a
    /// transition is pending.
    pub fn render(&mut self) {
        match &mut self.playback {
            Some(playback) => playback.render_frame(&mut self.matrix),
            None => self.fallback.render_frame(&mut self.matrix),
        }
    }

    /// One frame of the outer loop.
    pub fn frame(&mut self, dt_ms: u32) {
        self.poll_reload();
        self.tick(dt_ms);
        self.render();
        self.matrix.show();
    }

    pub fn playback(&self) -> Option<&PlaybackManager<DirStorage>> {
        self.playback.as_ref()
    }

    /// Write the framebuffer as a PNG, each LED drawn as a square block.
    pub fn snapshot(&self, path: &Path) -> Result<()> {
        let width = u32::from(self.matrix.width());
        let height = u32::from(self.matrix.height());
        let img =
            image::RgbImage::from_fn(width * SNAPSHOT_SCALE, height * SNAPSHOT_SCALE, |x, y| {
                let px = self
                    .matrix
                    .pixel((x / SNAPSHOT_SCALE) as u16, (y / SNAPSHOT_SCALE) as u16)
                    .unwrap_or_default();
                image::Rgb([px.r, px.g, px.b])
            });
        img.save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        log::info!("Snapshot saved to {}", path.display());
        Ok(())
    }
}
