use crate::matrix::PixelSink;
use crate::playlist::{GotoScene, Playlist, SceneKind};
use crate::scene::{Scene, SceneFactory};
use crate::storage::Storage;

/// How long an effect runs when its stop condition sets no time bound.
pub const DEFAULT_FX_DURATION_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No scene instantiated.
    Empty,
    /// A scene is running.
    Active,
}

/// Read-only snapshot of the playback state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackInfo {
    pub state: PlaybackState,
    pub scene_count: usize,
    /// Playlist index of the last loaded entry. After a goto this is the
    /// goto's own index until its target loads.
    pub current_index: usize,
    pub scene_id: String,
    pub scene_type: &'static str,
    pub scene_elapsed_ms: u64,
    /// Load queued for the next tick.
    pub pending: Option<usize>,
}

/// Owns the playlist and the one live scene, and sequences scenes.
///
/// Every transition goes through `pending` and is carried out at the top of
/// the next [`tick`](Self::tick), one load per call, so goto chains and runs
/// of failing scenes never recurse.
pub struct PlaybackManager<S> {
    playlist: Playlist,
    factory: SceneFactory<S>,
    current_index: usize,
    scene: Option<Scene>,
    scene_elapsed_ms: u64,
    pending: Option<usize>,
}

impl<S: Storage> PlaybackManager<S> {
    pub fn new(playlist: Playlist, factory: SceneFactory<S>) -> Self {
        Self {
            playlist,
            factory,
            current_index: 0,
            scene: None,
            scene_elapsed_ms: 0,
            pending: None,
        }
    }

    /// Load the first scene.
    pub fn start(&mut self) {
        log::info!(target: "PLBK", "Starting playback with {} scenes", self.playlist.scene_count());
        if self.playlist.scene_count() == 0 {
            log::error!(target: "PLBK", "Playlist has no scenes!");
            return;
        }
        self.load_scene(0);
    }

    /// Advance playback by `dt_ms`. Returns true when the scene changed or a
    /// transition was requested.
    pub fn tick(&mut self, dt_ms: u32) -> bool {
        if let Some(index) = self.pending.take() {
            self.load_scene(index);
            return true;
        }

        let Some(scene) = &mut self.scene else {
            return false;
        };
        self.scene_elapsed_ms += u64::from(dt_ms);
        scene.tick(dt_ms);

        if self.should_stop_current() {
            self.advance_to_next();
            return true;
        }
        false
    }

    pub fn render_frame(&mut self, sink: &mut dyn PixelSink) {
        if let Some(scene) = &mut self.scene {
            scene.render_frame(sink);
        }
    }

    /// Replace the live scene with playlist entry `index`. Returns false when
    /// the index is out of range, the scene could not be built, or a goto
    /// did not resolve.
    pub fn load_scene(&mut self, index: usize) -> bool {
        let Some(entry) = self.playlist.scene(index) else {
            log::error!(target: "PLBK", "Invalid scene index: {index}");
            return false;
        };

        self.scene = None;

        let mut scene = match &entry.kind {
            SceneKind::Fx(fx) => match self.factory.create_fx(fx) {
                Some(scene) => {
                    log::info!(
                        target: "PLBK",
                        "Scene[{index}]: FX '{}' effect='{}'",
                        entry.id,
                        fx.effect
                    );
                    if !fx.stop.has_condition() {
                        log::debug!(
                            target: "PLBK",
                            "No stop condition, running {DEFAULT_FX_DURATION_MS} ms"
                        );
                    }
                    scene
                }
                None => {
                    log::error!(target: "PLBK", "Failed to create FX scene: {}", fx.effect);
                    self.current_index = index;
                    self.advance_to_next();
                    return false;
                }
            },
            SceneKind::Frames(frames) => {
                log::info!(
                    target: "PLBK",
                    "Scene[{index}]: Frames '{}' fps={} file='{}'",
                    entry.id,
                    frames.fps,
                    frames.file
                );
                self.factory.create_frames(frames)
            }
            SceneKind::Goto(goto) => {
                let target = self.resolve_goto(goto);
                self.current_index = index;
                return match target {
                    Some(target) => {
                        log::info!(target: "PLBK", "Scene[{index}]: Goto -> Scene[{target}]");
                        self.pending = Some(target);
                        true
                    }
                    None => {
                        log::error!(target: "PLBK", "Invalid goto target, advancing to next");
                        self.advance_to_next();
                        false
                    }
                };
            }
        };

        self.current_index = index;
        self.scene_elapsed_ms = 0;
        scene.begin();
        self.scene = Some(scene);
        true
    }

    /// A non-empty id is looked up and wins; otherwise the index is used.
    fn resolve_goto(&self, goto: &GotoScene) -> Option<usize> {
        let target = if !goto.target_id.is_empty() {
            let found = self.playlist.find_scene_by_id(&goto.target_id);
            log::debug!(target: "PLBK", "Goto by id '{}' -> {found:?}", goto.target_id);
            found
        } else {
            let index = usize::try_from(goto.target_index).ok();
            log::debug!(target: "PLBK", "Goto by index {}", goto.target_index);
            index
        };
        target.filter(|t| *t < self.playlist.scene_count())
    }

    fn should_stop_current(&self) -> bool {
        let Some(scene) = &self.scene else {
            return false;
        };
        match self.playlist.scene(self.current_index).map(|e| &e.kind) {
            Some(SceneKind::Fx(fx)) => {
                let limit = fx.stop.stop_after_ms().unwrap_or(DEFAULT_FX_DURATION_MS);
                let stop = self.scene_elapsed_ms >= limit;
                if stop {
                    log::debug!(
                        target: "PLBK",
                        "FX scene stopping: elapsed={} ms, limit={limit} ms",
                        self.scene_elapsed_ms
                    );
                }
                stop
            }
            Some(SceneKind::Frames(_)) => {
                let stop = scene.should_stop();
                if stop {
                    log::debug!(target: "PLBK", "Frames scene stopping");
                }
                stop
            }
            Some(SceneKind::Goto(_)) | None => false,
        }
    }

    fn advance_to_next(&mut self) {
        let mut next = self.current_index + 1;
        if next >= self.playlist.scene_count() {
            next = 0;
            log::info!(target: "PLBK", "Reached end of playlist, looping to start");
        }
        self.pending = Some(next);
    }
}

impl<S> PlaybackManager<S> {
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn info(&self) -> PlaybackInfo {
        let entry = self.playlist.scene(self.current_index);
        PlaybackInfo {
            state: if self.scene.is_some() {
                PlaybackState::Active
            } else {
                PlaybackState::Empty
            },
            scene_count: self.playlist.scene_count(),
            current_index: self.current_index,
            scene_id: entry.map(|e| e.id.clone()).unwrap_or_default(),
            scene_type: entry.map_or("", |e| e.type_name()),
            scene_elapsed_ms: self.scene_elapsed_ms,
            pending: self.pending,
        }
    }
}

#[cfg(test)]
impl<S> PlaybackManager<S> {
    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    pub fn scene_elapsed_ms(&self) -> u64 {
        self.scene_elapsed_ms
    }
}
