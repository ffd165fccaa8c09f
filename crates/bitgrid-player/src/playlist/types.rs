use std::fmt;

use serde::{Deserialize, Serialize};

/// Tiling geometry: `x × y` tiles of `w × h` pixels each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    pub x: u8,
    pub y: u8,
    pub w: u8,
    pub h: u8,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self { x: 3, y: 3, w: 8, h: 8 }
    }
}

/// How logical pixels are laid out along the physical LED chain.
///
/// Kept as the authored strings; `matrix::mapping` interprets them and falls
/// back to the defaults for anything it does not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub origin: String,
    pub tile_rotation: u16,
    pub tile_order: String,
    pub tile_serpentine: bool,
    pub pixel_order: String,
    pub pixel_serpentine: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            origin: "top_left".to_string(),
            tile_rotation: 0,
            tile_order: "row_major".to_string(),
            tile_serpentine: false,
            pixel_order: "row_major".to_string(),
            pixel_serpentine: false,
        }
    }
}

/// Physical display description carried by a playlist. Only the driver reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub w: u8,
    pub h: u8,
    /// Global brightness cap (0-255).
    pub brightness: u8,
    pub tiles: TileConfig,
    pub mapping: MappingConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            w: 24,
            h: 24,
            brightness: 32,
            tiles: TileConfig::default(),
            mapping: MappingConfig::default(),
        }
    }
}

/// Time / play-count bounds of a scene. `-1` means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopCondition {
    pub seconds: i32,
    pub plays: i32,
}

impl Default for StopCondition {
    fn default() -> Self {
        Self {
            seconds: -1,
            plays: -1,
        }
    }
}

impl StopCondition {
    pub fn new(seconds: i32, plays: i32) -> Self {
        Self { seconds, plays }
    }

    pub fn has_condition(&self) -> bool {
        self.seconds > 0 || self.plays > 0
    }

    /// Neither bound given. `0` counts as given.
    pub fn is_unset(&self) -> bool {
        self.seconds < 0 && self.plays < 0
    }

    /// Time bound in milliseconds, if one is set.
    pub fn stop_after_ms(&self) -> Option<u64> {
        (self.seconds > 0).then(|| u64::from(self.seconds.unsigned_abs()) * 1000)
    }

    /// Play-count bound, if one is set.
    pub fn stop_after_plays(&self) -> Option<u32> {
        (self.plays > 0).then(|| self.plays.unsigned_abs())
    }
}

/// Editor-only hints describing how an animation was compiled. Stored, never used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileHints {
    #[allow(dead_code)]
    pub fit: String,
    #[allow(dead_code)]
    pub scale: String,
    #[allow(dead_code)]
    pub dither: String,
}

/// Pre-rendered BGR1 animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramesScene {
    pub fps: u16,
    pub stop: StopCondition,
    /// Path of the container, relative to the storage root.
    pub file: String,
    /// Authoring source the container was compiled from.
    #[allow(dead_code)]
    pub source: Option<String>,
    #[allow(dead_code)]
    pub compile: Option<CompileHints>,
}

pub const DEFAULT_FPS: u16 = 12;

#[cfg(test)]
impl FramesScene {
    /// Frames scene with the default rate and the file derived from `id`.
    pub fn for_id(id: &str) -> Self {
        Self {
            fps: DEFAULT_FPS,
            stop: StopCondition::default(),
            file: default_anim_path(id),
            source: None,
            compile: None,
        }
    }
}

/// `anims/<id>.bin`, used when a frames scene does not name its file.
pub fn default_anim_path(id: &str) -> String {
    format!("anims/{id}.bin")
}

/// Procedural effect with ordered string parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxScene {
    pub effect: String,
    pub stop: StopCondition,
    /// Keys may repeat; lookups return the first match.
    pub params: Vec<(String, String)>,
}

#[cfg(test)]
impl FxScene {
    pub fn new(effect: &str) -> Self {
        Self {
            effect: effect.to_string(),
            stop: StopCondition::default(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }
}

impl FxScene {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Unconditional redirect. An id target wins over an index target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotoScene {
    pub target_id: String,
    /// `-1` = unset.
    pub target_index: i32,
}

impl GotoScene {
    #[cfg(test)]
    pub fn to_id(id: &str) -> Self {
        Self {
            target_id: id.to_string(),
            target_index: -1,
        }
    }

    pub fn to_index(index: i32) -> Self {
        Self {
            target_id: String::new(),
            target_index: index,
        }
    }

    pub fn has_target(&self) -> bool {
        !self.target_id.is_empty() || self.target_index >= 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneKind {
    Frames(FramesScene),
    Fx(FxScene),
    Goto(GotoScene),
}

impl SceneKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            SceneKind::Frames(_) => "frames",
            SceneKind::Fx(_) => "fx",
            SceneKind::Goto(_) => "goto",
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// One playlist entry. Ids need not be unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneEntry {
    pub id: String,
    pub kind: SceneKind,
}

impl SceneEntry {
    #[cfg(test)]
    pub fn new(id: &str, kind: SceneKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

/// A loaded playlist. Produced by the loader with at least one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub version: i64,
    pub display: DisplayConfig,
    pub scenes: Vec<SceneEntry>,
}

impl Playlist {
    #[cfg(test)]
    pub fn new(scenes: Vec<SceneEntry>) -> Self {
        Self {
            version: 1,
            display: DisplayConfig::default(),
            scenes,
        }
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn scene(&self, index: usize) -> Option<&SceneEntry> {
        self.scenes.get(index)
    }

    /// Index of the first scene with this id.
    pub fn find_scene_by_id(&self, id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_condition_defaults_unset() {
        let stop = StopCondition::default();
        assert_eq!(stop.seconds, -1);
        assert_eq!(stop.plays, -1);
        assert!(!stop.has_condition());
        assert!(stop.stop_after_ms().is_none());
        assert!(stop.stop_after_plays().is_none());
    }

    #[test]
    fn stop_condition_positive_bounds() {
        assert!(StopCondition::new(3, -1).has_condition());
        assert!(StopCondition::new(-1, 2).has_condition());
        assert!(!StopCondition::new(0, 0).has_condition());
        assert!(!StopCondition::new(0, -1).is_unset());
        assert!(!StopCondition::new(-1, 0).is_unset());
        assert!(StopCondition::default().is_unset());
        assert_eq!(StopCondition::new(3, -1).stop_after_ms(), Some(3000));
        assert_eq!(StopCondition::new(-1, 2).stop_after_plays(), Some(2));
    }

    #[test]
    fn display_defaults() {
        let d = DisplayConfig::default();
        assert_eq!((d.w, d.h, d.brightness), (24, 24, 32));
        assert_eq!(d.tiles, TileConfig { x: 3, y: 3, w: 8, h: 8 });
        assert_eq!(d.mapping.origin, "top_left");
        assert_eq!(d.mapping.pixel_order, "row_major");
    }

    #[test]
    fn display_partial_fields_keep_defaults() {
        let d: DisplayConfig =
            serde_json::from_str(r#"{"brightness": 80, "tiles": {"x": 2}}"#).unwrap();
        assert_eq!(d.brightness, 80);
        assert_eq!(d.w, 24);
        assert_eq!(d.tiles.x, 2);
        assert_eq!(d.tiles.w, 8);
    }

    #[test]
    fn fx_param_first_match_wins() {
        let fx = FxScene::new("solid")
            .with_param("colour", "#FF0000")
            .with_param("colour", "#00FF00");
        assert_eq!(fx.param("colour"), Some("#FF0000"));
        assert_eq!(fx.param("color"), None);
    }

    #[test]
    fn find_scene_by_id_returns_first() {
        let playlist = Playlist::new(vec![
            SceneEntry::new("a", SceneKind::Fx(FxScene::new("solid"))),
            SceneEntry::new("b", SceneKind::Frames(FramesScene::for_id("b"))),
            SceneEntry::new("a", SceneKind::Goto(GotoScene::to_index(0))),
        ]);
        assert_eq!(playlist.find_scene_by_id("a"), Some(0));
        assert_eq!(playlist.find_scene_by_id("b"), Some(1));
        assert_eq!(playlist.find_scene_by_id("zz"), None);
        assert_eq!(playlist.scene_count(), 3);
    }

    #[test]
    fn frames_default_file_from_id() {
        let f = FramesScene::for_id("intro");
        assert_eq!(f.file, "anims/intro.bin");
        assert_eq!(f.fps, 12);
    }

    #[test]
    fn goto_target_resolution_flags() {
        assert!(GotoScene::to_id("x").has_target());
        assert!(GotoScene::to_index(0).has_target());
        assert!(!GotoScene::to_index(-1).has_target());
    }

    #[test]
    fn scene_kind_type_names() {
        assert_eq!(SceneKind::Fx(FxScene::new("solid")).to_string(), "fx");
        assert_eq!(SceneKind::Goto(GotoScene::to_index(1)).type_name(), "goto");
    }
}
