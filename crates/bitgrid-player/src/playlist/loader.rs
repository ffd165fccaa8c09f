use serde_json::{Map, Value};

use super::types::{
    CompileHints, DEFAULT_FPS, DisplayConfig, FramesScene, FxScene, GotoScene, MappingConfig,
    Playlist, SceneEntry, SceneKind, StopCondition, TileConfig, default_anim_path,
};
use crate::storage::Storage;

/// Default playlist location on the storage root.
pub const DEFAULT_PLAYLIST_PATH: &str = "/playlist.json";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open playlist {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("playlist document is not a JSON object")]
    NotAnObject,
    #[error("playlist has no valid scenes")]
    NoScenes,
}

/// Builds a [`Playlist`] from a JSON document, applying defaults and
/// skipping entries that cannot be played.
pub struct PlaylistLoader;

impl PlaylistLoader {
    /// Read and parse the playlist at `path` on `storage`.
    pub fn load(storage: &impl Storage, path: &str) -> Result<Playlist, LoadError> {
        log::info!(target: "PLST", "Loading playlist from: {path}");
        let contents = storage
            .read_to_string(path)
            .map_err(|source| LoadError::Open {
                path: path.to_string(),
                source,
            })?;
        log::debug!(target: "PLST", "Playlist file size: {} bytes", contents.len());
        Self::parse_str(&contents)
    }

    pub fn parse_str(json: &str) -> Result<Playlist, LoadError> {
        let doc: Value = serde_json::from_str(json)?;
        Self::from_value(&doc)
    }

    pub fn from_value(doc: &Value) -> Result<Playlist, LoadError> {
        let doc = doc.as_object().ok_or(LoadError::NotAnObject)?;

        let version = doc.get("version").and_then(Value::as_i64).unwrap_or(1);
        log::debug!(target: "PLST", "Playlist version: {version}");

        let display = match doc.get("display") {
            Some(block) => Self::parse_display(block),
            None => {
                log::warn!(target: "PLST", "No display config found, using defaults");
                DisplayConfig::default()
            }
        };
        log::info!(
            target: "PLST",
            "Display: {}x{}, brightness={}, tiles={}x{} ({}x{} each)",
            display.w,
            display.h,
            display.brightness,
            display.tiles.x,
            display.tiles.y,
            display.tiles.w,
            display.tiles.h
        );

        let mut scenes = Vec::new();
        match doc.get("scenes").and_then(Value::as_array) {
            Some(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    match Self::parse_scene(entry) {
                        Some(scene) => {
                            log::debug!(
                                target: "PLST",
                                "  Scene[{}]: id='{}' type='{}'",
                                scenes.len(),
                                scene.id,
                                scene.type_name()
                            );
                            scenes.push(scene);
                        }
                        None => log::warn!(target: "PLST", "  Skipped invalid scene entry {i}"),
                    }
                }
                log::info!(target: "PLST", "Loaded {} scenes successfully", scenes.len());
            }
            None => log::warn!(target: "PLST", "No scenes array found in playlist"),
        }

        if scenes.is_empty() {
            log::error!(target: "PLST", "Playlist has no valid scenes");
            return Err(LoadError::NoScenes);
        }

        Ok(Playlist {
            version,
            display,
            scenes,
        })
    }

    /// Each field falls back to its own default; a block that is not an
    /// object yields the default display.
    fn parse_display(block: &Value) -> DisplayConfig {
        let Some(obj) = block.as_object() else {
            log::warn!(target: "PLST", "Display config invalid, using defaults");
            return DisplayConfig::default();
        };
        let defaults = DisplayConfig::default();

        let tiles = match obj.get("tiles").and_then(Value::as_object) {
            Some(t) => TileConfig {
                x: u8_field(t, "x", defaults.tiles.x),
                y: u8_field(t, "y", defaults.tiles.y),
                w: u8_field(t, "w", defaults.tiles.w),
                h: u8_field(t, "h", defaults.tiles.h),
            },
            None => defaults.tiles,
        };

        let mapping = match obj.get("mapping").and_then(Value::as_object) {
            Some(m) => {
                let d = defaults.mapping;
                MappingConfig {
                    origin: str_field(m, "origin").unwrap_or(d.origin),
                    tile_rotation: u16_field(m, "tile_rotation", d.tile_rotation),
                    tile_order: str_field(m, "tile_order").unwrap_or(d.tile_order),
                    tile_serpentine: bool_field(m, "tile_serpentine", d.tile_serpentine),
                    pixel_order: str_field(m, "pixel_order").unwrap_or(d.pixel_order),
                    pixel_serpentine: bool_field(m, "pixel_serpentine", d.pixel_serpentine),
                }
            }
            None => defaults.mapping,
        };

        DisplayConfig {
            w: u8_field(obj, "w", defaults.w),
            h: u8_field(obj, "h", defaults.h),
            brightness: u8_field(obj, "brightness", defaults.brightness),
            tiles,
            mapping,
        }
    }

    fn parse_scene(entry: &Value) -> Option<SceneEntry> {
        let Some(obj) = entry.as_object() else {
            log::warn!(target: "PLST", "Scene entry is not an object");
            return None;
        };
        let (Some(kind), Some(id)) = (obj.get("type"), obj.get("id")) else {
            log::warn!(target: "PLST", "Scene missing 'type' or 'id'");
            return None;
        };
        let id = value_to_string(id);

        let kind = match kind.as_str() {
            Some("frames") => Some(SceneKind::Frames(Self::parse_frames(&id, obj))),
            Some("fx") => Self::parse_fx(obj).map(SceneKind::Fx),
            Some("goto") => Self::parse_goto(obj).map(SceneKind::Goto),
            _ => {
                log::warn!(target: "PLST", "Unknown scene type: {}", value_to_string(kind));
                None
            }
        }?;

        Some(SceneEntry { id, kind })
    }

    fn parse_frames(id: &str, obj: &Map<String, Value>) -> FramesScene {
        let scene = FramesScene {
            fps: u16_field(obj, "fps", DEFAULT_FPS),
            stop: parse_stop(obj),
            file: obj
                .get("file")
                .map_or_else(|| default_anim_path(id), value_to_string),
            source: obj.get("source").map(value_to_string),
            compile: obj
                .get("compile")
                .map(|c| c.as_object().cloned().unwrap_or_default())
                .map(|c| CompileHints {
                    fit: str_field(&c, "fit").unwrap_or_default(),
                    scale: str_field(&c, "scale").unwrap_or_default(),
                    dither: str_field(&c, "dither").unwrap_or_default(),
                }),
        };
        log::debug!(target: "PLST", "    frames: fps={} file='{}'", scene.fps, scene.file);
        scene
    }

    fn parse_fx(obj: &Map<String, Value>) -> Option<FxScene> {
        let effect = obj.get("effect").map(value_to_string).unwrap_or_default();
        if effect.is_empty() {
            log::warn!(target: "PLST", "FX scene missing 'effect' field");
            return None;
        }
        let params: Vec<(String, String)> = obj
            .get("params")
            .and_then(Value::as_object)
            .map(|params| {
                params
                    .iter()
                    .map(|(k, v)| (k.clone(), value_to_string(v)))
                    .collect()
            })
            .unwrap_or_default();
        log::debug!(target: "PLST", "    fx: effect='{effect}' params={}", params.len());
        Some(FxScene {
            effect,
            stop: parse_stop(obj),
            params,
        })
    }

    fn parse_goto(obj: &Map<String, Value>) -> Option<GotoScene> {
        let scene = match obj.get("target").and_then(Value::as_object) {
            Some(target) => GotoScene {
                target_id: target.get("id").map(value_to_string).unwrap_or_default(),
                target_index: i32_field(target, "index", -1),
            },
            None => GotoScene::to_index(-1),
        };
        if !scene.has_target() {
            log::warn!(target: "PLST", "Goto scene missing valid target");
            return None;
        }
        log::debug!(
            target: "PLST",
            "    goto: targetId='{}' targetIndex={}",
            scene.target_id,
            scene.target_index
        );
        Some(scene)
    }
}

/// `stop` block of a scene; missing bounds stay unset.
fn parse_stop(obj: &Map<String, Value>) -> StopCondition {
    match obj.get("stop").and_then(Value::as_object) {
        Some(stop) => StopCondition::new(
            i32_field(stop, "seconds", -1),
            i32_field(stop, "plays", -1),
        ),
        None => StopCondition::default(),
    }
}

fn u8_field(obj: &Map<String, Value>, key: &str, default: u8) -> u8 {
    obj.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(default)
}

fn u16_field(obj: &Map<String, Value>, key: &str, default: u16) -> u16 {
    obj.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(default)
}

fn i32_field(obj: &Map<String, Value>, key: &str, default: i32) -> i32 {
    obj.get(key)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(default)
}

fn bool_field(obj: &Map<String, Value>, key: &str, default: bool) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Strings as-is, `null` as empty, anything else as its JSON text.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
