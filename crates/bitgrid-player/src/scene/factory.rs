use crate::matrix::Rgb;
use crate::playlist::{FramesScene, FxScene};
use crate::storage::Storage;

use super::{FramesPlayer, Scene, SolidScene};

/// Builds live scenes from playlist entries for a display of fixed size.
pub struct SceneFactory<S> {
    storage: S,
    width: u16,
    height: u16,
}

impl<S: Storage> SceneFactory<S> {
    pub fn new(storage: S, width: u16, height: u16) -> Self {
        Self {
            storage,
            width,
            height,
        }
    }

    /// `None` when the effect is unknown.
    pub fn create_fx(&self, fx: &FxScene) -> Option<Scene> {
        match fx.effect.as_str() {
            "solid" => {
                let value = fx
                    .param("colour")
                    .filter(|v| !v.is_empty())
                    .or_else(|| fx.param("color"))
                    .unwrap_or("#FFFFFF");
                let solid = SolidScene::new(parse_color(value));
                log::info!(
                    target: "SCNF",
                    "Created solid FX with color 0x{:06X}",
                    solid.color().to_u32()
                );
                Some(Scene::Solid(solid))
            }
            other => {
                log::error!(target: "SCNF", "Unknown FX effect: {other}");
                None
            }
        }
    }

    /// Always yields a scene; an unreadable container gives an invalid player.
    pub fn create_frames(&self, frames: &FramesScene) -> Scene {
        log::info!(target: "SCNF", "Creating frames scene from {}", frames.file);
        Scene::Frames(FramesPlayer::open(
            &self.storage,
            &frames.file,
            frames.fps,
            frames.stop,
            self.width,
            self.height,
        ))
    }
}

/// Parse `#RRGGBB` / `RRGGBB`, case-insensitive. Leading hex digits are
/// consumed up to the first non-hex character; the value is masked to 24 bits.
/// No digits at all gives white.
pub fn parse_color(value: &str) -> Rgb {
    let hex = value.trim_start();
    let hex = hex.strip_prefix('#').unwrap_or(hex);

    let mut parsed: Option<u32> = None;
    for digit in hex.chars().map_while(|c| c.to_digit(16)) {
        let acc = parsed.unwrap_or(0);
        parsed = Some(acc.checked_mul(16).and_then(|v| v.checked_add(digit)).unwrap_or(u32::MAX));
    }

    match parsed {
        Some(color) => Rgb::from_u32(color & 0x00FF_FFFF),
        None => {
            log::warn!(target: "SCNF", "Invalid color '{value}', using white");
            Rgb::WHITE
        }
    }
}
