pub mod container;
pub mod factory;
pub mod frames;
pub mod solid;

pub use factory::SceneFactory;
pub use frames::FramesPlayer;
pub use solid::{SolidScene, TestPattern};

use crate::matrix::PixelSink;

/// A live, playable scene.
pub enum Scene {
    Solid(SolidScene),
    Frames(FramesPlayer),
}

impl Scene {
    pub fn name(&self) -> &'static str {
        match self {
            Scene::Solid(_) => "solid",
            Scene::Frames(_) => "frames",
        }
    }

    pub fn begin(&mut self) {
        match self {
            Scene::Solid(_) => {}
            Scene::Frames(player) => player.begin(),
        }
    }

    pub fn tick(&mut self, dt_ms: u32) {
        match self {
            Scene::Solid(_) => {}
            Scene::Frames(player) => player.tick(dt_ms),
        }
    }

    pub fn render_frame(&mut self, sink: &mut dyn PixelSink) {
        match self {
            Scene::Solid(solid) => solid.render_frame(sink),
            Scene::Frames(player) => player.render_frame(sink),
        }
    }

    /// Scene-owned stop decision. Effects never stop on their own; the
    /// playback manager bounds them by time.
    pub fn should_stop(&self) -> bool {
        match self {
            Scene::Solid(_) => false,
            Scene::Frames(player) => player.should_stop(),
        }
    }
}
