use std::f32::consts::TAU;

use crate::matrix::{PixelSink, Rgb};

/// The `solid` effect: one colour across the whole matrix.
#[derive(Debug, Clone)]
pub struct SolidScene {
    color: Rgb,
}

impl SolidScene {
    pub fn new(color: Rgb) -> Self {
        Self { color }
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn render_frame(&self, sink: &mut dyn PixelSink) {
        sink.fill(self.color);
    }
}

const BREATH_PERIOD_MS: u64 = 6000;
const BREATH_MIN: u8 = 16;
const BREATH_MAX: u8 = 64;

/// Built-in pattern shown while no playlist is loaded: a slow purple breath.
#[derive(Debug, Clone, Default)]
pub struct TestPattern {
    elapsed_ms: u64,
}

impl TestPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, dt_ms: u32) {
        self.elapsed_ms = (self.elapsed_ms + u64::from(dt_ms)) % BREATH_PERIOD_MS;
    }

    /// Current brightness level, within `16..=64`.
    pub fn level(&self) -> u8 {
        let phase = self.elapsed_ms as f32 / BREATH_PERIOD_MS as f32;
        let mid = f32::from(BREATH_MIN + BREATH_MAX) / 2.0;
        let amp = f32::from(BREATH_MAX - BREATH_MIN) / 2.0;
        (mid + amp * (phase * TAU).sin())
            .round()
            .clamp(f32::from(BREATH_MIN), f32::from(BREATH_MAX)) as u8
    }

    pub fn render_frame(&self, sink: &mut dyn PixelSink) {
        let level = self.level();
        sink.fill(Rgb::new(level, 0, level));
    }
}
