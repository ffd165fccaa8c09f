pub mod mapping;

use bytemuck::{Pod, Zeroable};

use crate::playlist::DisplayConfig;
use mapping::PixelMap;

/// 8-bit RGB triple, laid out exactly as BGR1 frame bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// From `0xRRGGBB`; bits above 24 are ignored.
    pub const fn from_u32(color: u32) -> Self {
        Self::new((color >> 16) as u8, (color >> 8) as u8, color as u8)
    }

    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Scale every channel by `scale / 256`, rounding so 255 keeps full range.
    pub fn scaled(self, scale: u8) -> Self {
        let s = u16::from(scale) + 1;
        let ch = |c: u8| ((u16::from(c) * s) >> 8) as u8;
        Self::new(ch(self.r), ch(self.g), ch(self.b))
    }
}

/// The pixel-matrix driver the scenes draw into.
pub trait PixelSink {
    fn width(&self) -> u16;
    fn height(&self) -> u16;
    fn clear(&mut self);
    fn fill(&mut self, color: Rgb);
    /// Out-of-range coordinates are ignored.
    fn set_pixel(&mut self, x: u16, y: u16, color: Rgb);
    fn show(&mut self);
    fn set_brightness(&mut self, brightness: u8);
}

/// In-memory LED matrix: a logical framebuffer plus the brightness-scaled
/// buffer in physical chain order that `show()` produces.
pub struct LedMatrix {
    width: u16,
    height: u16,
    pixels: Vec<Rgb>,
    output: Vec<Rgb>,
    map: PixelMap,
    brightness: u8,
    frames_shown: u64,
}

impl LedMatrix {
    pub fn new(width: u16, height: u16, brightness: u8) -> Self {
        let len = usize::from(width) * usize::from(height);
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; len],
            output: vec![Rgb::BLACK; len],
            map: PixelMap::for_size(width, height),
            brightness,
            frames_shown: 0,
        }
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }

    /// Adopt a playlist's wiring and brightness. Geometry stays fixed: a
    /// display block describing a different size only contributes brightness.
    pub fn apply_display(&mut self, display: &DisplayConfig) {
        if u16::from(display.w) == self.width && u16::from(display.h) == self.height {
            self.map = PixelMap::from_display(self.width, self.height, display);
            log::debug!("LED map rebuilt for {} LEDs", self.map.led_count());
        } else {
            log::warn!(
                "Playlist display {}x{} differs from matrix {}x{}; keeping wiring",
                display.w,
                display.h,
                self.width,
                self.height
            );
        }
        if display.brightness > 0 {
            self.set_brightness(display.brightness);
            log::info!("LED brightness set to {}", display.brightness);
        }
    }
}

#[cfg(test)]
impl LedMatrix {
    /// Logical framebuffer, row-major from the top-left corner.
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Last shown frame in LED chain order.
    pub fn output(&self) -> &[Rgb] {
        &self.output
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl PixelSink for LedMatrix {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn clear(&mut self) {
        self.fill(Rgb::BLACK);
    }

    fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = usize::from(y) * usize::from(self.width) + usize::from(x);
        if let Some(px) = self.pixels.get_mut(idx) {
            *px = color;
        }
    }

    fn show(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let logical = usize::from(y) * usize::from(self.width) + usize::from(x);
                if let (Some(physical), Some(px)) = (self.map.index(x, y), self.pixels.get(logical))
                {
                    if let Some(out) = self.output.get_mut(physical) {
                        *out = px.scaled(self.brightness);
                    }
                }
            }
        }
        self.frames_shown += 1;
        log::trace!("show #{}", self.frames_shown);
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }
}
