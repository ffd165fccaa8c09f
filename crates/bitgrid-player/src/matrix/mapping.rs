use crate::playlist::{DisplayConfig, MappingConfig, TileConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Origin {
    fn parse(s: &str) -> Self {
        match s {
            "top_left" => Origin::TopLeft,
            "top_right" => Origin::TopRight,
            "bottom_left" => Origin::BottomLeft,
            "bottom_right" => Origin::BottomRight,
            other => {
                log::warn!("Unknown mapping origin '{other}', using top_left");
                Origin::TopLeft
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    RowMajor,
    ColumnMajor,
}

impl Order {
    fn parse(s: &str) -> Self {
        match s {
            "row_major" => Order::RowMajor,
            "column_major" => Order::ColumnMajor,
            other => {
                log::warn!("Unknown mapping order '{other}', using row_major");
                Order::RowMajor
            }
        }
    }

    /// Index of cell (col, row) in a `cols × rows` grid.
    fn index(self, serpentine: bool, col: usize, row: usize, cols: usize, rows: usize) -> usize {
        match self {
            Order::RowMajor => {
                let col = if serpentine && row % 2 == 1 { cols - 1 - col } else { col };
                row * cols + col
            }
            Order::ColumnMajor => {
                let row = if serpentine && col % 2 == 1 { rows - 1 - row } else { row };
                col * rows + row
            }
        }
    }
}

/// Precomputed logical (x, y) → physical LED index table.
#[derive(Debug, Clone)]
pub struct PixelMap {
    width: usize,
    height: usize,
    lut: Vec<usize>,
}

impl PixelMap {
    /// Default wiring for a display of this size: 8×8 tiles when they divide
    /// it evenly, otherwise one tile spanning the display.
    pub fn for_size(width: u16, height: u16) -> Self {
        let tiles = if width % 8 == 0 && height % 8 == 0 && width <= 8 * 255 && height <= 8 * 255
        {
            TileConfig {
                x: (width / 8) as u8,
                y: (height / 8) as u8,
                w: 8,
                h: 8,
            }
        } else {
            TileConfig {
                x: 1,
                y: 1,
                w: width.min(255) as u8,
                h: height.min(255) as u8,
            }
        };
        Self::build(width, height, &tiles, &MappingConfig::default())
    }

    /// Wiring described by a playlist's display block, for a driver of the given size.
    pub fn from_display(width: u16, height: u16, display: &DisplayConfig) -> Self {
        Self::build(width, height, &display.tiles, &display.mapping)
    }

    fn build(width: u16, height: u16, tiles: &TileConfig, mapping: &MappingConfig) -> Self {
        let width = usize::from(width);
        let height = usize::from(height);

        let (tiles_x, tiles_y, tile_w, tile_h) = {
            let (tx, ty, tw, th) = (
                usize::from(tiles.x),
                usize::from(tiles.y),
                usize::from(tiles.w),
                usize::from(tiles.h),
            );
            if tx * tw == width && ty * th == height && tx > 0 && ty > 0 {
                (tx, ty, tw, th)
            } else {
                log::warn!(
                    "Tile geometry {tx}x{ty} of {tw}x{th} does not cover {width}x{height}; \
                     treating display as a single tile"
                );
                (1, 1, width, height)
            }
        };

        let origin = Origin::parse(&mapping.origin);
        let tile_order = Order::parse(&mapping.tile_order);
        let pixel_order = Order::parse(&mapping.pixel_order);
        let rotation = match mapping.tile_rotation {
            0 | 180 => mapping.tile_rotation,
            90 | 270 if tile_w == tile_h => mapping.tile_rotation,
            90 | 270 => {
                log::warn!("tile_rotation {} needs square tiles, ignoring", mapping.tile_rotation);
                0
            }
            other => {
                log::warn!("Unsupported tile_rotation {other}, ignoring");
                0
            }
        };

        let mut lut = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let (x, y) = match origin {
                    Origin::TopLeft => (x, y),
                    Origin::TopRight => (width - 1 - x, y),
                    Origin::BottomLeft => (x, height - 1 - y),
                    Origin::BottomRight => (width - 1 - x, height - 1 - y),
                };
                let (tx, ty) = (x / tile_w, y / tile_h);
                let (lx, ly) = (x % tile_w, y % tile_h);
                let (lx, ly) = match rotation {
                    90 => (tile_h - 1 - ly, lx),
                    180 => (tile_w - 1 - lx, tile_h - 1 - ly),
                    270 => (ly, tile_w - 1 - lx),
                    _ => (lx, ly),
                };
                let tile_index =
                    tile_order.index(mapping.tile_serpentine, tx, ty, tiles_x, tiles_y);
                let local_index =
                    pixel_order.index(mapping.pixel_serpentine, lx, ly, tile_w, tile_h);
                lut.push(tile_index * tile_w * tile_h + local_index);
            }
        }

        Self { width, height, lut }
    }

    /// Physical index of logical pixel (x, y); `None` outside the display.
    pub fn index(&self, x: u16, y: u16) -> Option<usize> {
        let (x, y) = (usize::from(x), usize::from(y));
        if x >= self.width || y >= self.height {
            return None;
        }
        self.lut.get(y * self.width + x).copied()
    }

    pub fn led_count(&self) -> usize {
        self.lut.len()
    }
}
