use std::io::{self, Read, Seek, SeekFrom};

use crate::matrix::{PixelSink, Rgb};
use crate::playlist::{DEFAULT_FPS, StopCondition};
use crate::storage::{Storage, StorageFile};

use super::container::{Bgr1Header, ContainerError, open_container};

/// Shown in place of decoded pixels when the animation can't be read.
pub const FALLBACK_COLOR: Rgb = Rgb::RED;

#[derive(Debug, thiserror::Error)]
pub enum FrameReadError {
    #[error("seek to frame {frame} failed: {source}")]
    Seek { frame: u16, source: io::Error },
    #[error("short read on frame {frame}: got {got}, expected {expected}")]
    Short {
        frame: u16,
        got: usize,
        expected: usize,
    },
    #[error("read of frame {frame} failed: {source}")]
    Io { frame: u16, source: io::Error },
}

struct Source {
    file: Box<dyn StorageFile>,
    header: Bgr1Header,
    buffer: Vec<u8>,
}

impl Source {
    fn read_frame(&mut self, frame: u16) -> Result<(), FrameReadError> {
        let offset = self.header.frame_offset(frame);
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|source| FrameReadError::Seek { frame, source })?;

        let expected = self.buffer.len();
        let mut got = 0;
        while got < expected {
            match self.file.read(&mut self.buffer[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => return Err(FrameReadError::Io { frame, source }),
            }
        }
        if got != expected {
            return Err(FrameReadError::Short {
                frame,
                got,
                expected,
            });
        }
        Ok(())
    }
}

/// Streams a BGR1 animation one frame at a time.
///
/// The container is validated once, when the player is opened. A player that
/// failed validation stays invalid: it renders [`FALLBACK_COLOR`] and asks to
/// stop on every poll.
pub struct FramesPlayer {
    path: String,
    frame_duration_ms: u32,
    stop: StopCondition,
    source: Option<Source>,
    current_frame: u16,
    frame_accum_ms: u32,
    elapsed_ms: u64,
    play_count: u32,
}

impl FramesPlayer {
    pub fn open(
        storage: &impl Storage,
        path: &str,
        fps: u16,
        stop: StopCondition,
        width: u16,
        height: u16,
    ) -> Self {
        let fps = if fps == 0 { DEFAULT_FPS } else { fps };
        let source = match Self::validate(storage, path, width, height) {
            Ok(source) => {
                log::info!(
                    target: "FRAM",
                    "Loaded {path}: {}x{}, {} frames @ {fps} fps",
                    source.header.width,
                    source.header.height,
                    source.header.frame_count
                );
                Some(source)
            }
            Err(e) => {
                log::error!(target: "FRAM", "Invalid animation {path}: {e}");
                None
            }
        };
        Self {
            path: path.to_string(),
            frame_duration_ms: (1000 / u32::from(fps)).max(1),
            stop,
            source,
            current_frame: 0,
            frame_accum_ms: 0,
            elapsed_ms: 0,
            play_count: 0,
        }
    }

    fn validate(
        storage: &impl Storage,
        path: &str,
        width: u16,
        height: u16,
    ) -> Result<Source, ContainerError> {
        let mut file = storage.open(path)?;
        let header = open_container(file.as_mut(), width, height)?;
        Ok(Source {
            file,
            header,
            buffer: vec![0; header.frame_size()],
        })
    }

    pub fn begin(&mut self) {
        self.current_frame = 0;
        self.frame_accum_ms = 0;
        self.elapsed_ms = 0;
        self.play_count = 0;
    }

    pub fn tick(&mut self, dt_ms: u32) {
        let Some(source) = &self.source else {
            return;
        };
        let frame_count = source.header.frame_count;
        self.elapsed_ms += u64::from(dt_ms);
        self.frame_accum_ms = self.frame_accum_ms.saturating_add(dt_ms);
        while self.frame_accum_ms >= self.frame_duration_ms {
            self.frame_accum_ms -= self.frame_duration_ms;
            self.current_frame += 1;
            if self.current_frame >= frame_count {
                self.current_frame = 0;
                self.play_count += 1;
            }
        }
    }

    pub fn render_frame(&mut self, sink: &mut dyn PixelSink) {
        let Some(source) = &mut self.source else {
            sink.fill(FALLBACK_COLOR);
            return;
        };
        if let Err(e) = source.read_frame(self.current_frame) {
            log::warn!(target: "FRAM", "{}: {e}", self.path);
            sink.fill(FALLBACK_COLOR);
            return;
        }
        let width = u16::from(source.header.width);
        let pixels: &[Rgb] = bytemuck::cast_slice(&source.buffer);
        for (i, px) in pixels.iter().enumerate() {
            let i = i as u32;
            let (x, y) = (i % u32::from(width), i / u32::from(width));
            sink.set_pixel(x as u16, y as u16, *px);
        }
    }

    pub fn should_stop(&self) -> bool {
        if self.source.is_none() {
            return true;
        }
        if let Some(limit) = self.stop.stop_after_ms()
            && self.elapsed_ms >= limit
        {
            return true;
        }
        if let Some(plays) = self.stop.stop_after_plays()
            && self.play_count >= plays
        {
            return true;
        }
        self.stop.is_unset() && self.play_count >= 1
    }
}

#[cfg(test)]
impl FramesPlayer {
    pub fn is_valid(&self) -> bool {
        self.source.is_some()
    }

    pub fn current_frame(&self) -> u16 {
        self.current_frame
    }

    pub fn play_count(&self) -> u32 {
        self.play_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::LedMatrix;
    use crate::scene::container::encode;
    use crate::storage::DirStorage;

    /// Frame `n` is filled with the colour (n, n, n).
    fn write_anim(dir: &std::path::Path, name: &str, w: u8, h: u8, frames: u8) {
        let frame_size = usize::from(w) * usize::from(h) * 3;
        let mut data = Vec::new();
        for n in 0..frames {
            data.extend(std::iter::repeat_n(n, frame_size));
        }
        let mut out = Vec::new();
        encode(&mut out, w, h, &data).unwrap();
        std::fs::write(dir.join(name), out).unwrap();
    }

    fn open(storage: &DirStorage, name: &str, fps: u16, stop: StopCondition) -> FramesPlayer {
        let mut player = FramesPlayer::open(storage, name, fps, stop, 4, 4);
        player.begin();
        player
    }

    #[test]
    fn frame_advance_is_independent_of_chunking() {
        let dir = tempfile::tempdir().unwrap();
        write_anim(dir.path(), "a.bin", 4, 4, 3);
        let storage = DirStorage::new(dir.path());
        let stop = StopCondition::new(-1, 5);

        let mut once = open(&storage, "a.bin", 10, stop);
        once.tick(250);

        let mut chunked = open(&storage, "a.bin", 10, stop);
        for _ in 0..5 {
            chunked.tick(50);
        }

        assert_eq!(once.current_frame(), 2);
        assert_eq!(chunked.current_frame(), 2);
        assert_eq!(once.play_count(), chunked.play_count());
    }

    #[test]
    fn frame_index_steps_every_100ms_at_10fps() {
        let dir = tempfile::tempdir().unwrap();
        write_anim(dir.path(), "a.bin", 4, 4, 3);
        let storage = DirStorage::new(dir.path());
        let mut player = open(&storage, "a.bin", 10, StopCondition::new(-1, 5));

        player.tick(99);
        assert_eq!(player.current_frame(), 0);
        player.tick(1);
        assert_eq!(player.current_frame(), 1);
        player.tick(200);
        assert_eq!(player.current_frame(), 0);
        assert_eq!(player.play_count(), 1);
    }

    #[test]
    fn default_stop_fires_after_one_play() {
        let dir = tempfile::tempdir().unwrap();
        write_anim(dir.path(), "a.bin", 4, 4, 3);
        let storage = DirStorage::new(dir.path());
        let mut player = open(&storage, "a.bin", 10, StopCondition::default());

        player.tick(299);
        assert!(!player.should_stop());
        player.tick(1);
        assert_eq!(player.play_count(), 1);
        assert!(player.should_stop());
    }

    #[test]
    fn zero_bounds_count_as_set_and_loop() {
        let dir = tempfile::tempdir().unwrap();
        write_anim(dir.path(), "a.bin", 4, 4, 2);
        let storage = DirStorage::new(dir.path());

        for stop in [StopCondition::new(0, -1), StopCondition::new(-1, 0)] {
            let mut player = open(&storage, "a.bin", 10, stop);
            player.tick(200);
            assert_eq!(player.play_count(), 1);
            assert!(!player.should_stop());
            player.tick(2000);
            assert!(!player.should_stop());
        }
    }

    #[test]
    fn seconds_and_plays_bounds() {
        let dir = tempfile::tempdir().unwrap();
        write_anim(dir.path(), "a.bin", 4, 4, 2);
        let storage = DirStorage::new(dir.path());

        let mut timed = open(&storage, "a.bin", 10, StopCondition::new(1, -1));
        timed.tick(999);
        assert!(!timed.should_stop());
        timed.tick(1);
        assert!(timed.should_stop());

        let mut counted = open(&storage, "a.bin", 10, StopCondition::new(-1, 3));
        counted.tick(500);
        assert!(!counted.should_stop());
        counted.tick(100);
        assert!(counted.should_stop());

        // Whichever bound fires first wins.
        let mut both = open(&storage, "a.bin", 10, StopCondition::new(60, 1));
        both.tick(200);
        assert!(both.should_stop());
    }

    #[test]
    fn zero_fps_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        write_anim(dir.path(), "a.bin", 4, 4, 3);
        let storage = DirStorage::new(dir.path());
        let mut player = open(&storage, "a.bin", 0, StopCondition::default());
        player.tick(1000 / u32::from(DEFAULT_FPS) - 1);
        assert_eq!(player.current_frame(), 0);
        player.tick(1);
        assert_eq!(player.current_frame(), 1);
    }

    #[test]
    fn renders_current_frame() {
        let dir = tempfile::tempdir().unwrap();
        write_anim(dir.path(), "a.bin", 4, 4, 3);
        let storage = DirStorage::new(dir.path());
        let mut player = open(&storage, "a.bin", 10, StopCondition::default());
        let mut matrix = LedMatrix::new(4, 4, 255);

        player.tick(200);
        player.render_frame(&mut matrix);
        assert!(matrix.pixels().iter().all(|p| *p == Rgb::new(2, 2, 2)));
    }

    #[test]
    fn dimension_mismatch_is_permanently_invalid() {
        let dir = tempfile::tempdir().unwrap();
        write_anim(dir.path(), "big.bin", 8, 8, 2);
        let storage = DirStorage::new(dir.path());
        let mut player = open(&storage, "big.bin", 10, StopCondition::new(-1, 100));
        let mut matrix = LedMatrix::new(4, 4, 255);

        assert!(!player.is_valid());
        assert!(player.should_stop());
        for _ in 0..3 {
            player.tick(100);
            player.render_frame(&mut matrix);
            assert!(matrix.pixels().iter().all(|p| *p == FALLBACK_COLOR));
        }
        assert_eq!(player.current_frame(), 0);
    }

    #[test]
    fn missing_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::new(dir.path());
        let player = open(&storage, "anims/none.bin", 10, StopCondition::default());
        assert!(!player.is_valid());
        assert!(player.should_stop());
    }

    #[test]
    fn read_failure_after_validation_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        write_anim(dir.path(), "a.bin", 4, 4, 3);
        let storage = DirStorage::new(dir.path());
        let mut player = open(&storage, "a.bin", 10, StopCondition::new(-1, 5));
        let mut matrix = LedMatrix::new(4, 4, 255);

        let frame_size = 4 * 4 * 3;
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(dir.path().join("a.bin"))
            .unwrap();
        // Keep frames 0 and 1, drop frame 2.
        file.set_len(16 + 2 * frame_size).unwrap();

        player.tick(200);
        player.render_frame(&mut matrix);
        assert!(matrix.pixels().iter().all(|p| *p == FALLBACK_COLOR));
        assert!(player.is_valid());
        assert!(!player.should_stop());

        player.tick(100);
        assert_eq!(player.current_frame(), 0);
        player.render_frame(&mut matrix);
        assert!(matrix.pixels().iter().all(|p| *p == Rgb::new(0, 0, 0)));
    }
}
