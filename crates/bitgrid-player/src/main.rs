mod app;
mod matrix;
mod playback;
mod playlist;
mod scene;
mod settings;
mod storage;
mod watcher;

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use app::App;
use settings::{CliArgs, PlayerConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = CliArgs::parse();
    let mut config = PlayerConfig::load();
    config.apply_args(&args);
    if args.save_config {
        config.save_to(&PlayerConfig::config_path())?;
    }

    log::info!(
        "BitGrid player: {}x{} matrix, storage root {}",
        config.width,
        config.height,
        config.storage_root.display()
    );

    let interval = Duration::from_millis(u64::from(config.frame_interval_ms()));
    let mut app = App::new(config);

    let mut last = Instant::now();
    let mut frames: u64 = 0;
    loop {
        if args.frames.is_some_and(|limit| frames >= limit) {
            break;
        }
        let frame_start = Instant::now();
        let dt_ms = u32::try_from(frame_start.duration_since(last).as_millis()).unwrap_or(u32::MAX);
        last = frame_start;

        app.frame(dt_ms);
        frames += 1;

        if let Some(remaining) = interval.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    if let Some(path) = &args.snapshot {
        app.snapshot(path)?;
    }
    log::info!("Stopped after {frames} frames");
    Ok(())
}
