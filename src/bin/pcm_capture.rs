use std::fs::File;
use std::io::BufWriter;

use anyhow::Context;
use pcm_stream::AudioConfig;
use pcm_stream::audio::{self, AudioSystem};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: pcm_capture <output.pcm>");
        std::process::exit(1);
    };

    let config = AudioConfig::load();
    let format = config.raw_format()?;
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path))?;
    match config.capture_duration_secs {
        0 => log::info!("Recording {} to {} until Ctrl+C", format, path),
        secs => log::info!("Recording {} to {} for {}s (Ctrl+C to stop early)", format, path, secs),
    }

    let system = AudioSystem::spawn("audio-record", move |running| {
        audio::capture_stream(&config, BufWriter::new(file), running)
    })?;
    let stats = system.run_until_signal().await?;

    println!("Recording finished: {}", stats);
    Ok(())
}
