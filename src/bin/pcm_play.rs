use std::fs::File;
use std::io::BufReader;

use anyhow::Context;
use pcm_stream::AudioConfig;
use pcm_stream::audio::{self, AudioSystem};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: pcm_play <pcm_file>");
        std::process::exit(1);
    };

    let config = AudioConfig::load();
    let format = config.raw_format()?;
    let file = File::open(&path).with_context(|| format!("Failed to open {}", path))?;
    log::info!(
        "{} v{}: playing {} as {} on \"{}\"",
        config.app_name,
        config.app_version,
        path,
        format,
        config.playback_device
    );

    let system = AudioSystem::spawn("audio-play", move |running| {
        audio::play_raw_stream(&config, BufReader::new(file), running)
    })?;
    let stats = system.run_until_signal().await?;

    println!("Playback finished: {}", stats);
    Ok(())
}
