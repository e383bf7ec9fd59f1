use anyhow::Context;
use pcm_stream::AudioConfig;
use pcm_stream::audio::{self, AudioSystem};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: mp3_play <mp3_file>");
        std::process::exit(1);
    };

    let config = AudioConfig::load();
    let data = std::fs::read(&path).with_context(|| format!("Failed to read {}", path))?;
    log::info!("Playing {} on \"{}\"", path, config.playback_device);

    let system = AudioSystem::spawn("audio-mp3", move |running| {
        audio::play_mp3_stream(&config, data, running)
    })?;
    let stats = system.run_until_signal().await?;

    println!("Playback finished: {}", stats);
    Ok(())
}
