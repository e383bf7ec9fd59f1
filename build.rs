use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    device: Device,
    raw: Raw,
    playback: Playback,
    mp3: Mp3,
    capture: Capture,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Device {
    playback: String,
    capture: String,
}

#[derive(Deserialize)]
struct Raw {
    sample_rate: u32,
    channels: u32,
    bits_per_sample: u32,
}

#[derive(Deserialize)]
struct Playback {
    period_frames: usize,
    buffer_multiple: usize,
    max_stalled_writes: u32,
}

#[derive(Deserialize)]
struct Mp3 {
    period_frames: usize,
    buffer_multiple: usize,
}

#[derive(Deserialize)]
struct Capture {
    period_frames: usize,
    buffer_multiple: usize,
    duration_secs: u64,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 设备
    println!("cargo:rustc-env=PLAYBACK_DEVICE={}", config.device.playback);
    println!("cargo:rustc-env=CAPTURE_DEVICE={}", config.device.capture);

    // 原始 PCM 格式
    println!("cargo:rustc-env=RAW_SAMPLE_RATE={}", config.raw.sample_rate);
    println!("cargo:rustc-env=RAW_CHANNELS={}", config.raw.channels);
    println!("cargo:rustc-env=RAW_BITS_PER_SAMPLE={}", config.raw.bits_per_sample);

    // 播放
    println!("cargo:rustc-env=PLAYBACK_PERIOD_FRAMES={}", config.playback.period_frames);
    println!("cargo:rustc-env=PLAYBACK_BUFFER_MULTIPLE={}", config.playback.buffer_multiple);
    println!("cargo:rustc-env=PLAYBACK_MAX_STALLED_WRITES={}", config.playback.max_stalled_writes);

    // MP3 播放
    println!("cargo:rustc-env=MP3_PERIOD_FRAMES={}", config.mp3.period_frames);
    println!("cargo:rustc-env=MP3_BUFFER_MULTIPLE={}", config.mp3.buffer_multiple);

    // 采集
    println!("cargo:rustc-env=CAPTURE_PERIOD_FRAMES={}", config.capture.period_frames);
    println!("cargo:rustc-env=CAPTURE_BUFFER_MULTIPLE={}", config.capture.buffer_multiple);
    println!("cargo:rustc-env=CAPTURE_DURATION_SECS={}", config.capture.duration_secs);
}
