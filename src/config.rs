use crate::audio::driver::StreamSettings;
use crate::audio::format::StreamFormat;
use crate::error::StreamError;

/// Overrides both device names at run time.
pub const DEVICE_ENV: &str = "PCM_DEVICE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConfig {
    pub app_name: &'static str,
    pub app_version: &'static str,

    // 设备
    pub playback_device: String,
    pub capture_device: String,

    // 原始 PCM 文件格式
    pub raw_sample_rate: u32,
    pub raw_channels: u32,
    pub raw_bits_per_sample: u32,

    pub playback: StreamSettings,
    pub mp3: StreamSettings,
    pub capture: StreamSettings,
    /// 0 = until stopped
    pub capture_duration_secs: u64,
}

impl AudioConfig {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        let max_stalled_writes = env!("PLAYBACK_MAX_STALLED_WRITES")
            .parse()
            .map_err(|_| "Failed to parse PLAYBACK_MAX_STALLED_WRITES")?;

        Ok(Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),

            playback_device: env!("PLAYBACK_DEVICE").to_string(),
            capture_device: env!("CAPTURE_DEVICE").to_string(),

            raw_sample_rate: env!("RAW_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse RAW_SAMPLE_RATE")?,
            raw_channels: env!("RAW_CHANNELS").parse()
                .map_err(|_| "Failed to parse RAW_CHANNELS")?,
            raw_bits_per_sample: env!("RAW_BITS_PER_SAMPLE").parse()
                .map_err(|_| "Failed to parse RAW_BITS_PER_SAMPLE")?,

            playback: StreamSettings {
                period_frames: env!("PLAYBACK_PERIOD_FRAMES").parse()
                    .map_err(|_| "Failed to parse PLAYBACK_PERIOD_FRAMES")?,
                buffer_multiple: env!("PLAYBACK_BUFFER_MULTIPLE").parse()
                    .map_err(|_| "Failed to parse PLAYBACK_BUFFER_MULTIPLE")?,
                max_stalled_writes,
            },
            mp3: StreamSettings {
                period_frames: env!("MP3_PERIOD_FRAMES").parse()
                    .map_err(|_| "Failed to parse MP3_PERIOD_FRAMES")?,
                buffer_multiple: env!("MP3_BUFFER_MULTIPLE").parse()
                    .map_err(|_| "Failed to parse MP3_BUFFER_MULTIPLE")?,
                max_stalled_writes,
            },
            capture: StreamSettings {
                period_frames: env!("CAPTURE_PERIOD_FRAMES").parse()
                    .map_err(|_| "Failed to parse CAPTURE_PERIOD_FRAMES")?,
                buffer_multiple: env!("CAPTURE_BUFFER_MULTIPLE").parse()
                    .map_err(|_| "Failed to parse CAPTURE_BUFFER_MULTIPLE")?,
                max_stalled_writes,
            },
            capture_duration_secs: env!("CAPTURE_DURATION_SECS").parse()
                .map_err(|_| "Failed to parse CAPTURE_DURATION_SECS")?,
        })
    }

    /// Build-time configuration with the `PCM_DEVICE` override applied.
    pub fn load() -> Self {
        let config = Self::new().unwrap_or_else(|e| {
            log::warn!("{}, using built-in defaults", e);
            Self::default()
        });
        config.with_device_override(std::env::var(DEVICE_ENV).ok())
    }

    pub fn with_device_override(mut self, device: Option<String>) -> Self {
        if let Some(device) = device.filter(|d| !d.trim().is_empty()) {
            log::info!("{} overrides PCM device: {}", DEVICE_ENV, device);
            self.playback_device = device.clone();
            self.capture_device = device;
        }
        self
    }

    /// Format of raw `.pcm` files.
    pub fn raw_format(&self) -> Result<StreamFormat, StreamError> {
        StreamFormat::new(self.raw_sample_rate, self.raw_channels, self.raw_bits_per_sample)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            app_name: "pcm_stream",
            app_version: "0.1.0",
            playback_device: "default".to_string(),
            capture_device: "default".to_string(),
            raw_sample_rate: 44100,
            raw_channels: 2,
            raw_bits_per_sample: 16,
            playback: StreamSettings {
                period_frames: 1024,
                buffer_multiple: 4,
                max_stalled_writes: 3,
            },
            mp3: StreamSettings {
                period_frames: 2048,
                buffer_multiple: 6,
                max_stalled_writes: 3,
            },
            capture: StreamSettings {
                period_frames: 1024,
                buffer_multiple: 4,
                max_stalled_writes: 3,
            },
            capture_duration_secs: 10,
        }
    }
}
