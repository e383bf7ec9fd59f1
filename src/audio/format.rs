//! Stream format, hardware configuration and frame block types.

use std::fmt;

use crate::error::StreamError;

/// Highest channel count the engine validates.
pub const MAX_CHANNELS: u32 = 2;

/// Stream direction of a PCM endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Capture,
    Playback,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Capture => f.write_str("Capture"),
            Direction::Playback => f.write_str("Playback"),
        }
    }
}

/// Sample encoding on the wire. All variants are signed little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    S16Le,
    /// 24-bit samples packed in 3 bytes.
    S24Le3,
    S32Le,
}

impl SampleFormat {
    pub fn from_bits(bits: u32) -> Result<Self, StreamError> {
        match bits {
            16 => Ok(SampleFormat::S16Le),
            24 => Ok(SampleFormat::S24Le3),
            32 => Ok(SampleFormat::S32Le),
            other => Err(StreamError::InvalidFormat(format!(
                "unsupported bit depth: {}",
                other
            ))),
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            SampleFormat::S16Le => 16,
            SampleFormat::S24Le3 => 24,
            SampleFormat::S32Le => 32,
        }
    }

    pub fn bytes(&self) -> usize {
        self.bits() as usize / 8
    }
}

/// Interleaved PCM format of one stream.
///
/// Built once, before the hardware is committed, and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    sample_rate: u32,
    channels: u32,
    sample_format: SampleFormat,
}

impl StreamFormat {
    pub fn new(sample_rate: u32, channels: u32, bits_per_sample: u32) -> Result<Self, StreamError> {
        if sample_rate == 0 {
            return Err(StreamError::InvalidFormat("sample rate must be > 0".into()));
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(StreamError::InvalidFormat(format!(
                "unsupported channel count: {}",
                channels
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            sample_format: SampleFormat::from_bits(bits_per_sample)?,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    pub fn bits_per_sample(&self) -> u32 {
        self.sample_format.bits()
    }

    /// Bytes in one frame (one sample per channel).
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.sample_format.bytes()
    }

    pub fn frames_to_bytes(&self, frames: usize) -> usize {
        frames * self.frame_bytes()
    }

    pub fn bytes_to_frames(&self, bytes: usize) -> usize {
        bytes / self.frame_bytes()
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{}bit",
            self.sample_rate,
            self.channels,
            self.sample_format.bits()
        )
    }
}

/// Parameters actually committed to the hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareConfig {
    pub direction: Direction,
    /// Committed sample rate, which may differ from the requested one.
    pub sample_rate: u32,
    pub period_frames: usize,
    pub buffer_frames: usize,
}

impl HardwareConfig {
    /// Whole periods held by the hardware buffer.
    pub fn buffer_multiple(&self) -> usize {
        self.buffer_frames / self.period_frames
    }

    /// Time needed to play or fill the whole hardware buffer.
    pub fn buffer_latency_ms(&self) -> f32 {
        self.buffer_frames as f32 * 1000.0 / self.sample_rate as f32
    }

    pub fn period_bytes(&self, format: &StreamFormat) -> usize {
        format.frames_to_bytes(self.period_frames)
    }
}

/// A borrowed block of interleaved frames, valid for one transfer.
#[derive(Debug, Clone, Copy)]
pub struct PcmFrameBlock<'a> {
    data: &'a [u8],
    frames: usize,
    format: StreamFormat,
}

impl<'a> PcmFrameBlock<'a> {
    /// Wraps `data`, ignoring trailing bytes that do not form a whole frame.
    pub fn new(data: &'a [u8], format: StreamFormat) -> Self {
        let frames = format.bytes_to_frames(data.len());
        Self {
            data: &data[..format.frames_to_bytes(frames)],
            frames,
            format,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// The frames from `frame` to the end of the block.
    pub fn tail(&self, frame: usize) -> PcmFrameBlock<'a> {
        let frame = frame.min(self.frames);
        Self {
            data: &self.data[self.format.frames_to_bytes(frame)..],
            frames: self.frames - frame,
            format: self.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_for_each_depth() {
        let f16 = StreamFormat::new(44100, 2, 16).unwrap();
        let f24 = StreamFormat::new(48000, 2, 24).unwrap();
        let f32le = StreamFormat::new(48000, 1, 32).unwrap();
        assert_eq!(f16.frame_bytes(), 4);
        assert_eq!(f24.frame_bytes(), 6);
        assert_eq!(f32le.frame_bytes(), 4);
    }

    #[test]
    fn test_rejects_invalid_formats() {
        assert!(StreamFormat::new(0, 2, 16).is_err());
        assert!(StreamFormat::new(44100, 0, 16).is_err());
        assert!(StreamFormat::new(44100, 3, 16).is_err());
        assert!(StreamFormat::new(44100, 2, 8).is_err());
    }

    #[test]
    fn test_block_drops_partial_frame() {
        let format = StreamFormat::new(44100, 2, 16).unwrap();
        let data = [0u8; 10];
        let block = PcmFrameBlock::new(&data, format);
        assert_eq!(block.frames(), 2);
        assert_eq!(block.as_bytes().len(), 8);
    }

    #[test]
    fn test_block_tail() {
        let format = StreamFormat::new(44100, 1, 16).unwrap();
        let data: Vec<u8> = (0..8).collect();
        let block = PcmFrameBlock::new(&data, format);
        let tail = block.tail(3);
        assert_eq!(tail.frames(), 1);
        assert_eq!(tail.as_bytes(), &[6, 7]);
        assert!(block.tail(10).is_empty());
    }

    #[test]
    fn test_hardware_config_latency() {
        let hw = HardwareConfig {
            direction: Direction::Playback,
            sample_rate: 48000,
            period_frames: 1200,
            buffer_frames: 4800,
        };
        assert_eq!(hw.buffer_multiple(), 4);
        assert!((hw.buffer_latency_ms() - 100.0).abs() < f32::EPSILON);
    }
}
