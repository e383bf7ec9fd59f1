//! Frame decoder trait for compressed-stream playback.

use thiserror::Error;

/// Largest interleaved sample count one decoded frame may carry
/// (1152 samples per channel, stereo).
pub const MAX_SAMPLES_PER_FRAME: usize = 1152 * 2;

/// Format metadata of the last decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub channels: u32,
    pub sample_rate: u32,
    pub bits_per_sample: u32,
    pub layer: u32,
    pub bitrate_kbps: u32,
}

/// Result of one successful decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedUnit {
    /// Input bytes consumed, including any junk skipped before the frame.
    pub consumed: usize,
    /// Samples per channel written to the output buffer. Zero when the
    /// decoder only skipped data.
    pub frames: usize,
    pub info: FrameInfo,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// More input is needed; skip `consumed` bytes and try again.
    #[error("decoder input underflow")]
    Underflow { consumed: usize },

    /// No frame boundary in the remaining input.
    #[error("no frame sync word found")]
    SyncNotFound,

    #[error("corrupt frame: {0}")]
    Corrupt(String),
}

/// A trait for bitstream decoders that turn one compressed frame at the
/// start of `input` into interleaved i16 PCM samples.
pub trait FrameDecoder: Send {
    /// Decode the first frame found in `input` into `pcm`, which holds at
    /// least [`MAX_SAMPLES_PER_FRAME`] samples.
    fn decode_frame(&mut self, input: &[u8], pcm: &mut [i16]) -> Result<DecodedUnit, DecodeError>;
}
