//! audio - PCM capture and playback over ALSA
//!
//! Hardware negotiation, period transfers with xrun recovery, MP3 frame
//! decoding via minimp3, and the stream driver that ties them together.

mod alsa_device;
mod audio_system;
pub mod device;
pub mod driver;
pub mod format;
pub mod frame_source;
mod mp3_decoder;
pub mod negotiator;
mod play;
mod record;
pub mod stream_decoder;
pub mod transfer;

#[cfg(test)]
pub(crate) mod mock;

pub use alsa_device::AlsaPcm;
pub use audio_system::{AudioSystem, StreamResult, capture_stream, play_mp3_stream, play_raw_stream};
pub use device::PcmDevice;
pub use driver::{StreamDriver, StreamSettings, StreamState, StreamStats};
pub use format::{Direction, HardwareConfig, PcmFrameBlock, SampleFormat, StreamFormat};
pub use frame_source::{DecodedFrame, FrameSource};
pub use mp3_decoder::Mp3FrameDecoder;
pub use stream_decoder::FrameDecoder;
pub use transfer::TransferOutcome;
