//! Single-period transfers with xrun recovery.
//!
//! Playback: an underrun is reset and the same write retried exactly once.
//! Capture: an overrun is reset and reported as `Recovered(0)`; the lost data
//! is gone, so the caller just keeps reading. Short transfers are reported
//! as-is; retrying the remainder is the caller's decision.

use crate::error::{DeviceError, StreamError};

use super::device::PcmDevice;
use super::format::{PcmFrameBlock, StreamFormat};

/// Result of one transfer call.
#[derive(Debug)]
pub enum TransferOutcome {
    /// Frames moved without incident. May be fewer than offered.
    Ok(usize),
    /// Frames moved after an xrun reset.
    Recovered(usize),
    Fatal(StreamError),
}

impl TransferOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransferOutcome::Fatal(_))
    }
}

/// Write one block to a playback endpoint.
pub fn write<D: PcmDevice + ?Sized>(device: &mut D, block: &PcmFrameBlock<'_>) -> TransferOutcome {
    if block.is_empty() {
        return TransferOutcome::Ok(0);
    }

    match device.write_interleaved(block.as_bytes()) {
        Ok(frames) => {
            if frames < block.frames() {
                log::warn!(
                    "Short write: {} of {} frames ({:.1}%)",
                    frames,
                    block.frames(),
                    frames as f32 / block.frames() as f32 * 100.0
                );
            }
            TransferOutcome::Ok(frames)
        }
        Err(DeviceError::Xrun) => {
            log::warn!(
                "Underrun occurred (frames: {}, ch: {}), recovering...",
                block.frames(),
                block.format().channels()
            );
            if let Err(e) = device.prepare() {
                log::error!("Failed to recover PCM playback: {}", e);
                return TransferOutcome::Fatal(StreamError::XrunUnrecovered(e));
            }
            match device.write_interleaved(block.as_bytes()) {
                Ok(frames) => TransferOutcome::Recovered(frames),
                Err(e) => {
                    log::error!("Write retry after underrun failed: {}", e);
                    TransferOutcome::Fatal(StreamError::XrunUnrecovered(e))
                }
            }
        }
        Err(e) => {
            log::error!(
                "Write error: {} (frames: {}, ch: {})",
                e,
                block.frames(),
                block.format().channels()
            );
            TransferOutcome::Fatal(StreamError::Transfer(e))
        }
    }
}

/// Read up to `frames` frames from a capture endpoint into `buf`.
pub fn read<D: PcmDevice + ?Sized>(
    device: &mut D,
    buf: &mut [u8],
    frames: usize,
    format: &StreamFormat,
) -> TransferOutcome {
    let bytes = format.frames_to_bytes(frames).min(buf.len());
    if bytes < format.frame_bytes() {
        return TransferOutcome::Ok(0);
    }

    match device.read_interleaved(&mut buf[..bytes]) {
        Ok(frames) => TransferOutcome::Ok(frames),
        Err(DeviceError::Xrun) => {
            log::warn!("Overrun occurred, recovering...");
            match device.prepare() {
                Ok(()) => TransferOutcome::Recovered(0),
                Err(e) => {
                    log::error!("Failed to recover PCM capture: {}", e);
                    TransferOutcome::Fatal(StreamError::XrunUnrecovered(e))
                }
            }
        }
        Err(e) => {
            log::error!("Read error: {}", e);
            TransferOutcome::Fatal(StreamError::Transfer(e))
        }
    }
}
