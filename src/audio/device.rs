//! The hardware PCM endpoint seam.
//!
//! [`PcmDevice`] is what the engine needs from a sound card: parameter
//! negotiation, interleaved transfers, prepare and drain. Closing is dropping.

use crate::error::DeviceError;

use super::format::{Direction, SampleFormat};

/// Sample layout in the hardware buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    RwInterleaved,
}

/// Hardware parameters proposed to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwRequest {
    pub access: AccessMode,
    pub format: SampleFormat,
    pub channels: u32,
    pub rate: u32,
    pub period_frames: usize,
    /// Buffer is requested as this many times the period the device chose.
    pub buffer_multiple: usize,
}

/// Parameters read back from the device after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwReadback {
    pub format: SampleFormat,
    pub channels: u32,
    pub rate: u32,
    pub period_frames: usize,
    pub buffer_frames: usize,
}

/// The negotiation step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwParamStage {
    Init,
    Access,
    Format,
    Channels,
    Rate,
    PeriodSize,
    BufferSize,
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwParamError {
    pub stage: HwParamStage,
    pub source: DeviceError,
}

impl HwParamError {
    pub fn new(stage: HwParamStage, source: DeviceError) -> Self {
        Self { stage, source }
    }
}

/// An opened PCM endpoint, exclusively owned by one stream.
pub trait PcmDevice {
    fn direction(&self) -> Direction;

    /// Propose `request`, commit it and return what the hardware actually set.
    fn apply_hw_params(&mut self, request: &HwRequest) -> Result<HwReadback, HwParamError>;

    /// Put the stream in the prepared state (also the xrun reset).
    fn prepare(&mut self) -> Result<(), DeviceError>;

    /// Write whole interleaved frames; returns frames accepted.
    fn write_interleaved(&mut self, data: &[u8]) -> Result<usize, DeviceError>;

    /// Read up to `data.len()` bytes of whole frames; returns frames read.
    fn read_interleaved(&mut self, data: &mut [u8]) -> Result<usize, DeviceError>;

    /// Block until all pending frames have been played or captured.
    fn drain(&mut self) -> Result<(), DeviceError>;
}
