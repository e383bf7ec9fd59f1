//! Stream lifecycle: owns one endpoint from start to release.
//!
//! `Uninitialized -> AwaitingFormat -> Streaming -> Draining -> Closed`, with
//! `Failed` reachable from any live state. The playback and capture pumps live
//! in `play.rs` and `record.rs` as further `impl` blocks on [`StreamDriver`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::StreamError;

use super::device::PcmDevice;
use super::format::{Direction, HardwareConfig, PcmFrameBlock, StreamFormat};
use super::negotiator;
use super::transfer::{self, TransferOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Uninitialized,
    AwaitingFormat,
    Streaming,
    Draining,
    Closed,
    Failed,
}

/// Buffer sizing and retry policy for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub period_frames: usize,
    pub buffer_multiple: usize,
    /// Consecutive zero-frame writes tolerated before the rest of a block is dropped.
    pub max_stalled_writes: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            period_frames: 1024,
            buffer_multiple: 4,
            max_stalled_writes: 3,
        }
    }
}

/// Counters for the transient conditions a stream absorbed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub transfers_ok: u64,
    pub recovered: u64,
    pub short_transfers: u64,
    pub stalled_drops: u64,
    pub frames: u64,
    pub drained: bool,
}

impl fmt::Display for StreamStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames in {} transfers, {} xruns recovered, {} short transfers, {} blocks dropped",
            self.frames,
            self.transfers_ok + self.recovered,
            self.recovered,
            self.short_transfers,
            self.stalled_drops
        )
    }
}

pub struct StreamDriver<D: PcmDevice> {
    pub(super) device: Option<D>,
    direction: Direction,
    pub(super) settings: StreamSettings,
    state: StreamState,
    format: Option<StreamFormat>,
    hardware: Option<HardwareConfig>,
    pub(super) stats: StreamStats,
    running: Arc<AtomicBool>,
}

impl<D: PcmDevice> StreamDriver<D> {
    /// Take ownership of an opened endpoint.
    pub fn new(device: D, settings: StreamSettings) -> Self {
        Self {
            direction: device.direction(),
            device: Some(device),
            settings,
            state: StreamState::Uninitialized,
            format: None,
            hardware: None,
            stats: StreamStats::default(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Share a run flag; clearing it stops the stream between transfers.
    pub fn with_run_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn format(&self) -> Option<StreamFormat> {
        self.format
    }

    pub fn hardware(&self) -> Option<&HardwareConfig> {
        self.hardware.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn start(&mut self) -> Result<(), StreamError> {
        if self.state != StreamState::Uninitialized {
            return Err(StreamError::InvalidState("stream already started"));
        }
        log::info!("{} stream starting", self.direction);
        self.state = StreamState::AwaitingFormat;
        Ok(())
    }

    /// Negotiate `format` with the endpoint. Allowed exactly once per stream.
    pub fn commit_format(&mut self, format: StreamFormat) -> Result<HardwareConfig, StreamError> {
        if self.state != StreamState::AwaitingFormat {
            return Err(StreamError::AlreadyConfigured);
        }
        let result = match self.device.as_mut() {
            Some(device) => negotiator::configure(
                device,
                &format,
                self.settings.period_frames,
                self.settings.buffer_multiple,
            ),
            None => Err(StreamError::InvalidState("device already released")),
        };
        let hw = result.map_err(|e| self.fail(e))?;

        log::info!(
            "{} streaming: {} period={} buffer={}",
            self.direction,
            format,
            hw.period_frames,
            hw.buffer_frames
        );
        self.format = Some(format);
        self.hardware = Some(hw.clone());
        self.state = StreamState::Streaming;
        Ok(hw)
    }

    /// Write a whole block, retrying short writes.
    ///
    /// A write that moves no frames is a stall; after `max_stalled_writes`
    /// consecutive stalls the rest of the block is dropped and streaming
    /// continues. Returns the frames written.
    pub fn write_block(&mut self, block: &PcmFrameBlock<'_>) -> Result<usize, StreamError> {
        let limit = match (&self.hardware, self.state) {
            (Some(hw), StreamState::Streaming) => hw.buffer_frames,
            _ => {
                return Err(StreamError::InvalidState(
                    "write before the stream format was committed",
                ));
            }
        };
        if block.frames() > limit {
            return Err(self.fail(StreamError::ResourceExhaustion {
                requested: block.frames(),
                limit,
            }));
        }

        let mut written = 0;
        let mut stalls = 0u32;
        while written < block.frames() {
            let rest = block.tail(written);
            let outcome = match self.device.as_mut() {
                Some(device) => transfer::write(device, &rest),
                None => return Err(StreamError::InvalidState("device already released")),
            };
            let frames = match outcome {
                TransferOutcome::Ok(n) => {
                    self.stats.transfers_ok += 1;
                    n
                }
                TransferOutcome::Recovered(n) => {
                    self.stats.recovered += 1;
                    n
                }
                TransferOutcome::Fatal(e) => return Err(self.fail(e)),
            };
            written += frames;
            self.stats.frames += frames as u64;

            if frames < rest.frames() {
                self.stats.short_transfers += 1;
            }
            if frames == 0 {
                stalls += 1;
                if stalls >= self.settings.max_stalled_writes {
                    log::error!(
                        "Max stalled writes ({}) reached. Dropping {} unwritten frames",
                        stalls,
                        block.frames() - written
                    );
                    self.stats.stalled_drops += 1;
                    break;
                }
            } else {
                stalls = 0;
            }
        }
        Ok(written)
    }

    /// Drain the endpoint and release it. Returns the final counters.
    pub fn finish(&mut self) -> Result<StreamStats, StreamError> {
        match self.state {
            StreamState::Closed => return Ok(self.stats.clone()),
            StreamState::Failed => {
                return Err(StreamError::InvalidState("stream already failed"));
            }
            _ => {}
        }

        self.state = StreamState::Draining;
        if let Some(mut device) = self.device.take() {
            if self.hardware.is_some() {
                if let Err(e) = device.drain() {
                    log::error!("{} drain failed: {}", self.direction, e);
                    self.state = StreamState::Failed;
                    return Err(StreamError::Transfer(e));
                }
                self.stats.drained = true;
            }
        }
        self.state = StreamState::Closed;
        log::info!("{} stream closed: {}", self.direction, self.stats);
        Ok(self.stats.clone())
    }

    /// Release the endpoint. Idempotent; a live stream is drained first.
    pub fn close(&mut self) {
        if self.device.is_none() {
            return;
        }
        match self.state {
            StreamState::Failed => {
                self.device = None;
            }
            _ => {
                if let Err(e) = self.finish() {
                    log::warn!("{} close: {}", self.direction, e);
                }
            }
        }
    }

    /// Enter `Failed`, releasing the endpoint without draining.
    pub(super) fn fail(&mut self, error: StreamError) -> StreamError {
        log::error!("{} stream failed: {}", self.direction, error);
        self.state = StreamState::Failed;
        self.device = None;
        error
    }

    pub(super) fn settle(&mut self, result: Result<(), StreamError>) -> Result<StreamStats, StreamError> {
        match result {
            Ok(()) => self.finish(),
            Err(e) => {
                if self.state != StreamState::Failed {
                    return Err(self.fail(e));
                }
                Err(e)
            }
        }
    }
}

impl<D: PcmDevice> Drop for StreamDriver<D> {
    fn drop(&mut self) {
        self.close();
    }
}
