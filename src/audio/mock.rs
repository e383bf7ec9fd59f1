//! Scripted in-memory PCM endpoint and frame decoder for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::DeviceError;

use super::device::{HwParamError, HwParamStage, HwReadback, HwRequest, PcmDevice};
use super::format::{Direction, SampleFormat};
use super::stream_decoder::{DecodeError, DecodedUnit, FrameDecoder, FrameInfo};

/// What the next transfer call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Move every frame offered.
    Accept,
    /// Move at most this many frames.
    Short(usize),
    Xrun,
    Fail(i32),
}

/// Everything the mock saw, shared with the test after the driver owns the mock.
#[derive(Debug, Default)]
pub struct MockLog {
    pub written: Vec<u8>,
    pub write_calls: usize,
    pub read_calls: usize,
    pub prepares: usize,
    pub drains: usize,
    pub closes: usize,
    pub committed: Option<HwRequest>,
}

pub struct MockPcm {
    direction: Direction,
    log: Arc<Mutex<MockLog>>,
    script: VecDeque<Step>,
    formats: Vec<SampleFormat>,
    max_channels: u32,
    forced_rate: Option<u32>,
    forced_period: Option<usize>,
    forced_buffer: Option<usize>,
    fail_stage: Option<HwParamStage>,
    prepare_fails: bool,
    frame_bytes: usize,
    next_byte: u8,
}

impl MockPcm {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            log: Arc::new(Mutex::new(MockLog::default())),
            script: VecDeque::new(),
            formats: vec![SampleFormat::S16Le, SampleFormat::S24Le3, SampleFormat::S32Le],
            max_channels: 2,
            forced_rate: None,
            forced_period: None,
            forced_buffer: None,
            fail_stage: None,
            prepare_fails: false,
            frame_bytes: 0,
            next_byte: 0,
        }
    }

    pub fn playback() -> Self {
        Self::new(Direction::Playback)
    }

    pub fn capture() -> Self {
        Self::new(Direction::Capture)
    }

    pub fn with_script(mut self, steps: &[Step]) -> Self {
        self.script.extend(steps.iter().copied());
        self
    }

    pub fn with_formats(mut self, formats: &[SampleFormat]) -> Self {
        self.formats = formats.to_vec();
        self
    }

    pub fn with_max_channels(mut self, channels: u32) -> Self {
        self.max_channels = channels;
        self
    }

    pub fn with_rate(mut self, rate: u32) -> Self {
        self.forced_rate = Some(rate);
        self
    }

    pub fn with_period(mut self, frames: usize) -> Self {
        self.forced_period = Some(frames);
        self
    }

    pub fn with_buffer(mut self, frames: usize) -> Self {
        self.forced_buffer = Some(frames);
        self
    }

    pub fn failing_at(mut self, stage: HwParamStage) -> Self {
        self.fail_stage = Some(stage);
        self
    }

    pub fn with_failing_prepare(mut self) -> Self {
        self.prepare_fails = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<MockLog>> {
        self.log.clone()
    }

    fn next_step(&mut self) -> Step {
        self.script.pop_front().unwrap_or(Step::Accept)
    }

    fn check(&self, stage: HwParamStage) -> Result<(), HwParamError> {
        if self.fail_stage == Some(stage) {
            return Err(HwParamError::new(
                stage,
                DeviceError::failed(libc::EINVAL, "Invalid argument"),
            ));
        }
        Ok(())
    }
}

impl PcmDevice for MockPcm {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn apply_hw_params(&mut self, request: &HwRequest) -> Result<HwReadback, HwParamError> {
        self.check(HwParamStage::Init)?;
        self.check(HwParamStage::Access)?;
        self.check(HwParamStage::Format)?;
        if !self.formats.contains(&request.format) {
            return Err(HwParamError::new(
                HwParamStage::Format,
                DeviceError::failed(libc::EINVAL, "Invalid argument"),
            ));
        }
        self.check(HwParamStage::Channels)?;
        if request.channels > self.max_channels {
            return Err(HwParamError::new(
                HwParamStage::Channels,
                DeviceError::failed(libc::EINVAL, "Invalid argument"),
            ));
        }
        self.check(HwParamStage::Rate)?;
        self.check(HwParamStage::PeriodSize)?;
        self.check(HwParamStage::BufferSize)?;
        self.check(HwParamStage::Commit)?;

        let period_frames = self.forced_period.unwrap_or(request.period_frames);
        let buffer_frames = self
            .forced_buffer
            .unwrap_or(period_frames * request.buffer_multiple);
        self.frame_bytes = request.channels as usize * request.format.bytes();
        self.log.lock().unwrap().committed = Some(request.clone());

        Ok(HwReadback {
            format: request.format,
            channels: request.channels,
            rate: self.forced_rate.unwrap_or(request.rate),
            period_frames,
            buffer_frames,
        })
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        self.log.lock().unwrap().prepares += 1;
        if self.prepare_fails {
            return Err(DeviceError::failed(libc::EBADFD, "File descriptor in bad state"));
        }
        Ok(())
    }

    fn write_interleaved(&mut self, data: &[u8]) -> Result<usize, DeviceError> {
        let step = self.next_step();
        let mut log = self.log.lock().unwrap();
        log.write_calls += 1;
        let offered = data.len() / self.frame_bytes;
        let frames = match step {
            Step::Accept => offered,
            Step::Short(n) => n.min(offered),
            Step::Xrun => return Err(DeviceError::Xrun),
            Step::Fail(errno) => return Err(DeviceError::failed(errno, "Input/output error")),
        };
        log.written
            .extend_from_slice(&data[..frames * self.frame_bytes]);
        Ok(frames)
    }

    fn read_interleaved(&mut self, data: &mut [u8]) -> Result<usize, DeviceError> {
        let step = self.next_step();
        self.log.lock().unwrap().read_calls += 1;
        let offered = data.len() / self.frame_bytes;
        let frames = match step {
            Step::Accept => offered,
            Step::Short(n) => n.min(offered),
            Step::Xrun => return Err(DeviceError::Xrun),
            Step::Fail(errno) => return Err(DeviceError::failed(errno, "Input/output error")),
        };
        for byte in &mut data[..frames * self.frame_bytes] {
            *byte = self.next_byte;
            self.next_byte = self.next_byte.wrapping_add(1);
        }
        Ok(frames)
    }

    fn drain(&mut self) -> Result<(), DeviceError> {
        self.log.lock().unwrap().drains += 1;
        Ok(())
    }
}

impl Drop for MockPcm {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.closes += 1;
        }
    }
}

/// One scripted decoder result.
#[derive(Debug, Clone)]
pub enum MockFrame {
    /// A frame of `frames` per-channel samples consuming `bytes` input bytes.
    Audio {
        bytes: usize,
        frames: usize,
        channels: u32,
        sample_rate: u32,
    },
    /// Stereo 44.1 kHz frame whose header claims a different bit depth.
    Wide {
        bytes: usize,
        frames: usize,
        bits_per_sample: u32,
    },
    /// Skipped data: consumes bytes, produces nothing.
    Empty { bytes: usize },
    Underflow { bytes: usize },
    NoSync,
    Corrupt,
}

impl MockFrame {
    pub fn stereo(bytes: usize, frames: usize, sample_rate: u32) -> Self {
        MockFrame::Audio {
            bytes,
            frames,
            channels: 2,
            sample_rate,
        }
    }
}

/// Decoder that replays a script, then reports no sync.
pub struct MockDecoder {
    script: VecDeque<MockFrame>,
    sample: i16,
}

impl MockDecoder {
    pub fn new(script: Vec<MockFrame>) -> Self {
        Self {
            script: script.into(),
            sample: 0,
        }
    }
}

impl FrameDecoder for MockDecoder {
    fn decode_frame(&mut self, input: &[u8], pcm: &mut [i16]) -> Result<DecodedUnit, DecodeError> {
        match self.script.pop_front().unwrap_or(MockFrame::NoSync) {
            MockFrame::Audio {
                bytes,
                frames,
                channels,
                sample_rate,
            } => {
                let samples = frames * channels as usize;
                for slot in pcm.iter_mut().take(samples) {
                    *slot = self.sample;
                    self.sample = self.sample.wrapping_add(1);
                }
                Ok(DecodedUnit {
                    consumed: bytes.min(input.len()),
                    frames,
                    info: FrameInfo {
                        channels,
                        sample_rate,
                        bits_per_sample: 16,
                        layer: 3,
                        bitrate_kbps: 128,
                    },
                })
            }
            MockFrame::Wide {
                bytes,
                frames,
                bits_per_sample,
            } => Ok(DecodedUnit {
                consumed: bytes.min(input.len()),
                frames,
                info: FrameInfo {
                    channels: 2,
                    sample_rate: 44100,
                    bits_per_sample,
                    layer: 3,
                    bitrate_kbps: 320,
                },
            }),
            MockFrame::Empty { bytes } => Ok(DecodedUnit {
                consumed: bytes.min(input.len()),
                frames: 0,
                info: FrameInfo {
                    channels: 0,
                    sample_rate: 0,
                    bits_per_sample: 16,
                    layer: 0,
                    bitrate_kbps: 0,
                },
            }),
            MockFrame::Underflow { bytes } => Err(DecodeError::Underflow {
                consumed: bytes.min(input.len()),
            }),
            MockFrame::NoSync => Err(DecodeError::SyncNotFound),
            MockFrame::Corrupt => Err(DecodeError::Corrupt("bad header".into())),
        }
    }
}
