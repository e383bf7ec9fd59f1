//! ALSA PCM device wrapper implementing [`PcmDevice`].

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction as AlsaDirection, ValueOr};

use crate::error::{DeviceError, StreamError};

use super::device::{AccessMode, HwParamError, HwParamStage, HwReadback, HwRequest, PcmDevice};
use super::format::{Direction, SampleFormat};

/// An open ALSA PCM handle. Dropping it closes the device.
pub struct AlsaPcm {
    pcm: PCM,
    name: String,
    direction: Direction,
}

impl AlsaPcm {
    /// Open a PCM device for capture or playback (blocking mode).
    pub fn open(device: &str, direction: Direction) -> Result<Self, StreamError> {
        let alsa_dir = match direction {
            Direction::Capture => AlsaDirection::Capture,
            Direction::Playback => AlsaDirection::Playback,
        };
        let pcm = PCM::new(device, alsa_dir, false).map_err(|e| StreamError::DeviceUnavailable {
            device: device.to_string(),
            source: device_error(e),
        })?;

        log::info!("ALSA {}: opened device={}", direction, device);

        Ok(Self {
            pcm,
            name: device.to_string(),
            direction,
        })
    }
}

impl PcmDevice for AlsaPcm {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn apply_hw_params(&mut self, request: &HwRequest) -> Result<HwReadback, HwParamError> {
        // Configure hardware parameters
        {
            let hwp = HwParams::any(&self.pcm).map_err(stage(HwParamStage::Init))?;
            let access = match request.access {
                AccessMode::RwInterleaved => Access::RWInterleaved,
            };
            hwp.set_access(access).map_err(stage(HwParamStage::Access))?;
            hwp.set_format(alsa_format(request.format))
                .map_err(stage(HwParamStage::Format))?;
            hwp.set_channels(request.channels)
                .map_err(stage(HwParamStage::Channels))?;
            hwp.set_rate_near(request.rate, ValueOr::Nearest)
                .map_err(stage(HwParamStage::Rate))?;
            let period = hwp
                .set_period_size_near(request.period_frames as alsa::pcm::Frames, ValueOr::Nearest)
                .map_err(stage(HwParamStage::PeriodSize))?;
            hwp.set_buffer_size_near(period * request.buffer_multiple as alsa::pcm::Frames)
                .map_err(stage(HwParamStage::BufferSize))?;
            self.pcm.hw_params(&hwp).map_err(stage(HwParamStage::Commit))?;
        }

        // Read back actual negotiated parameters
        let hwp = self
            .pcm
            .hw_params_current()
            .map_err(stage(HwParamStage::Commit))?;
        let format = match hwp.get_format().map_err(stage(HwParamStage::Format))? {
            Format::S16LE => SampleFormat::S16Le,
            Format::S243LE => SampleFormat::S24Le3,
            Format::S32LE => SampleFormat::S32Le,
            other => {
                return Err(HwParamError::new(
                    HwParamStage::Format,
                    DeviceError::failed(libc::EINVAL, format!("unexpected format {:?}", other)),
                ));
            }
        };

        Ok(HwReadback {
            format,
            channels: hwp.get_channels().map_err(stage(HwParamStage::Channels))?,
            rate: hwp.get_rate().map_err(stage(HwParamStage::Rate))?,
            period_frames: hwp.get_period_size().map_err(stage(HwParamStage::PeriodSize))? as usize,
            buffer_frames: hwp.get_buffer_size().map_err(stage(HwParamStage::BufferSize))? as usize,
        })
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        self.pcm.prepare().map_err(device_error)
    }

    fn write_interleaved(&mut self, data: &[u8]) -> Result<usize, DeviceError> {
        let io = self.pcm.io_bytes();
        io.writei(data).map_err(device_error)
    }

    fn read_interleaved(&mut self, data: &mut [u8]) -> Result<usize, DeviceError> {
        let io = self.pcm.io_bytes();
        io.readi(data).map_err(device_error)
    }

    fn drain(&mut self) -> Result<(), DeviceError> {
        self.pcm.drain().map_err(device_error)
    }
}

impl Drop for AlsaPcm {
    fn drop(&mut self) {
        log::info!("ALSA {}: closing device={}", self.direction, self.name);
    }
}

fn alsa_format(format: SampleFormat) -> Format {
    match format {
        SampleFormat::S16Le => Format::S16LE,
        SampleFormat::S24Le3 => Format::S243LE,
        SampleFormat::S32Le => Format::S32LE,
    }
}

fn stage(stage: HwParamStage) -> impl Fn(alsa::Error) -> HwParamError {
    move |e| HwParamError::new(stage, device_error(e))
}

/// EPIPE from a transfer is ALSA's xrun signal.
fn device_error(e: alsa::Error) -> DeviceError {
    let errno = e.errno().abs();
    if errno == libc::EPIPE {
        DeviceError::Xrun
    } else {
        DeviceError::failed(errno, e.to_string())
    }
}
