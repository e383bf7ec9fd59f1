//! Nearest-fit hardware parameter negotiation.
//!
//! The device is free to adjust rate, period and buffer; everything the
//! engine sizes afterwards uses the values read back here, never the ones
//! requested. Format, access mode and channel count must match exactly.

use crate::error::{DeviceError, NegotiationError, StreamError};

use super::device::{AccessMode, HwParamStage, HwRequest, PcmDevice};
use super::format::{HardwareConfig, StreamFormat};

/// Smallest buffer, in periods, that still double-buffers.
pub const MIN_BUFFER_MULTIPLE: usize = 2;

/// Propose `format` with the given period and buffer multiple, commit, and
/// prepare the endpoint.
pub fn configure<D: PcmDevice + ?Sized>(
    device: &mut D,
    format: &StreamFormat,
    period_frames: usize,
    buffer_multiple: usize,
) -> Result<HardwareConfig, StreamError> {
    if period_frames == 0 {
        return Err(NegotiationError::InvalidRequest("period must be > 0 frames".into()).into());
    }
    if buffer_multiple < MIN_BUFFER_MULTIPLE {
        return Err(NegotiationError::InvalidRequest(format!(
            "buffer multiple {} is below {}",
            buffer_multiple, MIN_BUFFER_MULTIPLE
        ))
        .into());
    }

    let request = HwRequest {
        access: AccessMode::RwInterleaved,
        format: format.sample_format(),
        channels: format.channels(),
        rate: format.sample_rate(),
        period_frames,
        buffer_multiple,
    };

    let actual = device.apply_hw_params(&request).map_err(|e| {
        let detail = format!("{} rejected: {}", describe(&request, e.stage), e.source);
        match e.stage {
            HwParamStage::Access => NegotiationError::UnsupportedAccessMode(e.source),
            HwParamStage::Format => NegotiationError::UnsupportedFormat(detail),
            HwParamStage::Channels => NegotiationError::UnsupportedChannels(detail),
            HwParamStage::Rate => NegotiationError::UnsupportedRate(e.source),
            HwParamStage::PeriodSize => NegotiationError::UnsupportedPeriod(detail),
            HwParamStage::BufferSize => NegotiationError::UnsupportedBuffer(e.source),
            HwParamStage::Init | HwParamStage::Commit => NegotiationError::ParamCommitFailed(e.source),
        }
    })?;

    if actual.format != request.format {
        return Err(NegotiationError::UnsupportedFormat(format!(
            "requested {:?}, device set {:?}",
            request.format, actual.format
        ))
        .into());
    }
    if actual.channels != request.channels {
        return Err(NegotiationError::UnsupportedChannels(format!(
            "requested {}, device set {}",
            request.channels, actual.channels
        ))
        .into());
    }
    if actual.rate == 0 {
        return Err(NegotiationError::UnsupportedRate(DeviceError::failed(
            libc::EINVAL,
            "device reported a zero rate",
        ))
        .into());
    }
    if actual.rate != request.rate {
        log::warn!(
            "Sample rate adjusted from {} to {}",
            request.rate,
            actual.rate
        );
    }
    if actual.period_frames == 0 {
        return Err(NegotiationError::UnsupportedPeriod("device chose a zero period".into()).into());
    }
    if actual.buffer_frames < MIN_BUFFER_MULTIPLE * actual.period_frames {
        return Err(NegotiationError::BufferTooSmall {
            period: actual.period_frames,
            buffer: actual.buffer_frames,
        }
        .into());
    }
    if actual.buffer_frames % actual.period_frames != 0 {
        log::warn!(
            "Buffer of {} frames is not a whole number of {}-frame periods",
            actual.buffer_frames,
            actual.period_frames
        );
    }

    device
        .prepare()
        .map_err(NegotiationError::ParamCommitFailed)?;

    let config = HardwareConfig {
        direction: device.direction(),
        sample_rate: actual.rate,
        period_frames: actual.period_frames,
        buffer_frames: actual.buffer_frames,
    };

    log::info!(
        "ALSA buffer: period={} frames, buffer={} frames ({:.1}ms @ {}Hz)",
        config.period_frames,
        config.buffer_frames,
        config.buffer_latency_ms(),
        config.sample_rate,
    );

    Ok(config)
}

fn describe(request: &HwRequest, stage: HwParamStage) -> String {
    match stage {
        HwParamStage::Format => format!("format {:?}", request.format),
        HwParamStage::Channels => format!("{} channels", request.channels),
        HwParamStage::PeriodSize => format!("period of {} frames", request.period_frames),
        _ => format!("{:?}", stage),
    }
}
