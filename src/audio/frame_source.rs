//! Lazy sequence of decoded PCM frames over an in-memory bitstream.

use crate::error::StreamError;

use super::format::{MAX_CHANNELS, StreamFormat};
use super::stream_decoder::{DecodeError, FrameDecoder, FrameInfo, MAX_SAMPLES_PER_FRAME};

/// Bit depth of the `i16` samples every [`FrameDecoder`] produces.
const DECODED_BITS: u32 = 16;

/// One decoded frame, borrowed from the source until the next decode.
#[derive(Debug)]
pub struct DecodedFrame<'a> {
    pub samples: &'a [i16],
    /// Samples per channel.
    pub frames: usize,
    pub format: StreamFormat,
    pub info: FrameInfo,
}

impl DecodedFrame<'_> {
    /// Append the samples as little-endian bytes to `out`.
    pub fn write_le_bytes(&self, out: &mut Vec<u8>) {
        out.reserve(self.samples.len() * 2);
        for sample in self.samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }
}

/// Walks a bitstream frame by frame. The first valid frame fixes the stream
/// format; any later frame that disagrees is a [`StreamError::FormatDrift`].
pub struct FrameSource<D: FrameDecoder> {
    decoder: D,
    data: Vec<u8>,
    cursor: usize,
    pcm: Vec<i16>,
    format: Option<StreamFormat>,
    frames_decoded: u64,
    underflows: u64,
    skipped_frames: u64,
}

impl<D: FrameDecoder> FrameSource<D> {
    pub fn new(decoder: D, data: Vec<u8>) -> Self {
        Self {
            decoder,
            data,
            cursor: 0,
            pcm: vec![0i16; MAX_SAMPLES_PER_FRAME],
            format: None,
            frames_decoded: 0,
            underflows: 0,
            skipped_frames: 0,
        }
    }

    /// Format locked by the first decoded frame.
    pub fn format(&self) -> Option<StreamFormat> {
        self.format
    }

    /// Input bytes consumed so far.
    pub fn bytes_scanned(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fraction of the input consumed, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.data.is_empty() {
            1.0
        } else {
            self.cursor as f32 / self.data.len() as f32
        }
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn underflows(&self) -> u64 {
        self.underflows
    }

    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    /// Decode the next frame that carries samples.
    ///
    /// Returns `Ok(None)` once the input is exhausted. Underflow and empty
    /// frames are skipped here and never reach the caller.
    pub fn decode_next(&mut self) -> Result<Option<DecodedFrame<'_>>, StreamError> {
        loop {
            if self.cursor >= self.data.len() {
                return Ok(None);
            }

            let offset = self.cursor;
            let unit = match self.decoder.decode_frame(&self.data[offset..], &mut self.pcm) {
                Ok(unit) => unit,
                Err(DecodeError::Underflow { consumed }) => {
                    self.underflows += 1;
                    // always make progress towards the next frame boundary
                    let step = consumed.max(1);
                    log::warn!(
                        "MP3 decoder: input underflow at offset {}, skipping {} bytes",
                        offset,
                        step
                    );
                    self.cursor = (offset + step).min(self.data.len());
                    continue;
                }
                Err(DecodeError::SyncNotFound) => {
                    log::error!("No sync word found at offset {}/{}", offset, self.data.len());
                    return Err(StreamError::SyncLost { offset });
                }
                Err(DecodeError::Corrupt(reason)) => {
                    return Err(StreamError::CorruptFrame { offset, reason });
                }
            };

            if unit.consumed == 0 {
                return Err(StreamError::CorruptFrame {
                    offset,
                    reason: "Invalid frame bytes: 0".into(),
                });
            }
            self.cursor = (offset + unit.consumed).min(self.data.len());

            if unit.frames == 0 {
                self.skipped_frames += 1;
                log::warn!(
                    "Empty frame at offset {}/{} ({:.1}%)",
                    self.cursor,
                    self.data.len(),
                    self.progress() * 100.0
                );
                continue;
            }

            let info = unit.info;
            if info.channels == 0 || info.sample_rate == 0 {
                return Err(StreamError::CorruptFrame {
                    offset,
                    reason: format!(
                        "Invalid format: channels={}, sample_rate={}",
                        info.channels, info.sample_rate
                    ),
                });
            }
            if info.channels > MAX_CHANNELS {
                return Err(StreamError::ResourceExhaustion {
                    requested: info.channels as usize,
                    limit: MAX_CHANNELS as usize,
                });
            }
            let samples = unit.frames * info.channels as usize;
            if samples > MAX_SAMPLES_PER_FRAME {
                log::error!(
                    "PCM data overflow: {} samples > buffer size {}",
                    samples,
                    MAX_SAMPLES_PER_FRAME
                );
                return Err(StreamError::ResourceExhaustion {
                    requested: samples,
                    limit: MAX_SAMPLES_PER_FRAME,
                });
            }

            // decoders hand back i16 samples, so the stream is 16-bit whatever the header says
            if info.bits_per_sample != DECODED_BITS {
                return Err(StreamError::CorruptFrame {
                    offset,
                    reason: format!(
                        "decoder reported {} bits per sample, output is {}-bit",
                        info.bits_per_sample, DECODED_BITS
                    ),
                });
            }

            let found = StreamFormat::new(info.sample_rate, info.channels, DECODED_BITS)
                .map_err(|e| StreamError::CorruptFrame {
                    offset,
                    reason: e.to_string(),
                })?;
            match self.format {
                None => {
                    log::info!(
                        "Frame layer: {} Channels: {} Frame Hz: {} Bitrate: {}kbps",
                        info.layer,
                        info.channels,
                        info.sample_rate,
                        info.bitrate_kbps
                    );
                    self.format = Some(found);
                }
                Some(committed) if committed != found => {
                    log::error!("Format changed mid-stream: {} -> {}", committed, found);
                    return Err(StreamError::FormatDrift { committed, found });
                }
                Some(_) => {}
            }

            self.frames_decoded += 1;
            log::debug!(
                "Decoded frame {} at {}/{} ({:.1}%)",
                self.frames_decoded,
                self.cursor,
                self.data.len(),
                self.progress() * 100.0
            );

            return Ok(Some(DecodedFrame {
                samples: &self.pcm[..samples],
                frames: unit.frames,
                format: found,
                info,
            }));
        }
    }
}
