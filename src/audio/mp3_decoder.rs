//! Safe wrapper around minimp3's frame decoder.

use std::ffi::c_int;

use minimp3_sys as ffi;

use super::stream_decoder::{DecodeError, DecodedUnit, FrameDecoder, FrameInfo, MAX_SAMPLES_PER_FRAME};

// ======================== MP3 frame decoder ========================

/// Decodes one MPEG audio frame per call into 16-bit interleaved PCM.
pub struct Mp3FrameDecoder {
    // Boxed: the decoder state is several KiB of overlap/reservoir buffers.
    dec: Box<ffi::mp3dec_t>,
}

impl Mp3FrameDecoder {
    pub fn new() -> Self {
        // mp3dec_t is plain arrays and integers; all-zero is a valid value.
        let mut dec: Box<ffi::mp3dec_t> = Box::new(unsafe { std::mem::zeroed() });
        unsafe {
            ffi::mp3dec_init(&mut *dec);
        }
        Self { dec }
    }
}

impl Default for Mp3FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder for Mp3FrameDecoder {
    fn decode_frame(&mut self, input: &[u8], pcm: &mut [i16]) -> Result<DecodedUnit, DecodeError> {
        if pcm.len() < MAX_SAMPLES_PER_FRAME {
            return Err(DecodeError::Corrupt(format!(
                "output buffer holds {} samples, need {}",
                pcm.len(),
                MAX_SAMPLES_PER_FRAME
            )));
        }
        if input.is_empty() {
            return Err(DecodeError::SyncNotFound);
        }

        let len = input.len().min(c_int::MAX as usize) as c_int;
        let mut info: ffi::mp3dec_frame_info_t = unsafe { std::mem::zeroed() };
        let samples = unsafe {
            ffi::mp3dec_decode_frame(
                &mut *self.dec,
                input.as_ptr().cast(),
                len,
                pcm.as_mut_ptr().cast(),
                &mut info,
            )
        };

        // minimp3: no samples and no header format means it scanned the whole
        // input without finding a frame. A found header with no samples yet
        // (bit reservoir still filling) keeps its hz/channels.
        if samples <= 0 && (info.frame_bytes <= 0 || (info.hz == 0 && info.channels == 0)) {
            return Err(DecodeError::SyncNotFound);
        }

        Ok(DecodedUnit {
            consumed: info.frame_bytes.max(0) as usize,
            frames: samples.max(0) as usize,
            info: FrameInfo {
                channels: info.channels.max(0) as u32,
                sample_rate: info.hz.max(0) as u32,
                bits_per_sample: 16,
                layer: info.layer.max(0) as u32,
                bitrate_kbps: info.bitrate_kbps.max(0) as u32,
            },
        })
    }
}
