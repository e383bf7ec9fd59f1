use std::io::{ErrorKind, Read};

use crate::error::StreamError;

use super::device::PcmDevice;
use super::driver::{StreamDriver, StreamStats};
use super::format::{PcmFrameBlock, StreamFormat};
use super::frame_source::FrameSource;
use super::stream_decoder::FrameDecoder;

impl<D: PcmDevice> StreamDriver<D> {
    /// Play raw interleaved PCM of a known format, one period per write.
    pub fn play_raw<R: Read>(
        &mut self,
        format: StreamFormat,
        reader: &mut R,
    ) -> Result<StreamStats, StreamError> {
        let result = self.pump_raw(format, reader);
        self.settle(result)
    }

    fn pump_raw<R: Read>(&mut self, format: StreamFormat, reader: &mut R) -> Result<(), StreamError> {
        self.start()?;
        let hw = self.commit_format(format)?;
        let mut buf = vec![0u8; hw.period_bytes(&format)];

        log::info!(
            "Playback started: {} period={} ({} bytes)",
            format,
            hw.period_frames,
            buf.len()
        );

        while self.is_running() {
            let n = read_full(reader, &mut buf)?;
            if n == 0 {
                break;
            }
            let remainder = n % format.frame_bytes();
            if remainder != 0 {
                log::warn!("Discarding {} trailing bytes of a partial frame", remainder);
            }
            let block = PcmFrameBlock::new(&buf[..n], format);
            if !block.is_empty() {
                self.write_block(&block)?;
            }
            if n < buf.len() {
                break;
            }
        }

        if !self.is_running() {
            log::info!("Playback stop requested");
        }
        Ok(())
    }

    /// Play a compressed stream; the first decoded frame fixes the format.
    pub fn play_decoded<F: FrameDecoder>(
        &mut self,
        source: &mut FrameSource<F>,
    ) -> Result<StreamStats, StreamError> {
        let result = self.pump_decoded(source);
        self.settle(result)
    }

    fn pump_decoded<F: FrameDecoder>(&mut self, source: &mut FrameSource<F>) -> Result<(), StreamError> {
        self.start()?;
        let mut bytes = Vec::with_capacity(super::stream_decoder::MAX_SAMPLES_PER_FRAME * 2);

        while self.is_running() {
            let frame = match source.decode_next()? {
                Some(frame) => frame,
                None => break,
            };
            let format = frame.format;
            bytes.clear();
            frame.write_le_bytes(&mut bytes);

            if self.format().is_none() {
                self.commit_format(format)?;
            }
            self.write_block(&PcmFrameBlock::new(&bytes, format))?;
        }

        if self.format().is_none() {
            log::warn!("No audio frames in {} bytes of input", source.len());
        }
        log::info!(
            "Decoded {} frames, {} bytes scanned, {} skipped, {} underflows",
            source.frames_decoded(),
            source.bytes_scanned(),
            source.skipped_frames(),
            source.underflows()
        );
        Ok(())
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, StreamError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
