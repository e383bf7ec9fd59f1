use std::io::Write;

use crate::error::StreamError;

use super::device::PcmDevice;
use super::driver::{StreamDriver, StreamStats};
use super::format::StreamFormat;
use super::transfer::{self, TransferOutcome};

impl<D: PcmDevice> StreamDriver<D> {
    /// Capture interleaved PCM into `sink` until the run flag is cleared or
    /// `duration_secs` of audio has been read (0 = no limit).
    pub fn capture<W: Write>(
        &mut self,
        format: StreamFormat,
        sink: &mut W,
        duration_secs: u64,
    ) -> Result<StreamStats, StreamError> {
        let result = self.pump_capture(format, sink, duration_secs);
        self.settle(result)
    }

    fn pump_capture<W: Write>(
        &mut self,
        format: StreamFormat,
        sink: &mut W,
        duration_secs: u64,
    ) -> Result<(), StreamError> {
        self.start()?;
        let hw = self.commit_format(format)?;
        let mut buf = vec![0u8; hw.period_bytes(&format)];
        // sized from the committed rate, not the requested one
        let limit = match duration_secs {
            0 => None,
            secs => Some(secs * hw.sample_rate as u64),
        };

        log::info!(
            "Recording started: {} period={} limit={}",
            format,
            hw.period_frames,
            limit.map_or_else(|| "none".to_string(), |frames| format!("{} frames", frames))
        );

        while self.is_running() {
            let want = match limit {
                Some(limit) if self.stats.frames >= limit => break,
                Some(limit) => (limit - self.stats.frames).min(hw.period_frames as u64) as usize,
                None => hw.period_frames,
            };

            let outcome = match self.device.as_mut() {
                Some(device) => transfer::read(device, &mut buf, want, &format),
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
            if frames < want {
                self.stats.short_transfers += 1;
            }
            if frames > 0 {
                sink.write_all(&buf[..format.frames_to_bytes(frames)])?;
                self.stats.frames += frames as u64;
            }
        }

        sink.flush()?;
        log::info!("Recording stopped after {} frames", self.stats.frames);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::audio::driver::{StreamSettings, StreamState};
    use crate::audio::mock::{MockPcm, Step};

    fn settings(period: usize) -> StreamSettings {
        StreamSettings {
            period_frames: period,
            buffer_multiple: 4,
            max_stalled_writes: 3,
        }
    }

    #[test]
    fn test_capture_stops_at_duration() {
        let format = StreamFormat::new(8000, 1, 16).unwrap();
        let dev = MockPcm::capture();
        let log = dev.log();
        let mut driver = StreamDriver::new(dev, settings(256));
        let mut out = Vec::new();

        let stats = driver.capture(format, &mut out, 1).unwrap();
        assert_eq!(stats.frames, 8000);
        assert_eq!(out.len(), 16000);
        assert_eq!(driver.state(), StreamState::Closed);
        // 31 full periods and a final 64-frame read
        assert_eq!(log.lock().unwrap().read_calls, 32);
        assert_eq!(&out[..4], &[0, 1, 2, 3]);
    }

    #[test]
    fn test_limit_uses_committed_rate() {
        let format = StreamFormat::new(8000, 1, 16).unwrap();
        let mut driver = StreamDriver::new(MockPcm::capture().with_rate(16000), settings(1000));
        let mut out = Vec::new();
        let stats = driver.capture(format, &mut out, 1).unwrap();
        assert_eq!(stats.frames, 16000);
    }

    #[test]
    fn test_overrun_continues_capture() {
        let format = StreamFormat::new(8000, 2, 16).unwrap();
        let dev = MockPcm::capture().with_script(&[Step::Accept, Step::Xrun, Step::Accept]);
        let log = dev.log();
        let mut driver = StreamDriver::new(dev, settings(400));
        let mut out = Vec::new();

        let stats = driver.capture(format, &mut out, 1).unwrap();
        assert_eq!(stats.recovered, 1);
        assert_eq!(stats.frames, 8000);
        let log = log.lock().unwrap();
        // one extra read for the lost period
        assert_eq!(log.read_calls, 21);
        assert_eq!(log.prepares, 2);
    }

    #[test]
    fn test_read_error_fails_capture() {
        let format = StreamFormat::new(8000, 1, 16).unwrap();
        let dev = MockPcm::capture().with_script(&[Step::Accept, Step::Fail(libc::EIO)]);
        let log = dev.log();
        let mut driver = StreamDriver::new(dev, settings(256));
        let mut out = Vec::new();

        assert!(matches!(
            driver.capture(format, &mut out, 0),
            Err(StreamError::Transfer(_))
        ));
        assert_eq!(driver.state(), StreamState::Failed);
        assert_eq!(out.len(), 512);
        let log = log.lock().unwrap();
        assert_eq!(log.drains, 0);
        assert_eq!(log.closes, 1);
    }

    #[test]
    fn test_stop_flag_ends_unbounded_capture() {
        let running = Arc::new(AtomicBool::new(false));
        let format = StreamFormat::new(8000, 1, 16).unwrap();
        let mut driver = StreamDriver::new(MockPcm::capture(), settings(256)).with_run_flag(running);
        let mut out = Vec::new();
        let stats = driver.capture(format, &mut out, 0).unwrap();
        assert_eq!(stats.frames, 0);
        assert!(stats.drained);
    }

    #[test]
    fn test_period_round_trip_preserves_bytes() {
        let format = StreamFormat::new(48000, 2, 24).unwrap();
        let mut captured = Vec::new();
        let mut recorder = StreamDriver::new(MockPcm::capture(), settings(480));
        recorder.capture(format, &mut captured, 1).unwrap();
        assert_eq!(captured.len(), 48000 * 6);

        let dev = MockPcm::playback();
        let log = dev.log();
        let mut player = StreamDriver::new(dev, settings(480));
        let stats = player.play_raw(format, &mut Cursor::new(&captured)).unwrap();
        assert_eq!(stats.frames, 48000);
        assert_eq!(log.lock().unwrap().written, captured);
    }
}
