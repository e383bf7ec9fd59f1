//! Runs one stream on a dedicated OS thread.
//!
//! Uses std::thread (NOT tokio tasks): ALSA reads and writes block for a
//! whole period and must never stall the async runtime.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use tokio::signal;
use tokio::sync::oneshot;

use crate::config::AudioConfig;
use crate::error::StreamError;

use super::alsa_device::AlsaPcm;
use super::driver::{StreamDriver, StreamStats};
use super::format::Direction;
use super::frame_source::FrameSource;
use super::mp3_decoder::Mp3FrameDecoder;

pub type StreamResult = std::result::Result<StreamStats, StreamError>;

/// A stream running on its own thread, stoppable through a shared run flag.
pub struct AudioSystem {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    done: Option<oneshot::Receiver<StreamResult>>,
}

impl AudioSystem {
    /// Spawn `job` on a thread called `name`. The job gets the run flag and
    /// must return once it is cleared.
    pub fn spawn<F>(name: &str, job: F) -> Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) -> StreamResult + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = oneshot::channel();

        let handle = {
            let running = running.clone();
            thread::Builder::new().name(name.into()).spawn(move || {
                let result = job(running);
                if let Err(e) = &result {
                    log::error!("Audio thread error: {}", e);
                }
                if tx.send(result).is_err() {
                    log::warn!("Stream result dropped, receiver gone");
                }
            })?
        };

        log::info!("AudioSystem started thread \"{}\"", name);

        Ok(Self {
            running,
            handle: Some(handle),
            done: Some(rx),
        })
    }

    /// Ask the stream to stop after the current transfer.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for the stream to end on its own.
    pub async fn wait(&mut self) -> Result<StreamStats> {
        let done = self.done.take().ok_or_else(|| anyhow!("stream result already taken"))?;
        let result = done.await.context("audio thread exited without a result")?;
        self.join();
        Ok(result?)
    }

    /// Wait for the stream, stopping it gracefully on Ctrl+C.
    pub async fn run_until_signal(mut self) -> Result<StreamStats> {
        let mut done = self.done.take().ok_or_else(|| anyhow!("stream result already taken"))?;

        let result = tokio::select! {
            result = &mut done => result,
            _ = signal::ctrl_c() => {
                log::info!("Ctrl+C received, stopping stream...");
                self.stop();
                done.await
            }
        };
        self.join();
        Ok(result.context("audio thread exited without a result")??)
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Audio thread panicked");
            }
        }
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

// ======================== Stream jobs ========================

/// Play a raw interleaved PCM source in the configured `[raw]` format.
pub fn play_raw_stream<R: Read>(config: &AudioConfig, mut reader: R, running: Arc<AtomicBool>) -> StreamResult {
    let format = config.raw_format()?;
    let device = AlsaPcm::open(&config.playback_device, Direction::Playback)?;
    let mut driver = StreamDriver::new(device, config.playback).with_run_flag(running);
    driver.play_raw(format, &mut reader)
}

/// Capture in the configured `[raw]` format into `sink`.
pub fn capture_stream<W: Write>(config: &AudioConfig, mut sink: W, running: Arc<AtomicBool>) -> StreamResult {
    let format = config.raw_format()?;
    let device = AlsaPcm::open(&config.capture_device, Direction::Capture)?;
    let mut driver = StreamDriver::new(device, config.capture).with_run_flag(running);
    driver.capture(format, &mut sink, config.capture_duration_secs)
}

/// Decode and play an in-memory MP3 bitstream.
pub fn play_mp3_stream(config: &AudioConfig, data: Vec<u8>, running: Arc<AtomicBool>) -> StreamResult {
    log::info!("MP3 input: {} bytes", data.len());
    let mut source = FrameSource::new(Mp3FrameDecoder::new(), data);
    let device = AlsaPcm::open(&config.playback_device, Direction::Playback)?;
    let mut driver = StreamDriver::new(device, config.mp3).with_run_flag(running);
    driver.play_decoded(&mut source)
}
