use std::io::{self, Read};
use std::thread;
use std::time::Duration;

use co2meter_core::{DecodedFrame, FRAME_SIZE, FrameError, RawFrame, SessionKey};
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace, warn};

use crate::state::EnvironmentState;

/// Reaction to a decoded frame that fails its terminator or checksum check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InvalidFramePolicy {
    /// Stop polling and keep serving the last readings.
    #[default]
    Stop,
    /// Drop the frame and read the next one.
    Skip,
    /// Stop polling and report an error.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Frames are plaintext, take them as they are.
    pub skip_decryption: bool,
    pub on_invalid_frame: InvalidFramePolicy,
    /// Pause after each frame.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            skip_decryption: false,
            on_invalid_frame: InvalidFramePolicy::Stop,
            interval: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("failed to read frame from device")]
    Read(#[source] io::Error),

    #[error("received invalid frame {frame:02X?}")]
    InvalidFrame {
        frame: DecodedFrame,
        #[source]
        source: FrameError,
    },
}

/// How a poll loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// An invalid frame arrived under [`InvalidFramePolicy::Stop`].
    InvalidFrame(DecodedFrame),
}

/// Result of a single read-decode-dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// The frame was handled, whether or not it carried a known measurement.
    Continue,
    /// The loop has to end.
    Stop(DecodedFrame),
}

/// Reads frames from the device and stores decoded measurements.
///
/// The only writer of [`EnvironmentState`].
pub struct PollLoop<R> {
    reader: R,
    key: SessionKey,
    state: EnvironmentState,
    config: PollConfig,
}

impl<R: Read> PollLoop<R> {
    pub fn new(reader: R, key: SessionKey, state: EnvironmentState, config: PollConfig) -> Self {
        Self {
            reader,
            key,
            state,
            config,
        }
    }

    fn read_frame(&mut self) -> Result<RawFrame, PollError> {
        let mut buf = [0u8; FRAME_SIZE];
        self.reader.read_exact(&mut buf).map_err(PollError::Read)?;
        Ok(RawFrame(buf))
    }

    /// Read one frame and record its measurement, if any. Does not sleep.
    pub fn poll_once(&mut self) -> Result<Cycle, PollError> {
        let raw = self.read_frame()?;

        let frame = if self.config.skip_decryption {
            raw.into_plain()
        } else {
            let frame = co2meter_core::decode(&raw, &self.key);
            if let Err(e) = co2meter_core::validate(&frame) {
                warn!(error = %e, frame = ?frame.0, "Data decryption failed");
                match self.config.on_invalid_frame {
                    InvalidFramePolicy::Stop => return Ok(Cycle::Stop(frame)),
                    InvalidFramePolicy::Skip => return Ok(Cycle::Continue),
                    InvalidFramePolicy::Fatal => {
                        return Err(PollError::InvalidFrame { frame, source: e });
                    }
                }
            }
            frame
        };

        match co2meter_core::extract(&frame) {
            Some(measurement) => {
                debug!(?measurement, "Received measurement");
                self.state.record(measurement);
            }
            None => trace!(kind = frame.kind(), "Ignoring frame of unknown kind"),
        }

        Ok(Cycle::Continue)
    }

    /// Poll until the device fails or an invalid frame stops the loop.
    pub fn run(mut self) -> Result<PollExit, PollError> {
        info!(
            skip_decryption = self.config.skip_decryption,
            on_invalid_frame = ?self.config.on_invalid_frame,
            interval_ms = self.config.interval.as_millis() as u64,
            "Poll loop started"
        );

        loop {
            match self.poll_once() {
                Ok(Cycle::Continue) => {}
                Ok(Cycle::Stop(frame)) => return Ok(PollExit::InvalidFrame(frame)),
                Err(e) => {
                    error!(error = %e, "Poll loop failed");
                    return Err(e);
                }
            }

            if !self.config.interval.is_zero() {
                thread::sleep(self.config.interval);
            }
        }
    }
}

/// Run `poll` on a dedicated thread.
///
/// Device reads block without bound, so the loop never runs on the async
/// runtime. The returned receiver yields the loop's outcome; it errors only
/// if the thread panicked.
pub fn spawn<R>(poll: PollLoop<R>) -> io::Result<oneshot::Receiver<Result<PollExit, PollError>>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    thread::Builder::new()
        .name("co2-poll".to_owned())
        .spawn(move || {
            let outcome = poll.run();
            let _ = tx.send(outcome);
        })?;

    Ok(rx)
}
