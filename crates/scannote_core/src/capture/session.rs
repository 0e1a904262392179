//! Capture session state machine.
//!
//! `Idle → Requesting(rear) → Streaming | Requesting(any) → Streaming | Failed`,
//! then `Streaming → Stopped` on capture or close.

use super::{encode_png, CameraDevice, CameraFailure, FacingMode, StillImage, VideoStream};
use super::ACQUISITION_ORDER;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Requesting(FacingMode),
    Streaming(FacingMode),
    /// Stream released after a capture or an explicit close.
    Stopped,
    /// Terminal failure for this attempt.
    Failed(CameraFailure),
}

impl CaptureState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting(_) => "requesting",
            Self::Streaming(_) => "streaming",
            Self::Stopped => "stopped",
            Self::Failed(_) => "failed",
        }
    }
}

/// Outcome of one entry of `ACQUISITION_ORDER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionAttempt {
    pub facing: FacingMode,
    pub failure: Option<CameraFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// `capture` called outside `Streaming`.
    NotStreaming { state: &'static str },
    Camera(CameraFailure),
    /// Frame could not be turned into a PNG still.
    Encode(String),
}

impl CaptureError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Camera(failure) => failure.user_message(),
            Self::NotStreaming { .. } | Self::Encode(_) => {
                "Could not capture an image. Please try again."
            }
        }
    }
}

impl Display for CaptureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStreaming { state } => write!(f, "camera is not streaming (state={state})"),
            Self::Camera(failure) => write!(f, "{failure}"),
            Self::Encode(details) => write!(f, "failed to encode still image: {details}"),
        }
    }
}

impl Error for CaptureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Camera(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<CameraFailure> for CaptureError {
    fn from(value: CameraFailure) -> Self {
        Self::Camera(value)
    }
}

/// Owns an acquired stream and stops it when dropped.
struct StreamGuard {
    stream: Option<Box<dyn VideoStream>>,
}

impl StreamGuard {
    fn empty() -> Self {
        Self { stream: None }
    }

    fn hold(&mut self, stream: Box<dyn VideoStream>) {
        self.release();
        self.stream = Some(stream);
    }

    fn stream_mut(&mut self) -> Option<&mut (dyn VideoStream + 'static)> {
        self.stream.as_deref_mut()
    }

    fn is_held(&self) -> bool {
        self.stream.is_some()
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// One camera acquisition and at most one still capture.
pub struct CaptureSession {
    state: CaptureState,
    attempts: Vec<AcquisitionAttempt>,
    guard: StreamGuard,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            attempts: Vec::new(),
            guard: StreamGuard::empty(),
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Attempts made by the last `start`, in order.
    pub fn attempts(&self) -> &[AcquisitionAttempt] {
        &self.attempts
    }

    /// The terminal failure, when the session is in `Failed`.
    pub fn failure(&self) -> Option<&CameraFailure> {
        match &self.state {
            CaptureState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, CaptureState::Streaming(_))
    }

    /// Walks `ACQUISITION_ORDER` until one attempt yields a stream.
    ///
    /// Returns the facing mode that succeeded. When every attempt fails the
    /// session ends in `Failed` with the last attempt's reason.
    pub fn start(&mut self, device: &mut dyn CameraDevice) -> Result<FacingMode, CameraFailure> {
        self.guard.release();
        self.attempts.clear();

        let mut last_failure = CameraFailure::Unknown("no acquisition attempts".to_string());
        for facing in ACQUISITION_ORDER {
            self.state = CaptureState::Requesting(facing);
            match device.open(facing) {
                Ok(stream) => {
                    self.guard.hold(stream);
                    self.attempts.push(AcquisitionAttempt {
                        facing,
                        failure: None,
                    });
                    self.state = CaptureState::Streaming(facing);
                    info!(
                        "event=camera_acquire module=capture status=ok facing={} attempts={}",
                        facing.as_str(),
                        self.attempts.len()
                    );
                    return Ok(facing);
                }
                Err(failure) => {
                    warn!(
                        "event=camera_acquire module=capture status=fallback facing={} error_code={}",
                        facing.as_str(),
                        failure.code()
                    );
                    self.attempts.push(AcquisitionAttempt {
                        facing,
                        failure: Some(failure.clone()),
                    });
                    last_failure = failure;
                }
            }
        }

        warn!(
            "event=camera_acquire module=capture status=error error_code={} error={}",
            last_failure.code(),
            last_failure
        );
        self.state = CaptureState::Failed(last_failure.clone());
        Err(last_failure)
    }

    /// Takes one still and releases the stream.
    ///
    /// The stream is released whether or not the frame could be read. A
    /// frame that cannot be read or encoded leaves the session `Failed`.
    pub fn capture(&mut self) -> Result<StillImage, CaptureError> {
        if !self.is_streaming() {
            return Err(CaptureError::NotStreaming {
                state: self.state.name(),
            });
        }
        let Some(stream) = self.guard.stream_mut() else {
            return Err(CaptureError::NotStreaming {
                state: self.state.name(),
            });
        };

        let frame = stream.grab_frame();
        self.guard.release();

        let frame = match frame {
            Ok(frame) => frame,
            Err(failure) => {
                warn!(
                    "event=camera_capture module=capture status=error error_code={}",
                    failure.code()
                );
                self.state = CaptureState::Failed(failure.clone());
                return Err(failure.into());
            }
        };

        let still = match encode_png(&frame) {
            Ok(still) => still,
            Err(err) => {
                warn!(
                    "event=camera_capture module=capture status=error error_code=encode_failed error={err}"
                );
                self.state = CaptureState::Failed(CameraFailure::Unknown(err.to_string()));
                return Err(err);
            }
        };
        self.state = CaptureState::Stopped;
        info!(
            "event=camera_capture module=capture status=ok width={} height={} bytes={}",
            still.width,
            still.height,
            still.bytes.len()
        );
        Ok(still)
    }

    /// Releases the stream without capturing.
    pub fn close(&mut self) {
        let was_held = self.guard.is_held();
        self.guard.release();
        if was_held {
            self.state = CaptureState::Stopped;
            info!("event=camera_release module=capture status=ok reason=close");
        }
    }
}
