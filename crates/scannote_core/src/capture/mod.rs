//! Camera capture collaborator.
//!
//! # Responsibility
//! - Define the device seam (`CameraDevice` / `VideoStream`).
//! - Acquire a stream with an ordered fallback and take one PNG still.
//!
//! # Invariants
//! - Acquisition order is rear-facing first, then any camera.
//! - Every failure is terminal for the attempt; nothing retries on its own.
//! - An acquired stream is stopped on every exit path.

mod file_camera;
mod session;

pub use file_camera::StillFileCamera;
pub use session::{AcquisitionAttempt, CaptureError, CaptureSession, CaptureState};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fixed MIME type of every captured still.
pub const STILL_MIME_TYPE: &str = "image/png";

/// Acquisition attempts in the order they are tried.
pub const ACQUISITION_ORDER: [FacingMode; 2] = [FacingMode::Environment, FacingMode::Any];

/// Camera selection constraint for one acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear-facing camera.
    Environment,
    /// Whatever camera the device offers.
    Any,
}

impl FacingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Any => "any",
        }
    }
}

/// Why a camera could not be acquired or read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraFailure {
    PermissionDenied,
    NotFound,
    /// In use by another application, or a hardware error.
    Busy,
    Unknown(String),
}

impl CameraFailure {
    /// Full-screen message shown next to the single "go back" action.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Camera access was denied. Please grant permission in your settings to continue."
            }
            Self::NotFound => {
                "No camera was found on your device. Please try again on a device with a camera."
            }
            Self::Busy => {
                "The camera is currently in use by another application or there was a hardware error."
            }
            Self::Unknown(_) => {
                "Could not access the camera. Please ensure permissions are granted and a camera is available."
            }
        }
    }

    /// Stable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::Busy => "busy",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl Display for CameraFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "camera permission denied"),
            Self::NotFound => write!(f, "camera not found"),
            Self::Busy => write!(f, "camera busy"),
            Self::Unknown(details) => write!(f, "camera failure: {details}"),
        }
    }
}

impl Error for CameraFailure {}

/// One raw RGBA8 frame from a live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

/// Encoded still image handed to text extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillImage {
    pub width: u32,
    pub height: u32,
    /// PNG-encoded bytes.
    pub bytes: Vec<u8>,
}

impl StillImage {
    /// Wraps PNG bytes produced elsewhere (e.g. by a UI host camera).
    pub fn from_png(bytes: Vec<u8>) -> Result<Self, CaptureError> {
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
            .map_err(|err| CaptureError::Encode(err.to_string()))?;
        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            bytes,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        STILL_MIME_TYPE
    }
}

/// Source of live camera streams.
pub trait CameraDevice {
    /// Acquires a stream matching `facing`.
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraFailure>;
}

/// Live camera stream. Holds the underlying device until `stop` is called.
pub trait VideoStream {
    fn grab_frame(&mut self) -> Result<Frame, CameraFailure>;
    /// Releases the device. Must be safe to call more than once.
    fn stop(&mut self);
}

/// Encodes a raw frame as PNG.
pub fn encode_png(frame: &Frame) -> Result<StillImage, CaptureError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(CaptureError::Encode(format!(
            "frame has empty dimensions {}x{}",
            frame.width, frame.height
        )));
    }
    let expected = u64::from(frame.width) * u64::from(frame.height) * 4;
    if frame.rgba.len() as u64 != expected {
        return Err(CaptureError::Encode(format!(
            "frame buffer has {} bytes, expected {expected}",
            frame.rgba.len()
        )));
    }

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            &frame.rgba,
            frame.width,
            frame.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(|err| CaptureError::Encode(err.to_string()))?;

    Ok(StillImage {
        width: frame.width,
        height: frame.height,
        bytes,
    })
}
