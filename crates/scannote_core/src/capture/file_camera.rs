//! Camera device that serves one still image file as its live feed.
//!
//! Used by the CLI to run the scan flow against an image on disk.

use super::{CameraDevice, CameraFailure, FacingMode, Frame, VideoStream};
use log::debug;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// File-backed camera. Answers every facing mode with the same image.
#[derive(Debug, Clone)]
pub struct StillFileCamera {
    path: PathBuf,
}

impl StillFileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CameraDevice for StillFileCamera {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn VideoStream>, CameraFailure> {
        // Opening the file stands in for acquiring the device, so permission
        // and missing-file errors surface at acquisition time.
        File::open(&self.path).map_err(|err| failure_from_io(&err))?;
        debug!(
            "event=camera_open module=capture status=ok device=file facing={}",
            facing.as_str()
        );
        Ok(Box::new(StillFileStream {
            path: Some(self.path.clone()),
        }))
    }
}

struct StillFileStream {
    path: Option<PathBuf>,
}

impl VideoStream for StillFileStream {
    fn grab_frame(&mut self) -> Result<Frame, CameraFailure> {
        let Some(path) = self.path.as_ref() else {
            return Err(CameraFailure::Unknown("stream already stopped".to_string()));
        };
        let decoded = image::open(path).map_err(|err| match err {
            image::ImageError::IoError(io_err) => failure_from_io(&io_err),
            other => CameraFailure::Unknown(other.to_string()),
        })?;
        let rgba = decoded.to_rgba8();
        Ok(Frame {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    }

    fn stop(&mut self) {
        self.path = None;
    }
}

fn failure_from_io(err: &io::Error) -> CameraFailure {
    match err.kind() {
        io::ErrorKind::NotFound => CameraFailure::NotFound,
        io::ErrorKind::PermissionDenied => CameraFailure::PermissionDenied,
        _ => CameraFailure::Unknown(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::StillFileCamera;
    use crate::capture::{CameraFailure, CaptureSession};

    #[test]
    fn missing_file_reports_not_found_after_both_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = StillFileCamera::new(dir.path().join("missing.png"));
        let mut session = CaptureSession::new();

        let failure = session.start(&mut camera).unwrap_err();
        assert_eq!(failure, CameraFailure::NotFound);
        assert_eq!(session.attempts().len(), 2);
    }

    #[test]
    fn captures_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([9, 9, 9, 255]))
            .save(&path)
            .unwrap();

        let mut camera = StillFileCamera::new(&path);
        let mut session = CaptureSession::new();
        session.start(&mut camera).unwrap();
        let still = session.capture().unwrap();
        assert_eq!((still.width, still.height), (3, 2));
    }

    #[test]
    fn undecodable_file_is_unknown_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"not an image").unwrap();

        let mut camera = StillFileCamera::new(&path);
        let mut session = CaptureSession::new();
        session.start(&mut camera).unwrap();
        let err = session.capture().unwrap_err();
        assert!(err.to_string().contains("camera failure"));
    }
}
