//! Capability seams between the orchestration loops and the real devices.
//!
//! The enrollment and recognition loops only see these traits, so tests
//! drive them with deterministic fakes instead of a camera and ONNX
//! sessions.

use rollcall_core::{Embedding, FaceBox};
use rollcall_hw::{Camera, Frame, PreviewWindow};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera: {0}")]
    Camera(#[from] rollcall_hw::CameraError),
    #[error("preview window: {0}")]
    Viewer(#[from] rollcall_hw::ViewerError),
    #[error("detector: {0}")]
    Detector(#[from] rollcall_core::DetectorError),
    #[error("encoder: {0}")]
    Encoder(#[from] rollcall_core::EncoderError),
    #[error("record file: {0}")]
    Records(#[from] crate::records::RecordError),
    #[error("dataset: {0}")]
    Dataset(#[from] crate::dataset::DatasetError),
}

/// Source of camera frames.
pub trait FrameSource {
    /// The next frame, or `None` when the stream has ended. A failed read
    /// ends the stream rather than aborting the run.
    fn next_frame(&mut self) -> Result<Option<Frame>, EngineError>;
}

/// Face detection capability.
pub trait FaceDetect {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, EngineError>;
}

/// Embedding extraction capability.
pub trait FaceEmbed {
    fn embed(&mut self, frame: &Frame, face: &FaceBox) -> Result<Embedding, EngineError>;
}

/// The on-screen surface plus user cancellation.
pub trait Preview {
    fn present(&mut self, rgb: &[u8]) -> Result<(), EngineError>;
    fn quit_requested(&mut self) -> bool;
    /// Block briefly (instruction changes pause to let the user adjust).
    fn pause(&mut self, duration: Duration);
}

impl FrameSource for Camera {
    fn next_frame(&mut self) -> Result<Option<Frame>, EngineError> {
        match self.capture_frame() {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                tracing::warn!(error = %e, "frame read failed, ending capture");
                Ok(None)
            }
        }
    }
}

impl FaceDetect for rollcall_core::FaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, EngineError> {
        Ok(self.detect(&frame.data, frame.width, frame.height)?)
    }
}

impl FaceEmbed for rollcall_core::FaceEncoder {
    fn embed(&mut self, frame: &Frame, face: &FaceBox) -> Result<Embedding, EngineError> {
        Ok(self.embed(&frame.data, frame.width, frame.height, face)?)
    }
}

impl Preview for PreviewWindow {
    fn present(&mut self, rgb: &[u8]) -> Result<(), EngineError> {
        Ok(PreviewWindow::present(self, rgb)?)
    }

    fn quit_requested(&mut self) -> bool {
        PreviewWindow::quit_requested(self)
    }

    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
