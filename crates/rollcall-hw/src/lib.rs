//! rollcall-hw — Camera capture and the live preview window.
//!
//! V4L2 frame acquisition with grayscale conversion, pixel-level frame
//! utilities (downscale, crop), and a minifb preview surface with simple
//! rectangle/text overlays.

pub mod camera;
pub mod frame;
pub mod overlay;
pub mod viewer;

pub use camera::{Camera, CameraError};
pub use frame::Frame;
pub use viewer::{PreviewWindow, ViewerError};
