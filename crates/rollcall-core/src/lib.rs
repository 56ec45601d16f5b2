//! rollcall-core — Face detection and embedding extraction.
//!
//! SCRFD detects faces, ArcFace turns an aligned crop into a 512-dim
//! embedding. Both run on CPU via ONNX Runtime. Matching is a plain
//! nearest-neighbor lookup over enrolled embeddings.

pub mod alignment;
pub mod detector;
pub mod encoder;
pub mod types;

pub use detector::{DetectorError, FaceDetector};
pub use encoder::{EncoderError, FaceEncoder};
pub use types::{nearest, resolve, Embedding, FaceBox, KnownFace, Nearest};
