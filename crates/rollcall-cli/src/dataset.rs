//! Dataset store and known-face index builder.
//!
//! Samples live at `face_data/<name>/<index>.jpg` as grayscale crops. The
//! index builder walks every person directory on startup and produces one
//! embedding per usable image; there is no cache, the scan repeats every
//! run.

use crate::pipeline::{EngineError, FaceDetect, FaceEmbed};
use rollcall_core::KnownFace;
use rollcall_hw::Frame;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("dataset directory not found: {0}")]
    Missing(PathBuf),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error("sample buffer does not match its dimensions")]
    MalformedSample,
}

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// The on-disk face dataset rooted at `face_data/`.
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn person_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create (or reuse) the folder for one person's samples.
    pub fn create_person_dir(&self, name: &str) -> Result<PathBuf, DatasetError> {
        let dir = self.person_dir(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Persist one grayscale crop as `<name>/<index>.jpg`.
    ///
    /// Indexes restart at 0 every session, so re-enrolling a name
    /// overwrites earlier files.
    pub fn save_sample(
        &self,
        name: &str,
        index: usize,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<PathBuf, DatasetError> {
        let img = image::GrayImage::from_raw(width, height, gray.to_vec())
            .ok_or(DatasetError::MalformedSample)?;
        let path = self.person_dir(name).join(format!("{index}.jpg"));
        img.save(&path)?;
        Ok(path)
    }
}

/// Build the known-face index by scanning every image under every person
/// directory.
///
/// Per image: decode to grayscale, detect, embed the first face. Images
/// without a detectable face are skipped with a warning; images that fail
/// to decode or process are skipped with a logged error. The resulting
/// length therefore equals the number of images that yielded an embedding.
pub fn build_index<D, E>(
    root: &Path,
    detector: &mut D,
    embedder: &mut E,
) -> Result<Vec<KnownFace>, EngineError>
where
    D: FaceDetect,
    E: FaceEmbed,
{
    if !root.is_dir() {
        return Err(DatasetError::Missing(root.to_path_buf()).into());
    }

    let mut index = Vec::new();
    let mut skipped = 0usize;

    for person in std::fs::read_dir(root).map_err(DatasetError::from)? {
        let person = person.map_err(DatasetError::from)?;
        if !person.path().is_dir() {
            continue;
        }
        let name = person.file_name().to_string_lossy().into_owned();

        for entry in std::fs::read_dir(person.path()).map_err(DatasetError::from)? {
            let path = entry.map_err(DatasetError::from)?.path();
            if !is_image_file(&path) {
                continue;
            }

            let gray = match image::open(&path) {
                Ok(img) => img.to_luma8(),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "failed to load sample");
                    skipped += 1;
                    continue;
                }
            };
            let frame = Frame {
                width: gray.width(),
                height: gray.height(),
                data: gray.into_raw(),
            };

            match first_embedding(&frame, detector, embedder) {
                Ok(Some(embedding)) => index.push(KnownFace::new(name.clone(), embedding)),
                Ok(None) => {
                    tracing::warn!(path = %path.display(), "no face found in sample");
                    skipped += 1;
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "failed to process sample");
                    skipped += 1;
                }
            }
        }
    }

    tracing::info!(known = index.len(), skipped, "known-face index built");
    Ok(index)
}

fn first_embedding<D: FaceDetect, E: FaceEmbed>(
    frame: &Frame,
    detector: &mut D,
    embedder: &mut E,
) -> Result<Option<rollcall_core::Embedding>, EngineError> {
    let faces = detector.detect(frame)?;
    match faces.first() {
        Some(face) => Ok(Some(embedder.embed(frame, face)?)),
        None => Ok(None),
    }
}
