use serde::{Deserialize, Serialize};

/// Axis-aligned box around a detected face, plus optional five-point
/// landmarks used for alignment before embedding extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// [left_eye, right_eye, nose, left_mouth, right_mouth]
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl FaceBox {
    /// Return the same box with all coordinates multiplied by `factor`.
    ///
    /// Detection runs on a downscaled frame; the inverse factor maps the
    /// box back onto the full-resolution frame for display.
    pub fn scaled(&self, factor: f32) -> FaceBox {
        FaceBox {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
            confidence: self.confidence,
            landmarks: self
                .landmarks
                .map(|lms| lms.map(|(lx, ly)| (lx * factor, ly * factor))),
        }
    }
}

/// Face embedding vector (512-dim for the w600k_r50 ArcFace model),
/// L2-normalized by the encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance to another embedding. Lower = more similar.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

/// One enrolled sample: the embedding plus the name of its owner.
#[derive(Debug, Clone)]
pub struct KnownFace {
    pub name: String,
    pub embedding: Embedding,
}

impl KnownFace {
    pub fn new(name: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            name: name.into(),
            embedding,
        }
    }
}

/// The nearest enrolled sample to a probe embedding.
#[derive(Debug, Clone)]
pub struct Nearest<'a> {
    pub index: usize,
    pub name: &'a str,
    pub distance: f32,
}

/// Find the enrolled sample with the smallest distance to `probe`.
///
/// Every gallery entry is compared; returns `None` only for an empty
/// gallery.
pub fn nearest<'a>(probe: &Embedding, gallery: &'a [KnownFace]) -> Option<Nearest<'a>> {
    let mut best: Option<Nearest<'a>> = None;

    for (index, known) in gallery.iter().enumerate() {
        let distance = probe.distance(&known.embedding);
        let better = match &best {
            None => true,
            Some(b) => distance < b.distance,
        };
        if better {
            best = Some(Nearest {
                index,
                name: &known.name,
                distance,
            });
        }
    }

    best
}

/// Resolve a probe to an enrolled name, or `None` for an unknown face.
///
/// The nearest neighbor is selected by distance first; the threshold is
/// then applied to that single candidate. A probe therefore only comes
/// back unknown when its true nearest neighbor fails the threshold, never
/// because several candidates were close.
pub fn resolve<'a>(probe: &Embedding, gallery: &'a [KnownFace], threshold: f32) -> Option<&'a str> {
    nearest(probe, gallery)
        .filter(|n| n.distance <= threshold)
        .map(|n| n.name)
}
