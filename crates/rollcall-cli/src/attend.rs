//! Recognition and attendance marking.
//!
//! Detection and embedding run on a downscaled frame; resolved boxes are
//! scaled back up for the overlay. Each resolved name is recorded at most
//! once per process run — the dedup set lives in the session and dies with
//! it, so a restarted run records the same people again.

use crate::config::Config;
use crate::dataset::{self, DatasetStore};
use crate::pipeline::{EngineError, FaceDetect, FaceEmbed, FrameSource, Preview};
use crate::records::{AttendanceLog, RecordError, RecordSink};
use rollcall_core::{resolve, FaceDetector, FaceEncoder, KnownFace};
use rollcall_hw::{overlay, Camera, PreviewWindow};
use std::collections::HashSet;

const UNKNOWN_LABEL: &str = "Unknown";
const MARKED_LABEL: &str = "Attendance Marked";

/// Per-run attendance state: the sink plus the set of names already
/// credited.
pub struct AttendanceSession<S: RecordSink> {
    marked: HashSet<String>,
    sink: S,
}

impl<S: RecordSink> AttendanceSession<S> {
    pub fn new(sink: S) -> Self {
        Self {
            marked: HashSet::new(),
            sink,
        }
    }

    /// Record `name` if this is its first sighting this run. Returns true
    /// when a row was written.
    pub fn observe(&mut self, name: &str) -> Result<bool, RecordError> {
        if self.marked.contains(name) {
            return Ok(false);
        }
        self.sink.record(name)?;
        self.marked.insert(name.to_string());
        Ok(true)
    }

    pub fn is_marked(&self, name: &str) -> bool {
        self.marked.contains(name)
    }

    #[cfg(test)]
    fn sink(&self) -> &S {
        &self.sink
    }
}

pub struct RecognizeOptions {
    /// Integer downscale factor applied before detection (4 → 0.25×).
    pub downscale: u32,
    /// Euclidean distance threshold for a positive match.
    pub match_threshold: f32,
}

/// The recognition loop: runs until the user quits or frames run out.
pub fn run_recognition<F, D, E, U, S>(
    source: &mut F,
    detector: &mut D,
    embedder: &mut E,
    gallery: &[KnownFace],
    session: &mut AttendanceSession<S>,
    ui: &mut U,
    opts: &RecognizeOptions,
) -> Result<(), EngineError>
where
    F: FrameSource,
    D: FaceDetect,
    E: FaceEmbed,
    U: Preview,
    S: RecordSink,
{
    loop {
        let Some(frame) = source.next_frame()? else {
            break;
        };
        let small = frame.downscaled(opts.downscale);
        let faces = detector.detect(&small)?;

        let mut labeled = Vec::with_capacity(faces.len());
        for face in &faces {
            let embedding = embedder.embed(&small, face)?;
            let name =
                resolve(&embedding, gallery, opts.match_threshold).map(str::to_string);
            if let Some(name) = &name {
                if session.observe(name)? {
                    tracing::info!(name = %name, "attendance marked");
                }
            }
            // Back to full-resolution coordinates for display.
            labeled.push((face.scaled(opts.downscale as f32), name));
        }

        let mut rgb = frame.to_rgb();
        let (w, h) = (frame.width as usize, frame.height as usize);
        for (bbox, name) in &labeled {
            let (x, y) = (bbox.x as i32, bbox.y as i32);
            let (bw, bh) = (bbox.width as i32, bbox.height as i32);
            overlay::draw_rect(&mut rgb, w, h, x, y, bw, bh, overlay::GREEN);

            let label = name.as_deref().unwrap_or(UNKNOWN_LABEL);
            overlay::draw_text(&mut rgb, w, h, x + 6, y + bh - 14, label, overlay::WHITE, 2);
            if name.as_deref().is_some_and(|n| session.is_marked(n)) {
                overlay::draw_text(
                    &mut rgb,
                    w,
                    h,
                    x + 6,
                    y + bh + 6,
                    MARKED_LABEL,
                    overlay::GREEN,
                    1,
                );
            }
        }

        ui.present(&rgb)?;
        if ui.quit_requested() {
            break;
        }
    }

    Ok(())
}

/// Wire up the real camera, models, dataset index, and attendance log.
pub fn run(cfg: &Config) -> anyhow::Result<()> {
    let store = DatasetStore::new(&cfg.data_dir);

    let mut detector = FaceDetector::load(&cfg.detector_model_path())?;
    let mut encoder = FaceEncoder::load(&cfg.encoder_model_path())?;

    let gallery = dataset::build_index(store.root(), &mut detector, &mut encoder)?;
    if gallery.is_empty() {
        anyhow::bail!(
            "no usable face samples under {}; run `rollcall enroll` first",
            cfg.data_dir.display()
        );
    }

    let mut camera = Camera::open(&cfg.camera_device)?;
    let mut window = PreviewWindow::open(
        "Face Recognition",
        camera.width as usize,
        camera.height as usize,
    )?;
    let mut session = AttendanceSession::new(AttendanceLog::new(&cfg.attendance_path));

    run_recognition(
        &mut camera,
        &mut detector,
        &mut encoder,
        &gallery,
        &mut session,
        &mut window,
        &RecognizeOptions {
            downscale: cfg.detect_downscale,
            match_threshold: cfg.match_threshold,
        },
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{Embedding, FaceBox};
    use rollcall_hw::Frame;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct VecSink {
        names: Vec<String>,
    }

    impl RecordSink for VecSink {
        fn record(&mut self, name: &str) -> Result<(), RecordError> {
            self.names.push(name.to_string());
            Ok(())
        }
    }

    /// Frames whose uniform brightness encodes the face identity the fake
    /// embedder reproduces.
    struct FakeSource {
        frames: VecDeque<Frame>,
    }

    impl FakeSource {
        fn uniform(brightness: u8, count: usize) -> Self {
            let frames = (0..count)
                .map(|_| Frame {
                    data: vec![brightness; 32 * 32],
                    width: 32,
                    height: 32,
                })
                .collect();
            Self { frames }
        }
    }

    impl FrameSource for FakeSource {
        fn next_frame(&mut self) -> Result<Option<Frame>, EngineError> {
            Ok(self.frames.pop_front())
        }
    }

    struct OneFaceDetector;

    impl FaceDetect for OneFaceDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, EngineError> {
            Ok(vec![FaceBox {
                x: 2.0,
                y: 2.0,
                width: frame.width as f32 - 4.0,
                height: frame.height as f32 - 4.0,
                confidence: 0.95,
                landmarks: Some([(0.0, 0.0); 5]),
            }])
        }
    }

    /// Embeds a frame as its (normalized) mean brightness.
    struct BrightnessEmbedder;

    impl FaceEmbed for BrightnessEmbedder {
        fn embed(&mut self, frame: &Frame, _face: &FaceBox) -> Result<Embedding, EngineError> {
            let mean =
                frame.data.iter().map(|&p| p as f32).sum::<f32>() / frame.data.len() as f32;
            Ok(Embedding::new(vec![mean / 255.0]))
        }
    }

    #[derive(Default)]
    struct NullPreview;

    impl Preview for NullPreview {
        fn present(&mut self, _rgb: &[u8]) -> Result<(), EngineError> {
            Ok(())
        }

        fn quit_requested(&mut self) -> bool {
            false
        }

        fn pause(&mut self, _duration: std::time::Duration) {}
    }

    fn gallery() -> Vec<KnownFace> {
        vec![
            KnownFace::new("alice", Embedding::new(vec![200.0 / 255.0])),
            KnownFace::new("bob", Embedding::new(vec![50.0 / 255.0])),
        ]
    }

    fn options() -> RecognizeOptions {
        RecognizeOptions {
            downscale: 1,
            match_threshold: 0.1,
        }
    }

    #[test]
    fn session_records_each_name_once() {
        let mut session = AttendanceSession::new(VecSink::default());
        assert!(session.observe("alice").unwrap());
        assert!(!session.observe("alice").unwrap());
        assert!(session.observe("bob").unwrap());
        assert_eq!(session.sink().names, vec!["alice", "bob"]);
        assert!(session.is_marked("alice"));
        assert!(!session.is_marked("carol"));
    }

    #[test]
    fn repeated_sightings_yield_one_record() {
        // The same matched face across 10 consecutive frames.
        let mut source = FakeSource::uniform(200, 10);
        let mut session = AttendanceSession::new(VecSink::default());

        run_recognition(
            &mut source,
            &mut OneFaceDetector,
            &mut BrightnessEmbedder,
            &gallery(),
            &mut session,
            &mut NullPreview,
            &options(),
        )
        .unwrap();

        assert_eq!(session.sink().names, vec!["alice"]);
    }

    #[test]
    fn unknown_faces_never_record() {
        // Brightness 128 is far from both gallery entries at threshold 0.1.
        let mut source = FakeSource::uniform(128, 5);
        let mut session = AttendanceSession::new(VecSink::default());

        run_recognition(
            &mut source,
            &mut OneFaceDetector,
            &mut BrightnessEmbedder,
            &gallery(),
            &mut session,
            &mut NullPreview,
            &options(),
        )
        .unwrap();

        assert!(session.sink().names.is_empty());
    }

    #[test]
    fn fresh_session_records_again() {
        // Restarting the process resets the dedup set by design.
        for _ in 0..2 {
            let mut source = FakeSource::uniform(200, 3);
            let mut session = AttendanceSession::new(VecSink::default());
            run_recognition(
                &mut source,
                &mut OneFaceDetector,
                &mut BrightnessEmbedder,
                &gallery(),
                &mut session,
                &mut NullPreview,
                &options(),
            )
            .unwrap();
            assert_eq!(session.sink().names, vec!["alice"]);
        }
    }

    #[test]
    fn loop_ends_when_frames_run_out() {
        let mut source = FakeSource::uniform(200, 0);
        let mut session = AttendanceSession::new(VecSink::default());
        run_recognition(
            &mut source,
            &mut OneFaceDetector,
            &mut BrightnessEmbedder,
            &gallery(),
            &mut session,
            &mut NullPreview,
            &options(),
        )
        .unwrap();
        assert!(session.sink().names.is_empty());
    }

    #[test]
    fn quit_request_stops_the_loop() {
        struct QuitPreview;
        impl Preview for QuitPreview {
            fn present(&mut self, _rgb: &[u8]) -> Result<(), EngineError> {
                Ok(())
            }
            fn quit_requested(&mut self) -> bool {
                true
            }
            fn pause(&mut self, _duration: std::time::Duration) {}
        }

        let mut source = FakeSource::uniform(200, 10);
        let mut session = AttendanceSession::new(VecSink::default());
        run_recognition(
            &mut source,
            &mut OneFaceDetector,
            &mut BrightnessEmbedder,
            &gallery(),
            &mut session,
            &mut QuitPreview,
            &options(),
        )
        .unwrap();

        // One frame processed before the quit check fired.
        assert_eq!(source.frames.len(), 9);
        assert_eq!(session.sink().names, vec!["alice"]);
    }

    #[test]
    fn downscaled_detection_marks_attendance() {
        // Detection on the 0.25x frame still resolves and records.
        let mut source = FakeSource::uniform(200, 2);
        let mut session = AttendanceSession::new(VecSink::default());
        run_recognition(
            &mut source,
            &mut OneFaceDetector,
            &mut BrightnessEmbedder,
            &gallery(),
            &mut session,
            &mut NullPreview,
            &RecognizeOptions {
                downscale: 4,
                match_threshold: 0.1,
            },
        )
        .unwrap();
        assert_eq!(session.sink().names, vec!["alice"]);
    }
}
