//! Enrollment: capture face crops from the camera into the dataset, then
//! append a roster row.
//!
//! The capture loop saves every detected face in every frame under the
//! target name until the sample target is reached, the user quits, or the
//! camera stops delivering frames. The roster row is appended regardless
//! of how the loop ended.

use crate::config::Config;
use crate::dataset::DatasetStore;
use crate::pipeline::{EngineError, FaceDetect, FrameSource, Preview};
use crate::records::{Roster, RosterEntry};
use anyhow::Context;
use rollcall_core::FaceDetector;
use rollcall_hw::{overlay, Camera, PreviewWindow};
use std::time::Duration;

/// Pose prompts shown to the user; purely presentational.
pub const INSTRUCTIONS: [&str; 5] = [
    "Look straight",
    "Turn head left",
    "Turn head right",
    "Look up",
    "Look down",
];

const INSTRUCTION_PAUSE: Duration = Duration::from_secs(2);

/// Walks through [`INSTRUCTIONS`], advancing every `interval` captures and
/// sticking on the last one.
pub struct InstructionSchedule {
    index: usize,
    interval: usize,
}

impl InstructionSchedule {
    pub fn new(interval: usize) -> Self {
        Self { index: 0, interval: interval.max(1) }
    }

    pub fn current(&self) -> &'static str {
        INSTRUCTIONS[self.index]
    }

    /// Call after the `count`-th capture; true if the instruction changed
    /// (the caller pauses to let the user adjust).
    pub fn advance_after(&mut self, count: usize) -> bool {
        if count % self.interval == 0 && self.index < INSTRUCTIONS.len() - 1 {
            self.index += 1;
            true
        } else {
            false
        }
    }
}

/// Destination for captured face crops.
pub trait SampleSink {
    fn save(&mut self, index: usize, gray: &[u8], width: u32, height: u32)
        -> Result<(), EngineError>;
}

/// Writes crops into one person's dataset folder.
pub struct PersonSamples<'a> {
    pub store: &'a DatasetStore,
    pub name: &'a str,
}

impl SampleSink for PersonSamples<'_> {
    fn save(
        &mut self,
        index: usize,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<(), EngineError> {
        self.store.save_sample(self.name, index, gray, width, height)?;
        Ok(())
    }
}

pub struct CaptureOptions {
    pub target_samples: usize,
    pub instruction_interval: usize,
}

/// The capture loop. Returns the number of crops saved, which is below the
/// target when the user quit or the frame source ran dry.
pub fn run_capture<F, D, S, U>(
    source: &mut F,
    detector: &mut D,
    sink: &mut S,
    ui: &mut U,
    opts: &CaptureOptions,
) -> Result<usize, EngineError>
where
    F: FrameSource,
    D: FaceDetect,
    S: SampleSink,
    U: Preview,
{
    let mut schedule = InstructionSchedule::new(opts.instruction_interval);
    let mut captured = 0usize;

    while captured < opts.target_samples {
        let Some(frame) = source.next_frame()? else {
            break;
        };
        let faces = detector.detect(&frame)?;

        let mut rgb = frame.to_rgb();
        let (w, h) = (frame.width as usize, frame.height as usize);
        if !faces.is_empty() {
            overlay::draw_text(&mut rgb, w, h, 50, 50, schedule.current(), overlay::GREEN, 3);
        }

        // Every detected face in the frame is saved under the target name.
        for face in &faces {
            if captured >= opts.target_samples {
                break;
            }
            let (crop, cw, ch) = frame.crop(
                face.x as i32,
                face.y as i32,
                face.width.max(0.0) as u32,
                face.height.max(0.0) as u32,
            );
            if crop.is_empty() {
                continue;
            }
            sink.save(captured, &crop, cw, ch)?;
            captured += 1;

            overlay::draw_rect(
                &mut rgb,
                w,
                h,
                face.x as i32,
                face.y as i32,
                face.width as i32,
                face.height as i32,
                overlay::GREEN,
            );
            overlay::draw_text(
                &mut rgb,
                w,
                h,
                face.x as i32 + 5,
                (face.y + face.height) as i32 - 14,
                &captured.to_string(),
                overlay::WHITE,
                2,
            );

            if schedule.advance_after(captured) {
                ui.pause(INSTRUCTION_PAUSE);
            }
        }

        ui.present(&rgb)?;
        if ui.quit_requested() {
            break;
        }
    }

    Ok(captured)
}

/// Metadata collected for one enrollment.
pub struct Enrollee {
    pub name: String,
    pub course: String,
    pub batch: String,
}

/// Wire up the real camera, detector, and preview window and run one
/// enrollment session.
pub fn run(cfg: &Config, enrollee: &Enrollee) -> anyhow::Result<()> {
    let mut camera =
        Camera::open(&cfg.camera_device).context("could not open camera")?;

    let store = DatasetStore::new(&cfg.data_dir);
    let person_dir = store.create_person_dir(&enrollee.name)?;

    let mut detector = FaceDetector::load(&cfg.detector_model_path())?;
    let mut window = PreviewWindow::open(
        "Face Capture",
        camera.width as usize,
        camera.height as usize,
    )?;

    let mut sink = PersonSamples {
        store: &store,
        name: &enrollee.name,
    };
    let opts = CaptureOptions {
        target_samples: cfg.samples_per_enroll,
        instruction_interval: cfg.instruction_interval,
    };
    let captured = run_capture(&mut camera, &mut detector, &mut sink, &mut window, &opts)?;
    tracing::info!(name = %enrollee.name, captured, "capture session finished");

    // Appended even when the session ended early, so a roster row can
    // reference a folder with fewer samples than the target.
    Roster::new(&cfg.roster_path).append(&RosterEntry {
        name: enrollee.name.clone(),
        course: enrollee.course.clone(),
        batch: enrollee.batch.clone(),
        data_path: person_dir.to_string_lossy().into_owned(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::FaceBox;
    use rollcall_hw::Frame;
    use std::collections::VecDeque;

    struct FakeSource {
        frames: VecDeque<Frame>,
    }

    impl FakeSource {
        fn with_frames(count: usize) -> Self {
            let frames = (0..count)
                .map(|_| Frame {
                    data: vec![100u8; 64 * 48],
                    width: 64,
                    height: 48,
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

    /// Returns `faces_per_frame` identical in-bounds boxes per frame.
    struct FixedDetector {
        faces_per_frame: usize,
    }

    impl FaceDetect for FixedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceBox>, EngineError> {
            Ok((0..self.faces_per_frame)
                .map(|i| FaceBox {
                    x: 4.0 + i as f32 * 20.0,
                    y: 4.0,
                    width: 16.0,
                    height: 16.0,
                    confidence: 0.9,
                    landmarks: None,
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct VecSink {
        saved: Vec<usize>,
    }

    impl SampleSink for VecSink {
        fn save(&mut self, index: usize, gray: &[u8], width: u32, height: u32)
            -> Result<(), EngineError> {
            assert_eq!(gray.len(), (width * height) as usize);
            self.saved.push(index);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePreview {
        presents: usize,
        pauses: usize,
        quit_after_presents: Option<usize>,
    }

    impl Preview for FakePreview {
        fn present(&mut self, _rgb: &[u8]) -> Result<(), EngineError> {
            self.presents += 1;
            Ok(())
        }

        fn quit_requested(&mut self) -> bool {
            self.quit_after_presents
                .map(|n| self.presents >= n)
                .unwrap_or(false)
        }

        fn pause(&mut self, _duration: Duration) {
            self.pauses += 1;
        }
    }

    fn opts(target: usize, interval: usize) -> CaptureOptions {
        CaptureOptions {
            target_samples: target,
            instruction_interval: interval,
        }
    }

    #[test]
    fn schedule_advances_on_interval_boundaries() {
        let mut s = InstructionSchedule::new(20);
        assert_eq!(s.current(), "Look straight");
        for count in 1..=19 {
            assert!(!s.advance_after(count));
        }
        assert!(s.advance_after(20));
        assert_eq!(s.current(), "Turn head left");
        assert!(s.advance_after(40));
        assert!(s.advance_after(60));
        assert!(s.advance_after(80));
        assert_eq!(s.current(), "Look down");
    }

    #[test]
    fn schedule_sticks_on_last_instruction() {
        let mut s = InstructionSchedule::new(20);
        for count in [20, 40, 60, 80] {
            s.advance_after(count);
        }
        assert!(!s.advance_after(100));
        assert_eq!(s.current(), "Look down");
    }

    #[test]
    fn capture_reaches_target_with_sequential_indexes() {
        let mut source = FakeSource::with_frames(10);
        let mut detector = FixedDetector { faces_per_frame: 1 };
        let mut sink = VecSink::default();
        let mut ui = FakePreview::default();

        let captured =
            run_capture(&mut source, &mut detector, &mut sink, &mut ui, &opts(5, 20)).unwrap();
        assert_eq!(captured, 5);
        assert_eq!(sink.saved, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn capture_saves_every_face_in_a_frame() {
        let mut source = FakeSource::with_frames(2);
        let mut detector = FixedDetector { faces_per_frame: 2 };
        let mut sink = VecSink::default();
        let mut ui = FakePreview::default();

        let captured =
            run_capture(&mut source, &mut detector, &mut sink, &mut ui, &opts(4, 20)).unwrap();
        assert_eq!(captured, 4);
    }

    #[test]
    fn capture_stops_at_target_mid_frame() {
        let mut source = FakeSource::with_frames(2);
        let mut detector = FixedDetector { faces_per_frame: 2 };
        let mut sink = VecSink::default();
        let mut ui = FakePreview::default();

        let captured =
            run_capture(&mut source, &mut detector, &mut sink, &mut ui, &opts(3, 20)).unwrap();
        assert_eq!(captured, 3);
        assert_eq!(sink.saved.len(), 3);
    }

    #[test]
    fn capture_ends_when_frames_run_out() {
        let mut source = FakeSource::with_frames(2);
        let mut detector = FixedDetector { faces_per_frame: 1 };
        let mut sink = VecSink::default();
        let mut ui = FakePreview::default();

        let captured =
            run_capture(&mut source, &mut detector, &mut sink, &mut ui, &opts(10, 20)).unwrap();
        assert_eq!(captured, 2);
    }

    #[test]
    fn capture_honors_quit_request() {
        let mut source = FakeSource::with_frames(10);
        let mut detector = FixedDetector { faces_per_frame: 1 };
        let mut sink = VecSink::default();
        let mut ui = FakePreview {
            quit_after_presents: Some(1),
            ..Default::default()
        };

        let captured =
            run_capture(&mut source, &mut detector, &mut sink, &mut ui, &opts(10, 20)).unwrap();
        assert_eq!(captured, 1);
    }

    #[test]
    fn capture_pauses_on_each_instruction_change() {
        let mut source = FakeSource::with_frames(10);
        let mut detector = FixedDetector { faces_per_frame: 1 };
        let mut sink = VecSink::default();
        let mut ui = FakePreview::default();

        // Interval 2 with 6 captures → instruction changes after 2, 4, 6.
        run_capture(&mut source, &mut detector, &mut sink, &mut ui, &opts(6, 2)).unwrap();
        assert_eq!(ui.pauses, 3);
    }
}
