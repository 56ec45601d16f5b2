use std::path::PathBuf;

/// Tool configuration, loaded from `ROLLCALL_*` environment variables
/// with defaults matching the conventional file layout.
pub struct Config {
    /// Root of the face dataset (default: face_data).
    pub data_dir: PathBuf,
    /// Roster CSV (default: student_info.csv).
    pub roster_path: PathBuf,
    /// Attendance CSV (default: attendance.csv).
    pub attendance_path: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Euclidean distance threshold for a positive match.
    pub match_threshold: f32,
    /// Face crops collected per enrollment session.
    pub samples_per_enroll: usize,
    /// Captures between pose-instruction advances.
    pub instruction_interval: usize,
    /// Integer downscale factor for recognition-time detection
    /// (4 → detect on the 0.25× frame).
    pub detect_downscale: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_dir: env_path("ROLLCALL_DATA_DIR", "face_data"),
            roster_path: env_path("ROLLCALL_ROSTER_PATH", "student_info.csv"),
            attendance_path: env_path("ROLLCALL_ATTENDANCE_PATH", "attendance.csv"),
            camera_device: std::env::var("ROLLCALL_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_dir: env_path("ROLLCALL_MODEL_DIR", "models"),
            match_threshold: env_f32("ROLLCALL_MATCH_THRESHOLD", 0.6),
            samples_per_enroll: env_usize("ROLLCALL_SAMPLES_PER_ENROLL", 100),
            instruction_interval: env_usize("ROLLCALL_INSTRUCTION_INTERVAL", 20),
            detect_downscale: env_u32("ROLLCALL_DETECT_DOWNSCALE", 4),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("det_10g.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the ArcFace recognition model.
    pub fn encoder_model_path(&self) -> String {
        self.model_dir
            .join("w600k_r50.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
