use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, loaded from `GLIMPSE_*` environment variables.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Directory containing labeled reference photos and manifest.json.
    pub images_dir: PathBuf,
    /// Euclidean distance threshold for a positive match.
    pub match_threshold: f32,
    /// Recognition loop period in milliseconds.
    pub tick_period_ms: u64,
    /// Extensions tried when resolving reference images, in order.
    pub image_extensions: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            camera_device: std::env::var("GLIMPSE_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_dir: std::env::var("GLIMPSE_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),
            images_dir: std::env::var("GLIMPSE_IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("labeled_images")),
            match_threshold: env_f32(
                "GLIMPSE_MATCH_THRESHOLD",
                glimpse_core::DEFAULT_MATCH_THRESHOLD,
            ),
            tick_period_ms: env_u64("GLIMPSE_TICK_PERIOD_MS", 100),
            image_extensions: env_list(
                "GLIMPSE_IMAGE_EXTENSIONS",
                &glimpse_core::gallery::IMAGE_EXTENSIONS,
            ),
        }
    }

    /// Path to the face detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("face_detector.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the descriptor embedding model.
    pub fn embedder_model_path(&self) -> String {
        self.model_dir
            .join("face_embedder.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the label manifest inside the images directory.
    pub fn manifest_path(&self) -> PathBuf {
        self.images_dir.join(glimpse_core::manifest::MANIFEST_FILE)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated list; an unset or all-blank value falls back.
fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    let parsed: Option<Vec<String>> = std::env::var(key).ok().map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });
    match parsed {
        Some(list) if !list.is_empty() => list,
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_f32_unset_uses_default() {
        assert_eq!(env_f32("GLIMPSE_TEST_F32_UNSET", 0.6), 0.6);
    }

    #[test]
    fn test_env_f32_override() {
        std::env::set_var("GLIMPSE_TEST_F32_SET", "0.45");
        assert_eq!(env_f32("GLIMPSE_TEST_F32_SET", 0.6), 0.45);
        std::env::remove_var("GLIMPSE_TEST_F32_SET");
    }

    #[test]
    fn test_env_f32_garbage_falls_back() {
        std::env::set_var("GLIMPSE_TEST_F32_GARBAGE", "not a number");
        assert_eq!(env_f32("GLIMPSE_TEST_F32_GARBAGE", 0.6), 0.6);
        std::env::remove_var("GLIMPSE_TEST_F32_GARBAGE");
    }

    #[test]
    fn test_env_u64_garbage_falls_back() {
        std::env::set_var("GLIMPSE_TEST_U64_GARBAGE", "-5");
        assert_eq!(env_u64("GLIMPSE_TEST_U64_GARBAGE", 100), 100);
        std::env::remove_var("GLIMPSE_TEST_U64_GARBAGE");
    }

    #[test]
    fn test_env_list_parsing() {
        assert_eq!(
            env_list("GLIMPSE_TEST_LIST_UNSET", &["jpeg", "png"]),
            vec!["jpeg", "png"]
        );

        std::env::set_var("GLIMPSE_TEST_LIST_SET", "bmp, webp,");
        assert_eq!(
            env_list("GLIMPSE_TEST_LIST_SET", &["jpeg"]),
            vec!["bmp", "webp"]
        );
        std::env::remove_var("GLIMPSE_TEST_LIST_SET");

        // All-blank value falls back rather than producing an empty list.
        std::env::set_var("GLIMPSE_TEST_LIST_BLANK", " , ");
        assert_eq!(env_list("GLIMPSE_TEST_LIST_BLANK", &["jpeg"]), vec!["jpeg"]);
        std::env::remove_var("GLIMPSE_TEST_LIST_BLANK");
    }

    // The GLIMPSE_* variables are process-global, so defaults and overrides
    // are exercised in one test to keep runs race-free under the parallel
    // test harness.
    #[test]
    fn test_from_env_defaults_and_override() {
        for key in [
            "GLIMPSE_CAMERA_DEVICE",
            "GLIMPSE_MODEL_DIR",
            "GLIMPSE_IMAGES_DIR",
            "GLIMPSE_MATCH_THRESHOLD",
            "GLIMPSE_TICK_PERIOD_MS",
            "GLIMPSE_IMAGE_EXTENSIONS",
        ] {
            std::env::remove_var(key);
        }

        let config = Config::from_env();
        assert_eq!(config.camera_device, "/dev/video0");
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(config.images_dir, PathBuf::from("labeled_images"));
        assert_eq!(config.match_threshold, glimpse_core::DEFAULT_MATCH_THRESHOLD);
        assert_eq!(config.tick_period_ms, 100);
        assert_eq!(config.image_extensions, vec!["jpeg", "jpg", "png"]);
        assert_eq!(config.tick_period(), Duration::from_millis(100));
        assert!(config.detector_model_path().ends_with("face_detector.onnx"));
        assert!(config.embedder_model_path().ends_with("face_embedder.onnx"));
        assert!(config.manifest_path().ends_with("manifest.json"));

        std::env::set_var("GLIMPSE_MATCH_THRESHOLD", "0.5");
        std::env::set_var("GLIMPSE_TICK_PERIOD_MS", "250");
        let config = Config::from_env();
        assert_eq!(config.match_threshold, 0.5);
        assert_eq!(config.tick_period_ms, 250);
        std::env::remove_var("GLIMPSE_MATCH_THRESHOLD");
        std::env::remove_var("GLIMPSE_TICK_PERIOD_MS");

        // Unparsable values fall back to defaults rather than failing.
        std::env::set_var("GLIMPSE_MATCH_THRESHOLD", "lenient");
        let config = Config::from_env();
        assert_eq!(config.match_threshold, glimpse_core::DEFAULT_MATCH_THRESHOLD);
        std::env::remove_var("GLIMPSE_MATCH_THRESHOLD");
    }
}
