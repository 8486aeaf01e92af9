use image::DynamicImage;

use crate::error::PppError;
use crate::landmarks::LandMarks;

/// One landmark family of the detection pipeline (face, eyes or lips).
///
/// Implementations fill in their own subset of the [`LandMarks`] fields and
/// return `false` when they cannot. The pipeline records stage completion, so
/// detectors never need to mark the record themselves.
pub trait LandmarkDetector: Send + Sync {
    /// Detect landmarks in `image`, writing them into `landmarks`.
    fn detect_landmarks(&self, image: &DynamicImage, landmarks: &mut LandMarks) -> bool;

    /// Check detector specific settings without applying them.
    ///
    /// The engine validates every detector's settings before configuring any
    /// of them. Settings accepted here must not make
    /// [`LandmarkDetector::configure`] fail, short of an I/O error such as an
    /// unreadable model file.
    fn validate_settings(&self, _settings: &serde_json::Value) -> Result<(), PppError> {
        Ok(())
    }

    /// Apply detector specific settings from the engine configuration.
    fn configure(&mut self, _settings: &serde_json::Value) -> Result<(), PppError> {
        Ok(())
    }
}

/// Read an optional numeric setting, rejecting values of the wrong type.
pub(crate) fn setting_f64(
    settings: &serde_json::Value,
    key: &str,
) -> Result<Option<f64>, PppError> {
    match settings.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| PppError::ConfigError(format!("`{key}` must be a number"))),
    }
}
