use image::DynamicImage;
use tracing::{debug, warn};

use crate::detector::{setting_f64, LandmarkDetector};
use crate::error::PppError;
use crate::geometry::Rect;
use crate::landmarks::LandMarks;

/// Bounding box of a detected face within an image.
#[derive(Debug, Clone)]
pub struct FaceBounds {
    /// X coordinate of the top-left corner (pixels).
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
    /// Detection confidence score.
    pub confidence: f64,
}

/// Pluggable face detection backend.
///
/// Implement this trait to provide a custom face detector (ONNX, dlib, etc.)
/// and pass it to [`crate::PppEngine::face_detector`].
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a row-major grayscale buffer of `width` × `height` bytes.
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBounds>;
}

/// Face stage of the landmark pipeline: stores the most confident face as `face_rect`.
#[derive(Default)]
pub struct FaceLandmarks {
    detector: Option<Box<dyn FaceDetector>>,
}

impl FaceLandmarks {
    /// Face stage backed by `detector`.
    pub fn new(detector: Box<dyn FaceDetector>) -> Self {
        Self {
            detector: Some(detector),
        }
    }
}

impl LandmarkDetector for FaceLandmarks {
    fn detect_landmarks(&self, image: &DynamicImage, landmarks: &mut LandMarks) -> bool {
        let Some(detector) = self.detector.as_deref() else {
            warn!("no face detector configured");
            return false;
        };

        let gray = image.to_luma8();
        let faces = detector.detect(gray.as_raw(), gray.width(), gray.height());

        let Some(best) = faces.iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        }) else {
            debug!("no face found");
            return false;
        };

        let rect = Rect::from_bounds(best.x, best.y, best.width, best.height);
        let Some(rect) = rect.clip(gray.width(), gray.height()) else {
            debug!(?rect, "face lies outside the image");
            return false;
        };
        debug!(?rect, confidence = best.confidence, faces = faces.len(), "face found");
        landmarks.face_rect = rect;
        true
    }

    fn validate_settings(&self, settings: &serde_json::Value) -> Result<(), PppError> {
        model_settings(settings).map(|_| ())
    }

    #[cfg(feature = "rustface")]
    fn configure(&mut self, settings: &serde_json::Value) -> Result<(), PppError> {
        use crate::rustface_backend::RustfaceDetector;

        let settings = model_settings(settings)?;
        let Some(path) = settings.model_path else {
            return Ok(());
        };

        let mut detector = RustfaceDetector::from_path(path)?;
        if let Some(size) = settings.min_face_size {
            detector = detector.min_face_size(size);
        }
        if let Some(threshold) = settings.score_threshold {
            detector = detector.score_threshold(threshold);
        }
        self.detector = Some(Box::new(detector));
        Ok(())
    }

    #[cfg(not(feature = "rustface"))]
    fn configure(&mut self, settings: &serde_json::Value) -> Result<(), PppError> {
        model_settings(settings).map(|_| ())
    }
}

/// Smallest face, in pixels, the SeetaFace engine can look for.
pub(crate) const MIN_SEETA_FACE_SIZE: u32 = 20;

/// Face model settings: `modelPath`, `minFaceSize`, `scoreThreshold`.
///
/// `minFaceSize` and `scoreThreshold` only take effect together with
/// `modelPath`.
#[cfg_attr(not(feature = "rustface"), allow(dead_code))]
struct ModelSettings<'a> {
    model_path: Option<&'a str>,
    min_face_size: Option<u32>,
    score_threshold: Option<f64>,
}

fn model_settings(settings: &serde_json::Value) -> Result<ModelSettings<'_>, PppError> {
    let model_path = match settings.get("modelPath") {
        None | Some(serde_json::Value::Null) => None,
        Some(path) => Some(
            path.as_str()
                .ok_or_else(|| PppError::ConfigError("`modelPath` must be a string".into()))?,
        ),
    };
    if cfg!(not(feature = "rustface")) && model_path.is_some() {
        return Err(PppError::ConfigError(
            "`modelPath` requires the `rustface` feature".into(),
        ));
    }

    let min_face_size = match setting_f64(settings, "minFaceSize")? {
        None => None,
        Some(size)
            if size.fract() == 0.0
                && size >= MIN_SEETA_FACE_SIZE as f64
                && size <= u32::MAX as f64 =>
        {
            Some(size as u32)
        }
        Some(size) => {
            return Err(PppError::ConfigError(format!(
                "`minFaceSize` must be a whole number of at least {MIN_SEETA_FACE_SIZE}, got {size}"
            )))
        }
    };

    let score_threshold = match setting_f64(settings, "scoreThreshold")? {
        Some(threshold) if !(threshold.is_finite() && threshold >= 0.0) => {
            return Err(PppError::ConfigError(format!(
                "`scoreThreshold` must not be negative, got {threshold}"
            )))
        }
        threshold => threshold,
    };

    Ok(ModelSettings {
        model_path,
        min_face_size,
        score_threshold,
    })
}
