use std::fs::File;
use std::io::BufReader;

use tracing::info;

use crate::error::PppError;
use crate::face_detector::{FaceBounds, FaceDetector, MIN_SEETA_FACE_SIZE};

/// Face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The SeetaFace frontal model is read from disk once; each detection creates
/// a detector from a clone of the loaded model.
pub struct RustfaceDetector {
    model: rustface::Model,
    min_face_size: u32,
    score_threshold: f64,
}

impl RustfaceDetector {
    /// Load the SeetaFace model at `path`.
    pub fn from_path(path: &str) -> Result<Self, PppError> {
        let file = File::open(path)
            .map_err(|e| PppError::ConfigError(format!("cannot open face model {path}: {e}")))?;
        let model = rustface::read_model(BufReader::new(file))
            .map_err(|e| PppError::ConfigError(format!("cannot read face model {path}: {e}")))?;
        info!(path, "loaded SeetaFace model");
        Ok(Self {
            model,
            min_face_size: MIN_SEETA_FACE_SIZE,
            score_threshold: 2.0,
        })
    }

    /// Smallest face, in pixels, the detector looks for (default and minimum: 20).
    pub fn min_face_size(mut self, size: u32) -> Self {
        self.min_face_size = size.max(MIN_SEETA_FACE_SIZE);
        self
    }

    /// Minimum detection score (default: 2.0). Negative values become 0.
    pub fn score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold.max(0.0);
        self
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBounds> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(self.score_threshold);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(gray, width, height));

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBounds {
                    x: bbox.x() as f64,
                    y: bbox.y() as f64,
                    width: bbox.width() as f64,
                    height: bbox.height() as f64,
                    confidence: face.score(),
                }
            })
            .collect()
    }
}
