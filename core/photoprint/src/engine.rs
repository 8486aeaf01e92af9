use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use tracing::{debug, info};

use crate::compose::{compose, encode_png};
use crate::config::EngineConfig;
use crate::crown_chin::{CrownChinCoefficients, CrownChinEstimator};
use crate::data_uri::decode_image_text;
use crate::detector::LandmarkDetector;
use crate::error::PppError;
use crate::face_detector::{FaceDetector, FaceLandmarks};
use crate::geometry::Point;
use crate::image_store::ImageStore;
use crate::landmarks::LandMarks;
use crate::pipeline::LandmarkPipeline;
use crate::png_resolution::set_png_resolution;
use crate::standard::{CanvasDefinition, PhotoStandard};

/// Parameters of a tiled print.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TiledPrintRequest {
    /// Output photo format.
    pub standard: PhotoStandard,
    /// Print sheet.
    pub canvas: CanvasDefinition,
    /// Crown of the head in source image pixels.
    pub crown_point: Point,
    /// Chin in source image pixels.
    pub chin_point: Point,
    /// Return the base64 text of the PNG instead of the PNG itself.
    #[serde(default)]
    pub as_base64: bool,
}

impl TiledPrintRequest {
    /// Parse and validate a request document.
    pub fn from_json(json: &str) -> Result<Self, PppError> {
        let request: TiledPrintRequest = serde_json::from_str(json)?;
        request.validate()?;
        Ok(request)
    }

    /// Check the standard, the canvas and both points.
    pub fn validate(&self) -> Result<(), PppError> {
        self.standard.validate()?;
        self.canvas.validate()?;
        if !self.crown_point.is_finite() || !self.chin_point.is_finite() {
            return Err(PppError::ConfigError(
                "crown and chin points must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Passport photo print engine.
///
/// Holds the image store and the landmark pipeline. Every operation takes
/// `&self` apart from configuration, so one engine can serve concurrent
/// requests.
///
/// ```no_run
/// use photoprint::PppEngine;
///
/// let engine = PppEngine::new();
/// let id = engine.set_image(&std::fs::read("photo.jpg").unwrap()).unwrap();
/// let landmarks = engine.detect_landmarks(&id).unwrap();
/// println!("crown at {:?}", landmarks.crown_point);
/// ```
#[derive(Default)]
pub struct PppEngine {
    store: ImageStore,
    pipeline: LandmarkPipeline,
}

impl PppEngine {
    /// Engine with the default store size and built-in stages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `detector` to find faces.
    ///
    /// Without one (and without a `modelPath` for the `rustface` feature) the
    /// face stage, and with it landmark detection, always fails.
    pub fn face_detector(mut self, detector: Box<dyn FaceDetector>) -> Self {
        self.pipeline.face = Box::new(FaceLandmarks::new(detector));
        self
    }

    /// Replace the built-in eyes stage.
    pub fn eyes_detector(mut self, detector: Box<dyn LandmarkDetector>) -> Self {
        self.pipeline.eyes = detector;
        self
    }

    /// Replace the built-in lips stage.
    pub fn lips_detector(mut self, detector: Box<dyn LandmarkDetector>) -> Self {
        self.pipeline.lips = detector;
        self
    }

    /// Replace the proportional crown/chin model.
    pub fn crown_chin_estimator(mut self, estimator: Box<dyn CrownChinEstimator>) -> Self {
        self.pipeline.estimator = estimator;
        self
    }

    /// Apply a JSON configuration document. See [`EngineConfig`].
    pub fn configure(&mut self, json: &str) -> Result<(), PppError> {
        self.configure_with(EngineConfig::from_json(json)?)
    }

    /// Apply a parsed configuration.
    ///
    /// Every setting is checked before any is applied, so a rejected document
    /// leaves the engine as it was. The face stage is configured first: loading
    /// its model is the one step that can still fail after validation.
    pub fn configure_with(&mut self, config: EngineConfig) -> Result<(), PppError> {
        config.validate()?;

        let settings = &config.detector_settings;
        let stages: [(&dyn LandmarkDetector, &Option<serde_json::Value>); 3] = [
            (self.pipeline.face.as_ref(), &settings.face),
            (self.pipeline.eyes.as_ref(), &settings.eyes),
            (self.pipeline.lips.as_ref(), &settings.lips),
        ];
        for (detector, stage_settings) in stages {
            if let Some(stage_settings) = stage_settings {
                detector.validate_settings(stage_settings)?;
            }
        }

        if let Some(face) = &settings.face {
            self.pipeline.face.configure(face)?;
        }
        if let Some(eyes) = &settings.eyes {
            self.pipeline.eyes.configure(eyes)?;
        }
        if let Some(lips) = &settings.lips {
            self.pipeline.lips.configure(lips)?;
        }
        if let Some(coefficients) = config.crown_chin_coefficients {
            self.set_crown_chin_coefficients(coefficients);
        }
        if let Some(size) = config.image_store_size {
            self.store.configure(size);
        }

        info!(
            image_store_size = self.store.capacity(),
            "engine configured"
        );
        Ok(())
    }

    fn set_crown_chin_coefficients(&mut self, coefficients: CrownChinCoefficients) {
        debug!(
            chin_crown = coefficients.chin_crown,
            chin_frown = coefficients.chin_frown,
            "crown/chin coefficients"
        );
        self.pipeline.estimator.set_coefficients(coefficients);
    }

    /// Decode and store an encoded image, returning its id.
    pub fn set_image(&self, bytes: &[u8]) -> Result<String, PppError> {
        let id = self.store.put(bytes)?;
        info!(image_id = %id, size = bytes.len(), "image stored");
        Ok(id)
    }

    /// Store an image given as base64 text, optionally behind a data URI prefix.
    pub fn set_image_data_uri(&self, text: &str) -> Result<String, PppError> {
        let bytes = decode_image_text(text)?;
        self.set_image(&bytes)
    }

    /// Detect face, eyes and lips and estimate crown and chin.
    pub fn detect_landmarks(&self, image_id: &str) -> Result<LandMarks, PppError> {
        self.detect_landmarks_with(image_id, LandMarks::default())
    }

    /// Like [`PppEngine::detect_landmarks`], starting from `seed`.
    ///
    /// A seed built with [`LandMarks::with_crown_chin`] keeps its crown and
    /// chin points.
    pub fn detect_landmarks_with(
        &self,
        image_id: &str,
        seed: LandMarks,
    ) -> Result<LandMarks, PppError> {
        let landmarks = self.pipeline.detect(&self.store, image_id, seed)?;
        info!(
            image_id,
            crown = ?landmarks.crown_point,
            chin = ?landmarks.chin_point,
            "landmarks detected"
        );
        Ok(landmarks)
    }

    /// Detect landmarks and serialize them as camelCase JSON.
    pub fn detect_landmarks_json(&self, image_id: &str) -> Result<String, PppError> {
        let landmarks = self.detect_landmarks(image_id)?;
        landmarks
            .to_json()
            .map_err(|e| PppError::EncodeError(e.to_string()))
    }

    /// Build a print sheet from a JSON [`TiledPrintRequest`].
    pub fn create_tiled_print(
        &self,
        image_id: &str,
        request_json: &str,
    ) -> Result<Vec<u8>, PppError> {
        let request = TiledPrintRequest::from_json(request_json)?;
        self.create_tiled_print_with(image_id, &request)
    }

    /// Build a print sheet: PNG bytes carrying the canvas resolution, or their
    /// base64 text when `as_base64` is set.
    pub fn create_tiled_print_with(
        &self,
        image_id: &str,
        request: &TiledPrintRequest,
    ) -> Result<Vec<u8>, PppError> {
        request.validate()?;
        let image = self.store.get(image_id)?;

        let sheet = compose(
            &image,
            &request.standard,
            &request.canvas,
            request.crown_point,
            request.chin_point,
        )?;
        let png = encode_png(&sheet)?;
        let png = set_png_resolution(&png, request.canvas.resolution_ppmm())?;
        info!(
            image_id,
            width = sheet.width(),
            height = sheet.height(),
            bytes = png.len(),
            "tiled print created"
        );

        if request.as_base64 {
            Ok(STANDARD.encode(&png).into_bytes())
        } else {
            Ok(png)
        }
    }

    /// The decoded-image cache.
    pub fn image_store(&self) -> &ImageStore {
        &self.store
    }
}
