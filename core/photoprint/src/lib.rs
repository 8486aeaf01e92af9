//! Passport photo prints: detect facial landmarks, estimate crown and chin,
//! and lay out corrected identity photos on a printable sheet.
//!
//! # Example
//!
//! ```no_run
//! use photoprint::{FaceBounds, FaceDetector, PppEngine};
//!
//! struct MyDetector;
//! impl FaceDetector for MyDetector {
//!     fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBounds> {
//!         // Your detection logic here
//!         vec![]
//!     }
//! }
//!
//! let engine = PppEngine::new().face_detector(Box::new(MyDetector));
//! let id = engine.set_image(&std::fs::read("photo.jpg").unwrap()).unwrap();
//! let landmarks = engine.detect_landmarks(&id).unwrap();
//!
//! let request = format!(
//!     r#"{{
//!         "standard": {{"outputWidth": 413, "outputHeight": 531, "headHeightRatio": 0.7}},
//!         "canvas": {{"width": 152.4, "height": 101.6, "resolution": 11.811}},
//!         "crownPoint": {{"x": {}, "y": {}}},
//!         "chinPoint": {{"x": {}, "y": {}}}
//!     }}"#,
//!     landmarks.crown_point.x,
//!     landmarks.crown_point.y,
//!     landmarks.chin_point.x,
//!     landmarks.chin_point.y,
//! );
//! let png = engine.create_tiled_print(&id, &request).unwrap();
//! std::fs::write("print.png", png).unwrap();
//! ```

#![warn(missing_docs)]

mod compose;
mod config;
mod crop;
/// Crown and chin estimation.
pub mod crown_chin;
mod data_uri;
/// Landmark detector trait shared by the pipeline stages.
pub mod detector;
mod engine;
mod error;
mod eyes;
/// Face detection traits and data types.
pub mod face_detector;
mod geometry;
mod image_store;
mod landmarks;
mod lips;
mod pipeline;
mod png_resolution;
#[cfg(feature = "rustface")]
/// Built-in SeetaFace-based face detector backend.
pub mod rustface_backend;
mod standard;

pub use compose::{compose, correct_photo, TileGrid, TILE_MARGIN_PX};
pub use config::{DetectorSettings, EngineConfig};
pub use crop::{head_crop, CropRegion};
pub use crown_chin::{CrownChinCoefficients, CrownChinEstimator, ProportionalEstimator};
pub use data_uri::decode_image_text;
pub use detector::LandmarkDetector;
pub use engine::{PppEngine, TiledPrintRequest};
/// Error type returned by photoprint operations.
pub use error::PppError;
pub use eyes::EyeLandmarks;
/// Face detection trait and face bounding-box type.
pub use face_detector::{FaceBounds, FaceDetector, FaceLandmarks};
pub use geometry::{Point, Rect};
pub use image_store::{fingerprint, ImageStore, DEFAULT_STORE_SIZE};
pub use landmarks::{LandMarks, Rotation, Stage};
pub use lips::LipLandmarks;
pub use pipeline::LandmarkPipeline;
pub use png_resolution::set_png_resolution;
#[cfg(feature = "rustface")]
/// Built-in SeetaFace detector, loaded from a model file.
pub use rustface_backend::RustfaceDetector;
pub use standard::{
    CanvasDefinition, PhotoStandard, Units, MAX_CANVAS_PIXELS, MAX_PHOTO_PIXELS,
};
