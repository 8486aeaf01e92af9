use tracing::{debug, info};

use crate::crown_chin::{CrownChinEstimator, ProportionalEstimator};
use crate::detector::LandmarkDetector;
use crate::error::PppError;
use crate::eyes::EyeLandmarks;
use crate::face_detector::FaceLandmarks;
use crate::image_store::ImageStore;
use crate::landmarks::{LandMarks, Stage};
use crate::lips::LipLandmarks;

/// Runs the landmark stages in order (face, eyes, lips) and estimates crown
/// and chin when the caller did not supply them.
///
/// A failing stage aborts the run; later stages and the estimator are not
/// invoked.
pub struct LandmarkPipeline {
    pub(crate) face: Box<dyn LandmarkDetector>,
    pub(crate) eyes: Box<dyn LandmarkDetector>,
    pub(crate) lips: Box<dyn LandmarkDetector>,
    pub(crate) estimator: Box<dyn CrownChinEstimator>,
}

impl Default for LandmarkPipeline {
    fn default() -> Self {
        Self {
            face: Box::new(FaceLandmarks::default()),
            eyes: Box::new(EyeLandmarks::default()),
            lips: Box::new(LipLandmarks::default()),
            estimator: Box::new(ProportionalEstimator::default()),
        }
    }
}

impl LandmarkPipeline {
    /// Detect landmarks for the image stored under `image_id`, extending `seed`.
    pub fn detect(
        &self,
        store: &ImageStore,
        image_id: &str,
        seed: LandMarks,
    ) -> Result<LandMarks, PppError> {
        let image = store.get(image_id)?;
        let mut landmarks = seed;

        let stages: [(Stage, &dyn LandmarkDetector); 3] = [
            (Stage::Face, self.face.as_ref()),
            (Stage::Eyes, self.eyes.as_ref()),
            (Stage::Lips, self.lips.as_ref()),
        ];
        for (stage, detector) in stages {
            if !detector.detect_landmarks(&image, &mut landmarks) {
                info!(image_id, %stage, "landmark detection failed");
                return Err(PppError::DetectionFailed(stage));
            }
            landmarks.mark(stage);
            debug!(image_id, %stage, "stage complete");
        }

        if landmarks.has(Stage::CrownChin) {
            debug!(image_id, "crown and chin supplied, skipping estimation");
        } else {
            self.estimator.estimate(&mut landmarks)?;
            landmarks.mark(Stage::CrownChin);
        }

        Ok(landmarks)
    }
}
