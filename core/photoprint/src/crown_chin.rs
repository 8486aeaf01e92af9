//! Crown and chin estimation from eye and mouth geometry.
//!
//! The head extent is modelled as proportional to a reference distance: the
//! eye separation plus the distance from the frown (between the pupils) to the
//! mouth centre. Chin and crown are placed along the facial vertical axis, the
//! direction from frown to mouth centre. The proportions were obtained as the
//! median ratios over a set of manually annotated photos.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PppError;
use crate::geometry::Point;
use crate::landmarks::{LandMarks, Stage};

/// Calibrated proportions relating facial geometry to head extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrownChinCoefficients {
    /// Chin-to-crown distance over the reference distance.
    pub chin_crown: f64,
    /// Chin-to-frown distance over the reference distance.
    pub chin_frown: f64,
}

impl Default for CrownChinCoefficients {
    fn default() -> Self {
        Self {
            chin_crown: 1.7699,
            chin_frown: 0.8945,
        }
    }
}

impl CrownChinCoefficients {
    /// Both proportions must be finite and positive.
    pub fn validate(&self) -> Result<(), PppError> {
        for (name, value) in [("chinCrown", self.chin_crown), ("chinFrown", self.chin_frown)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PppError::ConfigError(format!(
                    "`{name}` must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Derives crown and chin points for a record whose eyes and lips are known.
pub trait CrownChinEstimator: Send + Sync {
    /// Fill in `crown_point` and `chin_point` of `landmarks`. The pipeline marks
    /// the crown/chin stage complete when this succeeds.
    fn estimate(&self, landmarks: &mut LandMarks) -> Result<(), PppError>;

    /// Replace the model coefficients.
    ///
    /// Estimators without coefficients keep this default, which logs a warning
    /// and leaves the estimator unchanged.
    fn set_coefficients(&mut self, coefficients: CrownChinCoefficients) {
        warn!(
            chin_crown = coefficients.chin_crown,
            chin_frown = coefficients.chin_frown,
            "estimator does not use crown/chin coefficients, ignoring them"
        );
    }
}

/// Proportional crown/chin model for upright, front-facing photos.
#[derive(Debug, Clone, Default)]
pub struct ProportionalEstimator {
    coefficients: CrownChinCoefficients,
}

impl ProportionalEstimator {
    /// Estimator using `coefficients` instead of the calibrated defaults.
    pub fn new(coefficients: CrownChinCoefficients) -> Self {
        Self { coefficients }
    }

    /// Coefficients currently in use.
    pub fn coefficients(&self) -> CrownChinCoefficients {
        self.coefficients
    }
}

impl CrownChinEstimator for ProportionalEstimator {
    fn estimate(&self, landmarks: &mut LandMarks) -> Result<(), PppError> {
        if !landmarks.has(Stage::Eyes) || !landmarks.has(Stage::Lips) {
            return Err(PppError::InsufficientLandmarks);
        }

        let frown = landmarks.eye_left_pupil.midpoint(&landmarks.eye_right_pupil);
        let mouth = landmarks.lip_left_corner.midpoint(&landmarks.lip_right_corner);
        let eye_distance = landmarks.eye_left_pupil.distance(&landmarks.eye_right_pupil);
        let frown_mouth = frown.distance(&mouth);
        if frown_mouth <= f64::EPSILON {
            return Err(PppError::EstimationFailed(
                "mouth centre coincides with the eyes".into(),
            ));
        }

        let ref_dist = eye_distance + frown_mouth;
        let axis: Point = (mouth - frown) * (1.0 / frown_mouth);
        let chin = frown + axis * (self.coefficients.chin_frown * ref_dist);
        let crown = chin - axis * (self.coefficients.chin_crown * ref_dist);
        if !chin.is_finite() || !crown.is_finite() {
            return Err(PppError::EstimationFailed(
                "landmark coordinates are not finite".into(),
            ));
        }

        debug!(?crown, ?chin, ref_dist, "estimated crown and chin");
        landmarks.crown_point = crown;
        landmarks.chin_point = chin;
        landmarks.mark(Stage::CrownChin);
        Ok(())
    }

    fn set_coefficients(&mut self, coefficients: CrownChinCoefficients) {
        self.coefficients = coefficients;
    }
}
