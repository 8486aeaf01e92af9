use serde::Deserialize;

use crate::crown_chin::CrownChinCoefficients;
use crate::error::PppError;

/// Engine configuration document.
///
/// Every section is optional; sections left out keep their current values.
///
/// ```json
/// {
///   "imageStoreSize": 10,
///   "crownChinCoefficients": { "chinCrown": 1.7699, "chinFrown": 0.8945 },
///   "detectorSettings": { "face": { "modelPath": "seeta_fd_frontal_v1.0.bin" } }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Number of decoded images kept in the store.
    pub image_store_size: Option<usize>,
    /// Proportions used by the crown/chin estimator.
    pub crown_chin_coefficients: Option<CrownChinCoefficients>,
    /// Settings handed to each detection stage.
    #[serde(default)]
    pub detector_settings: DetectorSettings,
}

/// Opaque per-detector settings, interpreted by each detector.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorSettings {
    /// Face stage, e.g. `modelPath`, `minFaceSize`, `scoreThreshold`.
    pub face: Option<serde_json::Value>,
    /// Eyes stage, e.g. `minContrast` (0..=255).
    pub eyes: Option<serde_json::Value>,
    /// Lips stage, e.g. `minContrast`.
    pub lips: Option<serde_json::Value>,
}

impl EngineConfig {
    /// Parse and validate a configuration document.
    pub fn from_json(json: &str) -> Result<Self, PppError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the store size and coefficients. Detector settings are checked
    /// by the detectors themselves.
    pub fn validate(&self) -> Result<(), PppError> {
        if self.image_store_size == Some(0) {
            return Err(PppError::ConfigError(
                "`imageStoreSize` must be at least 1".into(),
            ));
        }
        if let Some(coefficients) = &self.crown_chin_coefficients {
            coefficients.validate()?;
        }
        Ok(())
    }
}
