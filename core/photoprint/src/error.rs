use thiserror::Error;

use crate::landmarks::Stage;

/// Errors returned by photoprint operations.
#[derive(Debug, Error)]
pub enum PppError {
    /// Image bytes or base64 text could not be decoded.
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    /// No stored image has this id.
    #[error("image not found: {0}")]
    NotFound(String),

    /// A landmark stage found nothing.
    #[error("{0} detection failed")]
    DetectionFailed(Stage),

    /// Crown/chin estimation ran before eyes and lips were found.
    #[error("crown/chin estimation requires eye pupils and lip corners")]
    InsufficientLandmarks,

    /// The landmark geometry does not allow an estimate.
    #[error("crown/chin estimation failed: {0}")]
    EstimationFailed(String),

    /// A configuration document, request or setting is invalid.
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// The crop or the tiles do not fit.
    #[error("layout error: {0}")]
    LayoutError(String),

    /// The data is not a well-formed PNG stream.
    #[error("unsupported raster container: {0}")]
    FormatError(String),

    /// Encoding the output failed.
    #[error("failed to encode image: {0}")]
    EncodeError(String),
}

impl From<serde_json::Error> for PppError {
    fn from(e: serde_json::Error) -> Self {
        PppError::ConfigError(e.to_string())
    }
}
