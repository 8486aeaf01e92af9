use serde::Deserialize;

use crate::error::PppError;
use crate::png_resolution::MAX_PIXELS_PER_METRE;

/// Largest corrected photo accepted, in pixels (a 5000x5000 photo).
pub const MAX_PHOTO_PIXELS: u64 = 25_000_000;

/// Largest print sheet accepted, in pixels (an A3 sheet at 600 dpi fits).
pub const MAX_CANVAS_PIXELS: u64 = 100_000_000;

/// Output size and head proportion required by a class of identity photo.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoStandard {
    /// Display name, e.g. `"US passport"`.
    #[serde(default)]
    pub name: Option<String>,
    /// Width of the corrected photo in pixels.
    pub output_width: u32,
    /// Height of the corrected photo in pixels.
    pub output_height: u32,
    /// Crown-to-chin distance as a fraction of `output_height`.
    pub head_height_ratio: f64,
    /// Vertical position of the crown/chin midpoint as a fraction of
    /// `output_height`, measured from the top. Defaults to 0.5.
    #[serde(default)]
    pub head_center_ratio: Option<f64>,
}

impl PhotoStandard {
    /// Parse and validate a standard from JSON.
    pub fn from_json(json: &str) -> Result<Self, PppError> {
        let standard: PhotoStandard = serde_json::from_str(json)?;
        standard.validate()?;
        Ok(standard)
    }

    /// Parse and validate a standard from an already parsed JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, PppError> {
        let standard = PhotoStandard::deserialize(value)?;
        standard.validate()?;
        Ok(standard)
    }

    /// Check the output size and ratios.
    pub fn validate(&self) -> Result<(), PppError> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err(PppError::ConfigError(format!(
                "photo standard output size must be positive, got {}x{}",
                self.output_width, self.output_height
            )));
        }
        let pixels = self.output_width as u64 * self.output_height as u64;
        if pixels > MAX_PHOTO_PIXELS {
            return Err(PppError::ConfigError(format!(
                "photo standard output {}x{} exceeds {MAX_PHOTO_PIXELS} pixels",
                self.output_width, self.output_height
            )));
        }
        unit_ratio("headHeightRatio", self.head_height_ratio)?;
        if let Some(ratio) = self.head_center_ratio {
            unit_ratio("headCenterRatio", ratio)?;
        }
        Ok(())
    }

    /// Required crown-to-chin distance in output pixels.
    pub fn head_height_px(&self) -> f64 {
        self.head_height_ratio * self.output_height as f64
    }

    /// Vertical anchor of the crown/chin midpoint, 0.5 unless set.
    pub fn head_center_ratio(&self) -> f64 {
        self.head_center_ratio.unwrap_or(0.5)
    }
}

fn unit_ratio(name: &str, value: f64) -> Result<(), PppError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(PppError::ConfigError(format!(
            "`{name}` must lie strictly between 0 and 1, got {value}"
        )))
    }
}

/// Physical length unit used by a canvas definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Millimetres.
    #[default]
    Mm,
    /// Centimetres.
    Cm,
    /// Inches; `"in"` is accepted too.
    #[serde(alias = "in")]
    Inch,
}

impl Units {
    fn millimetres(self) -> f64 {
        match self {
            Units::Mm => 1.0,
            Units::Cm => 10.0,
            Units::Inch => 25.4,
        }
    }
}

/// Printable sheet: physical size and print resolution.
///
/// `width`, `height` and `resolution` (pixels per unit) are expressed in
/// `units`, millimetres unless stated otherwise.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasDefinition {
    /// Display name, e.g. `"4x6"`.
    #[serde(default)]
    pub name: Option<String>,
    /// Sheet width in `units`.
    pub width: f64,
    /// Sheet height in `units`.
    pub height: f64,
    /// Pixels per `units`.
    pub resolution: f64,
    /// Unit of the three values above.
    #[serde(default)]
    pub units: Units,
}

impl CanvasDefinition {
    /// Parse and validate a canvas from JSON.
    pub fn from_json(json: &str) -> Result<Self, PppError> {
        let canvas: CanvasDefinition = serde_json::from_str(json)?;
        canvas.validate()?;
        Ok(canvas)
    }

    /// Parse and validate a canvas from an already parsed JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, PppError> {
        let canvas = CanvasDefinition::deserialize(value)?;
        canvas.validate()?;
        Ok(canvas)
    }

    /// Check that size and resolution are positive, the resolution fits a PNG
    /// `pHYs` chunk, and the sheet is not larger than [`MAX_CANVAS_PIXELS`].
    pub fn validate(&self) -> Result<(), PppError> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("resolution", self.resolution),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PppError::ConfigError(format!(
                    "canvas `{name}` must be a positive number, got {value}"
                )));
            }
        }
        let pixels_per_metre = (self.resolution_ppmm() * 1000.0).round();
        if !(1.0..=f64::from(MAX_PIXELS_PER_METRE)).contains(&pixels_per_metre) {
            return Err(PppError::ConfigError(format!(
                "canvas resolution of {pixels_per_metre} px/m is outside 1..={MAX_PIXELS_PER_METRE}"
            )));
        }
        self.pixel_size().map(|_| ())
    }

    /// Sheet width in millimetres.
    pub fn width_mm(&self) -> f64 {
        self.width * self.units.millimetres()
    }

    /// Sheet height in millimetres.
    pub fn height_mm(&self) -> f64 {
        self.height * self.units.millimetres()
    }

    /// Print resolution in pixels per millimetre.
    pub fn resolution_ppmm(&self) -> f64 {
        self.resolution / self.units.millimetres()
    }

    /// Sheet size in pixels, rounded to the nearest pixel.
    ///
    /// Fails with [`PppError::ConfigError`] when the sheet is under one pixel
    /// on a side or holds more than [`MAX_CANVAS_PIXELS`].
    pub fn pixel_size(&self) -> Result<(u32, u32), PppError> {
        let ppmm = self.resolution_ppmm();
        let (width, height) = (
            (self.width_mm() * ppmm).round(),
            (self.height_mm() * ppmm).round(),
        );
        if !(width >= 1.0 && height >= 1.0) || width * height > MAX_CANVAS_PIXELS as f64 {
            return Err(PppError::ConfigError(format!(
                "canvas of {width}x{height} px must hold between 1 and {MAX_CANVAS_PIXELS} pixels"
            )));
        }
        // Both sides are at most MAX_CANVAS_PIXELS here.
        Ok((width as u32, height as u32))
    }
}
