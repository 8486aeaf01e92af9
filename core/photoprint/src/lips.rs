use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::detector::{setting_f64, LandmarkDetector};
use crate::error::PppError;
use crate::geometry::{Point, Rect};
use crate::landmarks::{LandMarks, Stage};

/// Mouth search box as fractions of the face box: (x, y, width, height).
const MOUTH_BOX: (f64, f64, f64, f64) = (0.20, 0.62, 0.60, 0.30);

/// Fewest mask columns accepted as a mouth.
const MIN_MOUTH_COLUMNS: usize = 3;

/// Lips stage: thresholds lip redness inside the mouth search box and reads
/// corners, centres and both lip contours from the resulting mask.
///
/// Requires the face stage to have run.
pub struct LipLandmarks {
    min_contrast: i32,
}

impl Default for LipLandmarks {
    fn default() -> Self {
        Self { min_contrast: 30 }
    }
}

pub(crate) fn mouth_search_rect(face: &Rect) -> Rect {
    let (fx, fy) = (face.x as f64, face.y as f64);
    let (w, h) = (face.width as f64, face.height as f64);
    let (bx, by, bw, bh) = MOUTH_BOX;
    Rect::from_bounds(fx + bx * w, fy + by * h, bw * w, bh * h)
}

fn redness(rgb: &RgbImage, x: u32, y: u32) -> i32 {
    let [r, g, b] = rgb.get_pixel(x, y).0;
    r as i32 - (g as i32 + b as i32) / 2
}

/// Top and bottom mask rows for every column of `rect` that contains lip pixels.
struct LipColumn {
    x: u32,
    top: u32,
    bottom: u32,
}

impl LipLandmarks {
    fn lip_columns(&self, rgb: &RgbImage, rect: &Rect) -> Option<Vec<LipColumn>> {
        let rect = rect.clip(rgb.width(), rgb.height())?;
        let (x0, y0) = (rect.x as u32, rect.y as u32);
        let (x1, y1) = (x0 + rect.width, y0 + rect.height);

        let (mut min, mut max) = (i32::MAX, i32::MIN);
        for y in y0..y1 {
            for x in x0..x1 {
                let r = redness(rgb, x, y);
                min = min.min(r);
                max = max.max(r);
            }
        }
        if max - min < self.min_contrast {
            return None;
        }
        let threshold = (min + max) / 2;

        let columns: Vec<LipColumn> = (x0..x1)
            .filter_map(|x| {
                let mut rows = (y0..y1).filter(|&y| redness(rgb, x, y) > threshold);
                let top = rows.next()?;
                let bottom = rows.last().unwrap_or(top);
                Some(LipColumn { x, top, bottom })
            })
            .collect();

        (columns.len() >= MIN_MOUTH_COLUMNS).then_some(columns)
    }
}

impl LandmarkDetector for LipLandmarks {
    fn detect_landmarks(&self, image: &DynamicImage, landmarks: &mut LandMarks) -> bool {
        if !landmarks.has(Stage::Face) || landmarks.face_rect.is_empty() {
            return false;
        }

        let rgb = image.to_rgb8();
        let mouth_rect = mouth_search_rect(&landmarks.face_rect);
        let Some(columns) = self.lip_columns(&rgb, &mouth_rect) else {
            debug!(?mouth_rect, "lips not found");
            return false;
        };

        let mid_row = |c: &LipColumn| (c.top + c.bottom) as f64 / 2.0;
        let (first, last) = (&columns[0], &columns[columns.len() - 1]);
        let centre_x = (first.x + last.x) as f64 / 2.0;
        let centre = columns
            .iter()
            .min_by(|a, b| {
                let da = (a.x as f64 - centre_x).abs();
                let db = (b.x as f64 - centre_x).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(first);

        landmarks.mouth_rect = mouth_rect;
        landmarks.lip_left_corner = Point::new(first.x as f64, mid_row(first));
        landmarks.lip_right_corner = Point::new(last.x as f64, mid_row(last));
        landmarks.lip_upper_center = Point::new(centre.x as f64, centre.top as f64);
        landmarks.lip_lower_center = Point::new(centre.x as f64, centre.bottom as f64);
        landmarks.upper_lip_contour = columns
            .iter()
            .map(|c| Point::new(c.x as f64, c.top as f64))
            .collect();
        landmarks.lower_lip_contour = columns
            .iter()
            .map(|c| Point::new(c.x as f64, c.bottom as f64))
            .collect();

        debug!(
            left = ?landmarks.lip_left_corner,
            right = ?landmarks.lip_right_corner,
            "lips found"
        );
        true
    }

    fn validate_settings(&self, settings: &serde_json::Value) -> Result<(), PppError> {
        min_contrast_setting(settings).map(|_| ())
    }

    fn configure(&mut self, settings: &serde_json::Value) -> Result<(), PppError> {
        if let Some(contrast) = min_contrast_setting(settings)? {
            self.min_contrast = contrast;
        }
        Ok(())
    }
}

fn min_contrast_setting(settings: &serde_json::Value) -> Result<Option<i32>, PppError> {
    match setting_f64(settings, "minContrast")? {
        Some(contrast) if contrast < 0.0 => Err(PppError::ConfigError(format!(
            "lips `minContrast` must not be negative, got {contrast}"
        ))),
        contrast => Ok(contrast.map(|contrast| contrast as i32)),
    }
}
