use image::{DynamicImage, GrayImage};
use tracing::debug;

use crate::detector::{setting_f64, LandmarkDetector};
use crate::error::PppError;
use crate::geometry::{Point, Rect};
use crate::landmarks::{LandMarks, Stage};

/// Vertical band of the face box searched for eyes, as fractions of its height.
const EYE_BAND_TOP: f64 = 0.20;
const EYE_BAND_HEIGHT: f64 = 0.30;

/// Horizontal placement of each eye search box, as fractions of the face width.
const LEFT_EYE_X: f64 = 0.10;
const RIGHT_EYE_X: f64 = 0.52;
const EYE_WIDTH: f64 = 0.38;

/// Eyes stage: searches both eye regions of the face box and takes the
/// centroid of the darkest pixels in each as the pupil.
///
/// Requires the face stage to have run.
pub struct EyeLandmarks {
    min_contrast: u8,
}

impl Default for EyeLandmarks {
    fn default() -> Self {
        Self { min_contrast: 24 }
    }
}

/// Eye search boxes (left, right) for a face box.
pub(crate) fn eye_search_rects(face: &Rect) -> (Rect, Rect) {
    let (fx, fy) = (face.x as f64, face.y as f64);
    let (w, h) = (face.width as f64, face.height as f64);
    let top = fy + EYE_BAND_TOP * h;
    let height = EYE_BAND_HEIGHT * h;
    (
        Rect::from_bounds(fx + LEFT_EYE_X * w, top, EYE_WIDTH * w, height),
        Rect::from_bounds(fx + RIGHT_EYE_X * w, top, EYE_WIDTH * w, height),
    )
}

impl EyeLandmarks {
    fn locate_pupil(&self, gray: &GrayImage, rect: &Rect) -> Option<Point> {
        let rect = rect.clip(gray.width(), gray.height())?;
        let (x0, y0) = (rect.x as u32, rect.y as u32);
        let pixels = || {
            (y0..y0 + rect.height)
                .flat_map(move |y| (x0..x0 + rect.width).map(move |x| (x, y)))
                .map(|(x, y)| (x, y, gray.get_pixel(x, y).0[0]))
        };

        let (min, max) = pixels().fold((u8::MAX, u8::MIN), |(lo, hi), (_, _, v)| {
            (lo.min(v), hi.max(v))
        });
        if max.saturating_sub(min) < self.min_contrast {
            return None;
        }

        let cutoff = min as u16 + (max - min) as u16 / 8;
        let (mut sum_x, mut sum_y, mut count) = (0.0, 0.0, 0usize);
        for (x, y, v) in pixels() {
            if v as u16 <= cutoff {
                sum_x += x as f64;
                sum_y += y as f64;
                count += 1;
            }
        }
        (count > 0).then(|| Point::new(sum_x / count as f64, sum_y / count as f64))
    }
}

impl LandmarkDetector for EyeLandmarks {
    fn detect_landmarks(&self, image: &DynamicImage, landmarks: &mut LandMarks) -> bool {
        if !landmarks.has(Stage::Face) || landmarks.face_rect.is_empty() {
            return false;
        }

        let gray = image.to_luma8();
        let (left_rect, right_rect) = eye_search_rects(&landmarks.face_rect);
        let (Some(left), Some(right)) = (
            self.locate_pupil(&gray, &left_rect),
            self.locate_pupil(&gray, &right_rect),
        ) else {
            debug!(?left_rect, ?right_rect, "pupils not found");
            return false;
        };

        debug!(?left, ?right, "pupils found");
        landmarks.left_eye_rect = left_rect;
        landmarks.right_eye_rect = right_rect;
        landmarks.eye_left_pupil = left;
        landmarks.eye_right_pupil = right;
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

fn min_contrast_setting(settings: &serde_json::Value) -> Result<Option<u8>, PppError> {
    match setting_f64(settings, "minContrast")? {
        Some(contrast) if !(0.0..=255.0).contains(&contrast) => Err(PppError::ConfigError(format!(
            "eyes `minContrast` must be within 0..=255, got {contrast}"
        ))),
        contrast => Ok(contrast.map(|contrast| contrast as u8)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const SKIN: Rgb<u8> = Rgb([200, 160, 140]);

    fn face_with_pupils(pupils: &[(i64, i64)]) -> DynamicImage {
        let mut img = RgbImage::from_pixel(200, 200, SKIN);
        for &(cx, cy) in pupils {
            for y in cy - 4..=cy + 4 {
                for x in cx - 4..=cx + 4 {
                    if (x - cx).pow(2) + (y - cy).pow(2) <= 16 {
                        img.put_pixel(x as u32, y as u32, Rgb([20, 20, 20]));
                    }
                }
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    fn face_landmarks() -> LandMarks {
        let mut lm = LandMarks::default();
        lm.face_rect = Rect::new(0, 0, 200, 200);
        lm.mark(Stage::Face);
        lm
    }

    #[test]
    fn search_rects_sit_in_upper_face() {
        let (left, right) = eye_search_rects(&Rect::new(0, 0, 100, 100));
        assert_eq!(left, Rect::new(10, 20, 38, 30));
        assert_eq!(right, Rect::new(52, 20, 38, 30));
    }

    #[test]
    fn finds_pupil_centres() {
        let image = face_with_pupils(&[(60, 70), (140, 72)]);
        let mut lm = face_landmarks();
        assert!(EyeLandmarks::default().detect_landmarks(&image, &mut lm));
        assert!(lm.eye_left_pupil.distance(&Point::new(60.0, 70.0)) < 1e-9);
        assert!(lm.eye_right_pupil.distance(&Point::new(140.0, 72.0)) < 1e-9);
        assert!(!lm.left_eye_rect.is_empty());
    }

    #[test]
    fn flat_region_fails() {
        let image = face_with_pupils(&[]);
        let mut lm = face_landmarks();
        assert!(!EyeLandmarks::default().detect_landmarks(&image, &mut lm));
    }

    #[test]
    fn requires_face_stage() {
        let image = face_with_pupils(&[(60, 70), (140, 72)]);
        let mut lm = LandMarks::default();
        lm.face_rect = Rect::new(0, 0, 200, 200);
        assert!(!EyeLandmarks::default().detect_landmarks(&image, &mut lm));
    }

    #[test]
    fn rejects_out_of_range_contrast() {
        let mut eyes = EyeLandmarks::default();
        let settings = serde_json::json!({ "minContrast": 300 });
        assert!(matches!(eyes.configure(&settings), Err(PppError::ConfigError(_))));
    }

    #[test]
    fn validating_settings_does_not_apply_them() {
        let eyes = EyeLandmarks::default();
        assert!(eyes.validate_settings(&serde_json::json!({ "minContrast": 255 })).is_ok());
        assert!(matches!(
            eyes.validate_settings(&serde_json::json!({ "minContrast": -1 })),
            Err(PppError::ConfigError(_))
        ));
        assert_eq!(eyes.min_contrast, 24);
    }
}
