use crate::error::PppError;
use crate::geometry::Point;
use crate::standard::PhotoStandard;

/// How far, in source pixels, a crop may overhang the image before it is
/// rejected. Absorbs rounding of the crop rectangle.
const BOUNDS_TOLERANCE: f64 = 0.5;

/// Crop region within the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in source pixels.
    pub width: u32,
    /// Height in source pixels.
    pub height: u32,
}

/// Calculate the source region that, once resized to the standard's output
/// size, gives the required head height.
///
/// The crown/chin midpoint lands on the horizontal centre of the output and at
/// `head_center_ratio` of its height.
pub fn head_crop(
    source_width: u32,
    source_height: u32,
    crown: Point,
    chin: Point,
    standard: &PhotoStandard,
) -> Result<CropRegion, PppError> {
    if source_width == 0 || source_height == 0 {
        return Err(PppError::LayoutError("source image is empty".into()));
    }

    let head_height = crown.distance(&chin);
    if !head_height.is_finite() || head_height < 1.0 {
        return Err(PppError::LayoutError(format!(
            "crown and chin are too close together ({head_height:.2} px)"
        )));
    }

    // Output pixels per source pixel
    let scale = standard.head_height_px() / head_height;
    let crop_w = standard.output_width as f64 / scale;
    let crop_h = standard.output_height as f64 / scale;

    let center = crown.midpoint(&chin);
    let left = center.x - crop_w / 2.0;
    let top = center.y - crop_h * standard.head_center_ratio();

    let (src_w, src_h) = (source_width as f64, source_height as f64);
    if left < -BOUNDS_TOLERANCE
        || top < -BOUNDS_TOLERANCE
        || left + crop_w > src_w + BOUNDS_TOLERANCE
        || top + crop_h > src_h + BOUNDS_TOLERANCE
    {
        return Err(PppError::LayoutError(format!(
            "photo needs a {crop_w:.0}x{crop_h:.0} crop at ({left:.0}, {top:.0}) \
             which exceeds the {source_width}x{source_height} source"
        )));
    }

    let x = (left.round().max(0.0) as u32).min(source_width.saturating_sub(1));
    let y = (top.round().max(0.0) as u32).min(source_height.saturating_sub(1));
    let width = (crop_w.round() as u32).clamp(1, source_width - x);
    let height = (crop_h.round() as u32).clamp(1, source_height - y);

    Ok(CropRegion {
        x,
        y,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard(width: u32, height: u32, ratio: f64) -> PhotoStandard {
        PhotoStandard {
            name: None,
            output_width: width,
            output_height: height,
            head_height_ratio: ratio,
            head_center_ratio: None,
        }
    }

    #[test]
    fn centred_head_crop() {
        // Head of 100 px must become 50% of a 400 px output: scale 2.
        let crop = head_crop(
            1000,
            1000,
            Point::new(500.0, 450.0),
            Point::new(500.0, 550.0),
            &standard(300, 400, 0.5),
        )
        .unwrap();
        assert_eq!(
            crop,
            CropRegion {
                x: 425,
                y: 400,
                width: 150,
                height: 200
            }
        );
    }

    #[test]
    fn head_center_ratio_moves_crop() {
        let mut standard = standard(300, 400, 0.5);
        standard.head_center_ratio = Some(0.25);
        let crop = head_crop(
            1000,
            1000,
            Point::new(500.0, 450.0),
            Point::new(500.0, 550.0),
            &standard,
        )
        .unwrap();
        // Midpoint at y=500 sits a quarter of the way down a 200 px crop.
        assert_eq!(crop.y, 450);
        assert_eq!(crop.height, 200);
    }

    #[test]
    fn upscaling_small_head() {
        let crop = head_crop(
            200,
            200,
            Point::new(100.0, 80.0),
            Point::new(100.0, 120.0),
            &standard(300, 400, 0.5),
        )
        .unwrap();
        assert_eq!((crop.width, crop.height), (60, 80));
        assert_eq!((crop.x, crop.y), (70, 60));
    }

    #[test]
    fn crop_beyond_source_is_layout_error() {
        let result = head_crop(
            1000,
            1000,
            Point::new(50.0, 450.0),
            Point::new(50.0, 550.0),
            &standard(300, 400, 0.5),
        );
        assert!(matches!(result, Err(PppError::LayoutError(_))));
    }

    #[test]
    fn large_head_needs_more_source_than_available() {
        // A 160 px head at 10% of 400 px needs a 1200x1600 crop.
        let result = head_crop(
            1000,
            1000,
            Point::new(500.0, 420.0),
            Point::new(500.0, 580.0),
            &standard(300, 400, 0.1),
        );
        assert!(matches!(result, Err(PppError::LayoutError(_))));
    }

    #[test]
    fn coincident_crown_and_chin_is_layout_error() {
        let p = Point::new(10.0, 10.0);
        let result = head_crop(100, 100, p, p, &standard(30, 40, 0.5));
        assert!(matches!(result, Err(PppError::LayoutError(_))));
    }

    #[test]
    fn crop_touching_edges_is_accepted() {
        let crop = head_crop(
            150,
            200,
            Point::new(75.0, 50.0),
            Point::new(75.0, 150.0),
            &standard(300, 400, 0.5),
        )
        .unwrap();
        assert_eq!(
            crop,
            CropRegion {
                x: 0,
                y: 0,
                width: 150,
                height: 200
            }
        );
    }
}
