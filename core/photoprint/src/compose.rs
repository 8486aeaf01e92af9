use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, RgbImage, RgbaImage};
use tracing::debug;

use crate::crop::{head_crop, CropRegion};
use crate::error::PppError;
use crate::geometry::Point;
use crate::standard::{CanvasDefinition, PhotoStandard};

/// Gap between tiles and around the sheet border, in canvas pixels.
pub const TILE_MARGIN_PX: u32 = 20;

const BLANK: image::Rgb<u8> = image::Rgb([255, 255, 255]);

/// Decode input bytes into a `DynamicImage`.
pub(crate) fn decode_image(input: &[u8]) -> Result<DynamicImage, PppError> {
    let image =
        image::load_from_memory(input).map_err(|e| PppError::DecodeError(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(PppError::DecodeError("image dimensions are zero".into()));
    }
    Ok(image)
}

/// Flatten alpha channel by compositing onto a white background.
pub(crate) fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba: RgbaImage = image.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        let out_r = (r as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_g = (g as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_b = (b as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        rgb.put_pixel(x, y, image::Rgb([out_r, out_g, out_b]));
    }

    rgb
}

/// Crop and scale `image` so the head matches `standard`.
pub fn correct_photo(
    image: &DynamicImage,
    crown: Point,
    chin: Point,
    standard: &PhotoStandard,
) -> Result<RgbImage, PppError> {
    standard.validate()?;
    let CropRegion {
        x,
        y,
        width,
        height,
    } = head_crop(image.width(), image.height(), crown, chin, standard)?;
    debug!(x, y, width, height, "head crop");

    let resized = image.crop_imm(x, y, width, height).resize_exact(
        standard.output_width,
        standard.output_height,
        FilterType::Lanczos3,
    );
    Ok(flatten_alpha(&resized))
}

/// Arrangement of identical tiles on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    /// Tiles per row.
    pub columns: u32,
    /// Tiles per column.
    pub rows: u32,
    /// Width of one tile in pixels.
    pub tile_width: u32,
    /// Height of one tile in pixels.
    pub tile_height: u32,
    /// Gap around and between tiles in pixels.
    pub margin: u32,
}

impl TileGrid {
    /// Fit as many `tile_width` × `tile_height` tiles as possible on the
    /// canvas, with `margin` pixels around and between them.
    pub fn fit(
        tile_width: u32,
        tile_height: u32,
        canvas_width: u32,
        canvas_height: u32,
        margin: u32,
    ) -> Result<Self, PppError> {
        let fit = |canvas: u32, tile: u32| canvas.saturating_sub(margin) / tile.saturating_add(margin).max(1);
        let columns = fit(canvas_width, tile_width);
        let rows = fit(canvas_height, tile_height);
        if columns == 0 || rows == 0 {
            return Err(PppError::LayoutError(format!(
                "a {tile_width}x{tile_height} photo does not fit on a \
                 {canvas_width}x{canvas_height} canvas with {margin} px margins"
            )));
        }
        Ok(Self {
            columns,
            rows,
            tile_width,
            tile_height,
            margin,
        })
    }

    /// Number of tiles on the sheet.
    pub fn len(&self) -> u32 {
        self.columns * self.rows
    }

    /// Whether the sheet holds no tile at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-left corners of every tile, left to right then top to bottom.
    pub fn positions(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.columns).map(move |column| {
                (
                    self.margin + column * (self.tile_width + self.margin),
                    self.margin + row * (self.tile_height + self.margin),
                )
            })
        })
    }
}

/// Paint `photo` into every slot of `grid` on a blank canvas.
pub(crate) fn paint_tiles(
    photo: &RgbImage,
    grid: &TileGrid,
    canvas_width: u32,
    canvas_height: u32,
) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(canvas_width, canvas_height, BLANK);
    for (x, y) in grid.positions() {
        image::imageops::replace(&mut canvas, photo, x as i64, y as i64);
    }
    canvas
}

/// Build a printable sheet of corrected photos.
///
/// The sheet layout is checked before the photo is cropped and resized, so an
/// unusable canvas fails without touching the image.
pub fn compose(
    image: &DynamicImage,
    standard: &PhotoStandard,
    canvas: &CanvasDefinition,
    crown: Point,
    chin: Point,
) -> Result<RgbImage, PppError> {
    standard.validate()?;
    let (canvas_width, canvas_height) = canvas.pixel_size()?;
    let grid = TileGrid::fit(
        standard.output_width,
        standard.output_height,
        canvas_width,
        canvas_height,
        TILE_MARGIN_PX,
    )?;
    debug!(
        columns = grid.columns,
        rows = grid.rows,
        canvas_width,
        canvas_height,
        "tile grid"
    );

    let photo = correct_photo(image, crown, chin, standard)?;
    Ok(paint_tiles(&photo, &grid, canvas_width, canvas_height))
}

/// Encode an RGB image as PNG.
pub(crate) fn encode_png(image: &RgbImage) -> Result<Vec<u8>, PppError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| PppError::EncodeError(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_rgb(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ]);
        }
        img
    }

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
    fn grid_for_reference_sheet() {
        let grid = TileGrid::fit(413, 531, 1800, 1200, 20).unwrap();
        assert_eq!(grid.columns, (1800 - 20) / (413 + 20));
        assert_eq!(grid.rows, (1200 - 20) / (531 + 20));
        assert_eq!((grid.columns, grid.rows), (4, 2));
        assert_eq!(grid.len(), 8);
    }

    #[test]
    fn grid_positions_are_row_major_with_uniform_margins() {
        let grid = TileGrid::fit(413, 531, 1800, 1200, 20).unwrap();
        let positions: Vec<_> = grid.positions().collect();
        assert_eq!(positions[0], (20, 20));
        assert_eq!(positions[1], (453, 20));
        assert_eq!(positions[4], (20, 571));

        let (last_x, last_y) = positions[positions.len() - 1];
        assert!(last_x + 413 + 20 <= 1800);
        assert!(last_y + 531 + 20 <= 1200);
    }

    #[test]
    fn canvas_too_small_is_layout_error() {
        let result = TileGrid::fit(413, 531, 440, 1200, 20);
        assert!(matches!(result, Err(PppError::LayoutError(_))));
        let result = TileGrid::fit(413, 531, 10, 10, 20);
        assert!(matches!(result, Err(PppError::LayoutError(_))));
    }

    #[test]
    fn exact_fit_with_margins() {
        // 20 + 100 + 20 = 140
        let grid = TileGrid::fit(100, 100, 140, 140, 20).unwrap();
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn painted_tiles_leave_margins_blank() {
        let photo = RgbImage::from_pixel(10, 10, image::Rgb([0, 0, 0]));
        let grid = TileGrid::fit(10, 10, 50, 30, 5).unwrap();
        assert_eq!((grid.columns, grid.rows), (3, 1));

        let canvas = paint_tiles(&photo, &grid, 50, 30);
        assert_eq!(canvas.get_pixel(5, 5), &image::Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(14, 14), &image::Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(17, 5), &BLANK);
        assert_eq!(canvas.get_pixel(20, 5), &image::Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(4, 4), &BLANK);
        assert_eq!(canvas.get_pixel(49, 29), &BLANK);
    }

    #[test]
    fn corrected_photo_has_standard_size() {
        let image = DynamicImage::ImageRgb8(make_test_rgb(400, 600));
        let photo = correct_photo(
            &image,
            Point::new(200.0, 200.0),
            Point::new(200.0, 350.0),
            &standard(120, 160, 0.5),
        )
        .unwrap();
        assert_eq!((photo.width(), photo.height()), (120, 160));
    }

    #[test]
    fn compose_fills_canvas_resolution() {
        let image = DynamicImage::ImageRgb8(make_test_rgb(400, 600));
        let canvas = CanvasDefinition {
            name: None,
            width: 50.0,
            height: 40.0,
            resolution: 10.0,
            units: Default::default(),
        };
        let sheet = compose(
            &image,
            &standard(120, 160, 0.5),
            &canvas,
            Point::new(200.0, 200.0),
            Point::new(200.0, 350.0),
        )
        .unwrap();
        assert_eq!((sheet.width(), sheet.height()), (500, 400));
        assert_eq!(sheet.get_pixel(0, 0), &BLANK);
    }

    #[test]
    fn oversized_canvas_fails_without_allocating() {
        let image = DynamicImage::ImageRgb8(make_test_rgb(400, 600));
        let canvas = CanvasDefinition {
            name: None,
            width: 1_000_000.0,
            height: 1_000_000.0,
            resolution: 1000.0,
            units: Default::default(),
        };
        let result = compose(
            &image,
            &standard(120, 160, 0.5),
            &canvas,
            Point::new(200.0, 200.0),
            Point::new(200.0, 350.0),
        );
        assert!(matches!(result, Err(PppError::ConfigError(_))));
    }

    #[test]
    fn oversized_output_fails_without_allocating() {
        let image = DynamicImage::ImageRgb8(make_test_rgb(400, 600));
        let result = correct_photo(
            &image,
            Point::new(200.0, 200.0),
            Point::new(200.0, 350.0),
            &standard(u32::MAX, u32::MAX, 0.5),
        );
        assert!(matches!(result, Err(PppError::ConfigError(_))));
    }

    #[test]
    fn layout_is_checked_before_cropping() {
        // The crown/chin pair lies outside the photo and the canvas is too
        // small: the canvas is reported.
        let image = DynamicImage::ImageRgb8(make_test_rgb(400, 600));
        let canvas = CanvasDefinition {
            name: None,
            width: 10.0,
            height: 10.0,
            resolution: 10.0,
            units: Default::default(),
        };
        let result = compose(
            &image,
            &standard(120, 160, 0.5),
            &canvas,
            Point::new(5000.0, 200.0),
            Point::new(5000.0, 350.0),
        );
        match result {
            Err(PppError::LayoutError(message)) => assert!(message.contains("does not fit")),
            other => panic!("expected a layout error, got {other:?}"),
        }
    }

    #[test]
    fn huge_tile_does_not_overflow_grid() {
        let result = TileGrid::fit(u32::MAX, u32::MAX, 1000, 1000, 20);
        assert!(matches!(result, Err(PppError::LayoutError(_))));
    }

    #[test]
    fn flatten_alpha_composites_over_white() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([255, 0, 0, 0]));
        let rgb = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([255, 255, 255]));
    }

    #[test]
    fn flatten_alpha_preserves_opaque() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([100, 150, 200, 255]));
        let rgb = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([100, 150, 200]));
    }

    #[test]
    fn encode_png_has_signature() {
        let data = encode_png(&make_test_rgb(8, 8)).unwrap();
        assert_eq!(&data[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(PppError::DecodeError(_))
        ));
    }
}
