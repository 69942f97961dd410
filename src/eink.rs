//! Bitmap normalization for e-ink panels.
//!
//! Generated images rarely match the panel: they are square or larger than
//! the display and carry soft midtones that wash out on electronic paper.
//! [`optimize_for_eink`] fits the image inside the panel, pads it onto a white
//! canvas and boosts contrast.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage};

/// Contrast multiplier applied after padding (1.0 = unchanged).
pub const CONTRAST_FACTOR: f32 = 1.5;

/// Fit, pad and contrast-enhance an image for a `target` = `(width, height)` panel.
///
/// With `grayscale` the image is reduced to a single luma channel first.
/// The result is always an RGB8 image of exactly `target` size, so
/// downstream display drivers see the same pixel format either way.
///
/// # Example
///
/// ```
/// use image::{DynamicImage, RgbImage};
/// use inkframe::eink::optimize_for_eink;
///
/// let square = DynamicImage::ImageRgb8(RgbImage::new(1024, 1024));
/// let out = optimize_for_eink(square, (800, 480), false);
///
/// assert_eq!((out.width(), out.height()), (800, 480));
/// assert!(out.as_rgb8().is_some());
/// ```
pub fn optimize_for_eink(image: DynamicImage, target: (u32, u32), grayscale: bool) -> DynamicImage {
    let (width, height) = target;

    let image = if grayscale {
        DynamicImage::ImageLuma8(to_luma(&image))
    } else {
        image
    };
    let image = fit_within(image, width, height);

    let x = i64::from((width - image.width()) / 2);
    let y = i64::from((height - image.height()) / 2);
    tracing::debug!(
        "Padding {}x{} image onto {}x{} canvas at ({}, {})",
        image.width(),
        image.height(),
        width,
        height,
        x,
        y
    );

    if grayscale {
        let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));
        imageops::replace(&mut canvas, &to_luma(&image), x, y);
        enhance_contrast_luma(&mut canvas, CONTRAST_FACTOR);
        DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(canvas).to_rgb8())
    } else {
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        imageops::replace(&mut canvas, &image.to_rgb8(), x, y);
        enhance_contrast(&mut canvas, CONTRAST_FACTOR);
        DynamicImage::ImageRgb8(canvas)
    }
}

/// Shrink (never enlarge) an image to fit within `width` x `height`,
/// keeping its aspect ratio.
pub fn fit_within(image: DynamicImage, width: u32, height: u32) -> DynamicImage {
    if image.width() <= width && image.height() <= height {
        return image;
    }
    image.resize(width, height, FilterType::Lanczos3)
}

/// Convert to single-channel luma with ITU-R 601-2 weights (alpha is dropped).
pub fn to_luma(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        Luma([luma(rgb.get_pixel(x, y).0)])
    })
}

/// Scale every channel away from the image's mean luma by `factor`.
///
/// Matches the classic "blend with a flat grey of the mean brightness"
/// contrast enhancer: `v' = mean + factor * (v - mean)`, clamped to `0..=255`.
pub fn enhance_contrast(image: &mut RgbImage, factor: f32) {
    let mean = mean_level(image.pixels().map(|p| luma(p.0)));
    apply_contrast(image, mean, factor);
}

/// Single-channel variant of [`enhance_contrast`].
pub fn enhance_contrast_luma(image: &mut GrayImage, factor: f32) {
    let mean = mean_level(image.pixels().map(|p| p.0[0]));
    apply_contrast(image, mean, factor);
}

fn apply_contrast<P>(image: &mut ImageBuffer<P, Vec<u8>>, mean: u8, factor: f32)
where
    P: Pixel<Subpixel = u8>,
{
    let mean = f32::from(mean);
    for value in image.iter_mut() {
        let scaled = mean + factor * (f32::from(*value) - mean);
        *value = scaled.clamp(0.0, 255.0) as u8;
    }
}

/// Rounded mean of 8-bit levels (0 for an empty image).
fn mean_level(levels: impl Iterator<Item = u8>) -> u8 {
    let (sum, count) = levels.fold((0u64, 0u64), |(sum, count), v| {
        (sum + u64::from(v), count + 1)
    });
    if count == 0 {
        return 0;
    }
    ((sum as f64 / count as f64) + 0.5) as u8
}

/// ITU-R 601-2 luma in 16.16 fixed point.
fn luma([r, g, b]: [u8; 3]) -> u8 {
    ((u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_output_matches_target() {
        for (w, h) in [(1024, 1024), (100, 50), (3000, 200), (800, 480)] {
            let out = optimize_for_eink(solid(w, h, [10, 20, 30]), (800, 480), false);
            assert_eq!((out.width(), out.height()), (800, 480));
            assert!(out.as_rgb8().is_some());
        }
    }

    #[test]
    fn test_small_image_is_centered_not_enlarged() {
        let out = optimize_for_eink(solid(100, 50, [0, 0, 0]), (800, 480), false);
        let out = out.as_rgb8().unwrap();

        // Placed at (350, 215), 100x50
        assert_eq!(*out.get_pixel(349, 240), WHITE);
        assert_eq!(*out.get_pixel(350, 240), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(449, 264), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(450, 240), WHITE);
        assert_eq!(*out.get_pixel(400, 214), WHITE);
        assert_eq!(*out.get_pixel(400, 265), WHITE);
    }

    #[test]
    fn test_wide_image_is_letterboxed() {
        let out = optimize_for_eink(solid(1600, 480, [0, 0, 0]), (800, 480), false);
        let out = out.as_rgb8().unwrap();

        // Shrunk to 800x240, top band 0..120 stays white
        assert_eq!(*out.get_pixel(400, 60), WHITE);
        assert_eq!(*out.get_pixel(400, 240), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(400, 420), WHITE);
    }

    #[test]
    fn test_grayscale_output_is_neutral_rgb() {
        let out = optimize_for_eink(solid(64, 64, [200, 30, 90]), (128, 96), true);
        let out = out.as_rgb8().unwrap();
        for pixel in out.pixels() {
            let [r, g, b] = pixel.0;
            assert!(r == g && g == b);
        }
    }

    #[test]
    fn test_grayscale_uses_601_weights() {
        // Flat image: contrast leaves the converted level untouched
        let out = optimize_for_eink(solid(4, 4, [200, 30, 90]), (4, 4), true);
        let out = out.as_rgb8().unwrap();
        assert!(out.pixels().all(|p| *p == Rgb([88, 88, 88])));

        let gray = to_luma(&solid(1, 1, [0, 255, 0]));
        assert_eq!(gray.get_pixel(0, 0).0, [150]);
    }

    #[test]
    fn test_color_preserved_without_grayscale() {
        let out = optimize_for_eink(solid(10, 10, [255, 0, 0]), (20, 20), false);
        let out = out.as_rgb8().unwrap();
        let center = out.get_pixel(10, 10).0;
        assert_eq!(center[0], 255);
        assert_eq!(center[1], 0);
    }

    #[test]
    fn test_contrast_formula() {
        let mut image = GrayImage::from_raw(2, 1, vec![50, 150]).unwrap();
        enhance_contrast_luma(&mut image, 1.5);
        assert_eq!(image.into_raw(), vec![25, 175]);

        let mut image = GrayImage::from_raw(2, 1, vec![0, 255]).unwrap();
        enhance_contrast_luma(&mut image, 1.5);
        assert_eq!(image.into_raw(), vec![0, 255]);
    }

    #[test]
    fn test_contrast_flat_image_unchanged() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        enhance_contrast(&mut image, CONTRAST_FACTOR);
        assert!(image.pixels().all(|p| *p == Rgb([100, 100, 100])));
    }

    #[test]
    fn test_fit_within_keeps_aspect() {
        let fitted = fit_within(solid(1024, 1024, [0, 0, 0]), 800, 480);
        assert_eq!((fitted.width(), fitted.height()), (480, 480));

        let untouched = fit_within(solid(10, 10, [0, 0, 0]), 800, 480);
        assert_eq!((untouched.width(), untouched.height()), (10, 10));
    }

    #[test]
    fn test_luma() {
        assert_eq!(luma([255, 255, 255]), 255);
        assert_eq!(luma([0, 0, 0]), 0);
        assert_eq!(luma([255, 0, 0]), 76);
    }
}
