use std::path::Path;

use image::{imageops::FilterType, GrayImage, ImageBuffer};
use imageproc::contrast::{threshold_mut, ThresholdType};
use ndarray::{Array2, ArrayView2, Axis};
use tracing::instrument;

use crate::Raster;

const PAPER: u8 = 255;
const INK: u8 = 0;

/// Luma values up to this are ink.
pub const INK_THRESHOLD: u8 = 127;

/// Decodes an image from disk and thresholds it into a raster.
#[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn open_raster(path: impl AsRef<Path>) -> crate::Result<Raster> {
    let image = image::open(path)?;
    log::debug!(
        "Loaded page of (w: {}, h: {}) for thresholding.",
        image.width(),
        image.height()
    );
    Ok(Raster::from_image(&image))
}

pub(crate) fn threshold_luma(mut image: GrayImage) -> Raster {
    threshold_mut(&mut image, INK_THRESHOLD, ThresholdType::Binary);
    let (width, height) = image.dimensions();
    Raster::from_array(Array2::from_shape_fn(
        (height as usize, width as usize),
        |(y, x)| image.get_pixel(x as u32, y as u32).0[0] == INK,
    ))
}

pub(crate) fn to_luma_image(data: ArrayView2<bool>) -> GrayImage {
    let height = data.len_of(Axis(0));
    let width = data.len_of(Axis(1));
    let pixel_data = data
        .axis_iter(Axis(0))
        .flat_map(|it| it.into_iter())
        .map(|ink| if *ink { INK } else { PAPER })
        .collect::<Vec<u8>>();
    ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
        image::Luma([pixel_data[y as usize * width + x as usize]])
    })
}

/// Nearest-neighbour resample, which keeps the raster strictly binary.
pub(crate) fn resize(raster: &Raster, width: u32, height: u32) -> Raster {
    if raster.width() == 0 || raster.height() == 0 {
        return Raster::new(width, height);
    }
    let image = to_luma_image(raster.pixels().view());
    log::trace!(
        "Resampling glyph from (w: {}, h: {}) to (w: {width}, h: {height}).",
        raster.width(),
        raster.height()
    );
    threshold_luma(image::imageops::resize(
        &image,
        width,
        height,
        FilterType::Nearest,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rect;

    #[test]
    fn luma_round_trip_keeps_ink() {
        let raster = Raster::from_pattern(&["#..", ".#.", "..#"]);
        let image = to_luma_image(raster.pixels().view());
        assert_eq!(image.get_pixel(0, 0).0[0], INK);
        assert_eq!(image.get_pixel(1, 0).0[0], PAPER);
        assert_eq!(threshold_luma(image), raster);
    }

    #[test]
    fn resize_scales_blocks() {
        let raster = Raster::from_pattern(&["#.", ".#"]);
        let scaled = raster.resized(4, 4);
        assert_eq!(scaled.ink_count(&scaled.bounds()), 8);
        assert!(scaled.is_ink(1, 1));
        assert!(!scaled.is_ink(2, 1));
        assert_eq!(scaled.ink_count(&Rect::new(2, 2, 2, 2)), 4);
    }

    #[test]
    fn gray_values_split_at_threshold() {
        let image = GrayImage::from_fn(3, 1, |x, _| image::Luma([[0, 127, 128][x as usize]]));
        let raster = threshold_luma(image);
        assert!(raster.is_ink(0, 0));
        assert!(raster.is_ink(1, 0));
        assert!(!raster.is_ink(2, 0));
    }
}
