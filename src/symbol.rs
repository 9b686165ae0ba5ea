use ndarray::Array2;
use tracing::instrument;

use crate::{
    features::{CurvatureSegment, FeatureExtractor, FeatureVector, Features, Slope},
    Raster, Rect,
};

/// A glyph reduced to its features: either a learned template carrying a
/// label and font, or an unknown instance built for one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    label: Option<char>,
    font: Option<String>,
    bitmap: Raster,
    features: Features,
}

impl Symbol {
    /// Builds an unlabelled symbol from an already normalized bitmap.
    pub fn from_bitmap(bitmap: Raster, extractor: &FeatureExtractor) -> Self {
        let features = extractor.extract(&bitmap);
        Self {
            label: None,
            font: None,
            bitmap,
            features,
        }
    }

    /// Cuts the ink inside `rect` out of `raster` and normalizes it. `None`
    /// when the rectangle holds no ink.
    #[instrument(level = "trace", skip(raster, extractor))]
    pub fn extract(raster: &Raster, rect: &Rect, extractor: &FeatureExtractor) -> Option<Self> {
        let bitmap = normalize_glyph(raster, rect, extractor.matrix_size())?;
        Some(Self::from_bitmap(bitmap, extractor))
    }

    pub fn with_label(mut self, label: char, font: impl Into<String>) -> Self {
        self.label = Some(label);
        self.font = Some(font.into());
        self
    }

    pub fn label(&self) -> Option<char> {
        self.label
    }

    pub fn font(&self) -> Option<&str> {
        self.font.as_deref()
    }

    /// The normalized N×N glyph.
    pub fn bitmap(&self) -> &Raster {
        &self.bitmap
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn contour(&self) -> &Array2<f64> {
        &self.features.contour
    }

    pub fn slopes(&self) -> &Array2<Slope> {
        &self.features.slopes
    }

    pub fn segments(&self) -> &[CurvatureSegment] {
        &self.features.segments
    }

    pub fn vector(&self) -> &FeatureVector {
        &self.features.vector
    }

    pub fn closest_ink(&self) -> &Array2<u32> {
        &self.features.closest_ink
    }
}

/// Trims `rect` to its ink and resamples the result to a `size`×`size`
/// matrix. Glyphs without ink, before or after resampling, yield `None`.
pub fn normalize_glyph(raster: &Raster, rect: &Rect, size: usize) -> Option<Raster> {
    let glyph = raster.ink_bounds(rect)?;
    let bitmap = raster.region(&glyph).resized(size as u32, size as u32);
    if bitmap.fill_ratio(&bitmap.bounds()) == 0.0 {
        log::trace!("Glyph at {rect:?} vanished after resampling.");
        return None;
    }
    Some(bitmap)
}
