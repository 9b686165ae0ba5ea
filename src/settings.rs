use crate::{classifier::Metric, OcrError};

/// Gap between words, measured against the page width.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CharacterSpacing {
    /// 8 px on a page 2480 px wide, scaled with the page.
    #[default]
    Auto,
    /// Percent of the page width.
    Fraction(f64),
    Exact(u32),
}

impl CharacterSpacing {
    /// Spacing in pixels for a page `page_width` pixels wide.
    pub fn resolve(&self, page_width: u32) -> i32 {
        match *self {
            CharacterSpacing::Auto => (8.0 * page_width as f64 / 2480.0) as i32,
            CharacterSpacing::Fraction(f) => (f * page_width as f64 / 100.0) as i32,
            CharacterSpacing::Exact(px) => px as i32,
        }
    }
}

/// Largest pixel bound accepted; detection grows boxes a few pixels past it.
pub const MAX_PIXEL_BOUND: u32 = i32::MAX as u32 - 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Expected glyph width relative to its ink height.
    pub character_aspect_ratio: f64,
    pub character_spacing: CharacterSpacing,
    pub min_symbol_width: u32,
    pub max_symbol_width: u32,
    pub min_symbol_height: u32,
    pub max_symbol_height: u32,
    /// Widest shape the detector keeps; wider ones are treated as rules.
    pub max_line_width: u32,
    /// Side of the square matrix glyphs are normalized to.
    pub matrix_size: usize,
    pub metric: Metric,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            character_aspect_ratio: 1.4,
            character_spacing: CharacterSpacing::Auto,
            min_symbol_width: 1,
            max_symbol_width: 100,
            min_symbol_height: 1,
            max_symbol_height: 75,
            max_line_width: 100,
            matrix_size: 18,
            metric: Metric::Curvature,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: String| Err(OcrError::InvalidConfiguration(msg));

        if !self.character_aspect_ratio.is_finite() || self.character_aspect_ratio <= 0.0 {
            return invalid(format!(
                "character aspect ratio must be positive, got {}",
                self.character_aspect_ratio
            ));
        }
        if let CharacterSpacing::Fraction(f) = self.character_spacing {
            if !f.is_finite() || f < 0.0 {
                return invalid(format!("character spacing fraction must be non-negative, got {f}"));
            }
        }
        if let CharacterSpacing::Exact(px) = self.character_spacing {
            if px > MAX_PIXEL_BOUND {
                return invalid(format!("character spacing {px} px is too large"));
            }
        }
        let too_large = [
            ("max symbol width", self.max_symbol_width),
            ("max symbol height", self.max_symbol_height),
            ("max line width", self.max_line_width),
        ];
        if let Some((name, value)) = too_large.iter().find(|(_, v)| *v > MAX_PIXEL_BOUND) {
            return invalid(format!("{name} {value} exceeds {MAX_PIXEL_BOUND}"));
        }
        if self.min_symbol_width == 0 || self.min_symbol_width > self.max_symbol_width {
            return invalid(format!(
                "symbol width bounds {}..={} are not a valid range",
                self.min_symbol_width, self.max_symbol_width
            ));
        }
        if self.min_symbol_height == 0 || self.min_symbol_height > self.max_symbol_height {
            return invalid(format!(
                "symbol height bounds {}..={} are not a valid range",
                self.min_symbol_height, self.max_symbol_height
            ));
        }
        if self.max_line_width < self.min_symbol_width {
            return invalid(format!(
                "max line width {} is below the minimum symbol width {}",
                self.max_line_width, self.min_symbol_width
            ));
        }
        if !(3..=64).contains(&self.matrix_size) {
            return invalid(format!("matrix size must be within 3..=64, got {}", self.matrix_size));
        }
        Ok(())
    }
}
