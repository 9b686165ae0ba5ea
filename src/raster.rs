use image::DynamicImage;
use ndarray::Array2;

use crate::{util, Rect};

/// Distance from each side of a rectangle to its first ink pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Borders {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

/// Binary page image. `true` is ink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pixels: Array2<bool>,
}

impl Raster {
    /// A blank raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: Array2::from_elem((height as usize, width as usize), false),
        }
    }

    pub fn from_fn(width: u32, height: u32, mut ink: impl FnMut(u32, u32) -> bool) -> Self {
        Self {
            pixels: Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
                ink(x as u32, y as u32)
            }),
        }
    }

    /// Builds a raster from text rows where `#` marks ink. Short rows are
    /// padded with paper.
    pub fn from_pattern(rows: &[&str]) -> Self {
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let cells = rows
            .iter()
            .map(|row| row.chars().collect::<Vec<_>>())
            .collect::<Vec<_>>();
        Self::from_fn(width as u32, rows.len() as u32, |x, y| {
            cells[y as usize].get(x as usize) == Some(&'#')
        })
    }

    /// Thresholds a decoded image; luma values up to 127 are ink.
    pub fn from_image(image: &DynamicImage) -> Self {
        util::threshold_luma(image.to_luma8())
    }

    pub(crate) fn from_array(pixels: Array2<bool>) -> Self {
        Self { pixels }
    }

    pub(crate) fn pixels(&self) -> &Array2<bool> {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.pixels.nrows() as u32
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width() as i32, self.height() as i32)
    }

    /// Ink test; anything outside the raster is paper.
    pub fn is_ink(&self, x: i32, y: i32) -> bool {
        self.is_ink_or(x, y, false)
    }

    pub fn is_ink_or(&self, x: i32, y: i32, default: bool) -> bool {
        if x < 0 || y < 0 {
            return default;
        }
        self.pixels
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(default)
    }

    /// Paints a rectangle, clipped to the raster.
    pub fn fill_rect(&mut self, rect: &Rect, ink: bool) {
        let clip = rect.intersection(&self.bounds());
        for y in clip.y..clip.bottom() {
            for x in clip.x..clip.right() {
                self.pixels[(y as usize, x as usize)] = ink;
            }
        }
    }

    /// Copies `pattern` (same syntax as [`Raster::from_pattern`]) onto the
    /// raster with its top-left corner at `x`, `y`, scaling every cell to a
    /// `scale`×`scale` block.
    pub fn draw_pattern(&mut self, x: i32, y: i32, pattern: &[&str], scale: i32) {
        for (row, line) in pattern.iter().enumerate() {
            for (col, c) in line.chars().enumerate() {
                if c == '#' {
                    let cell = Rect::new(
                        x + col as i32 * scale,
                        y + row as i32 * scale,
                        scale,
                        scale,
                    );
                    self.fill_rect(&cell, true);
                }
            }
        }
    }

    pub fn ink_count(&self, rect: &Rect) -> usize {
        let clip = rect.intersection(&self.bounds());
        if clip.is_empty() {
            return 0;
        }
        self.pixels
            .slice(ndarray::s![
                clip.y as usize..clip.bottom() as usize,
                clip.x as usize..clip.right() as usize
            ])
            .iter()
            .filter(|ink| **ink)
            .count()
    }

    /// Fraction of `rect` covered by ink. Empty rectangles have ratio 0.
    pub fn fill_ratio(&self, rect: &Rect) -> f64 {
        if rect.is_empty() {
            return 0.0;
        }
        self.ink_count(rect) as f64 / rect.area() as f64
    }

    /// Ink fraction of the column segment `x`, `y..y + height`.
    pub fn column_fill(&self, x: i32, y: i32, height: i32) -> f64 {
        self.fill_ratio(&Rect::new(x, y, 1, height))
    }

    pub fn row_has_ink(&self, y: i32, x: i32, width: i32) -> bool {
        (x..x + width).any(|ix| self.is_ink(ix, y))
    }

    pub fn column_has_ink(&self, x: i32, y: i32, height: i32) -> bool {
        (y..y + height).any(|iy| self.is_ink(x, iy))
    }

    /// Insets from each side of `rect` to the first ink pixel, or `None` when
    /// the rectangle holds no ink.
    pub fn borders(&self, rect: &Rect) -> Option<Borders> {
        let top = (rect.y..rect.bottom()).find(|&y| self.row_has_ink(y, rect.x, rect.width))?;
        let bottom = (rect.y..rect.bottom())
            .rev()
            .find(|&y| self.row_has_ink(y, rect.x, rect.width))?;
        let left = (rect.x..rect.right()).find(|&x| self.column_has_ink(x, rect.y, rect.height))?;
        let right = (rect.x..rect.right())
            .rev()
            .find(|&x| self.column_has_ink(x, rect.y, rect.height))?;

        Some(Borders {
            top: top - rect.y,
            left: left - rect.x,
            bottom: rect.bottom() - 1 - bottom,
            right: rect.right() - 1 - right,
        })
    }

    /// Tightest rectangle inside `rect` that still holds all of its ink.
    pub fn ink_bounds(&self, rect: &Rect) -> Option<Rect> {
        let borders = self.borders(rect)?;
        Some(Rect::new(
            rect.x + borders.left,
            rect.y + borders.top,
            rect.width - borders.left - borders.right,
            rect.height - borders.top - borders.bottom,
        ))
    }

    /// Copy of the pixels under `rect`; parts outside the raster are paper.
    pub fn region(&self, rect: &Rect) -> Raster {
        let width = rect.width.max(0) as u32;
        let height = rect.height.max(0) as u32;
        Raster::from_fn(width, height, |x, y| {
            self.is_ink(rect.x + x as i32, rect.y + y as i32)
        })
    }

    /// Resamples the raster to `width`×`height`.
    pub fn resized(&self, width: u32, height: u32) -> Raster {
        util::resize(self, width, height)
    }
}
