//! Directional-curvature features of a normalized glyph.
//!
//! A glyph resampled to an N×N matrix is scanned along eight orientations:
//! the left, right, top and bottom outlines, each traced once from the
//! matrix border and once from its centre line. Every scan yields one
//! contour value per bin. Runs of bins that share a slope become curvature
//! segments, right triangles spanned by the run's end points, and the area
//! each segment covers in three zones of the matrix forms an 8×2×3 feature
//! tensor.

use geo::{point, BoundingRect, Contains, Coord, Triangle};
use ndarray::{Array2, Array3, ArrayView1};
use tracing::instrument;

use crate::{Raster, Rect};

pub const ORIENTATIONS: usize = 8;
pub const SLOPE_SIGNS: usize = 2;
pub const ZONES: usize = 3;
pub const FEATURE_LEN: usize = ORIENTATIONS * SLOPE_SIGNS * ZONES;

/// Contour value of a bin without samples, or of a reverse scan that found
/// no ink.
pub const UNDEFINED: f64 = -1.0;

/// Local trend of a contour bin relative to its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Slope {
    /// The bin is off the grid: no ink was found along it.
    #[default]
    Undefined,
    Flat,
    Falling,
    Rising,
}

impl Slope {
    /// Classifies bin value `b` given its predecessor `a` and successor `c`
    /// on an `n`-bin grid. Ends of the sequence pass `b` for the missing
    /// neighbour. A neighbour sitting at `n` (off the far edge) continues a
    /// flat run instead of starting a slope.
    pub fn classify(a: i32, b: i32, c: i32, n: i32) -> Slope {
        use std::cmp::Ordering::*;

        if b == -1 || b == n {
            return Slope::Undefined;
        }
        match (a.cmp(&b), c.cmp(&b)) {
            (Equal, Equal) => Slope::Flat,
            (Greater, Equal) if a == n => Slope::Flat,
            (Equal, Greater) if c == n => Slope::Flat,
            (Greater, Greater) => Slope::Flat,
            (Less, _) | (Equal, Greater) => Slope::Rising,
            (Greater, _) | (Equal, Less) => Slope::Falling,
        }
    }
}

/// Which half of the feature tensor a segment accumulates into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlopeSign {
    Falling = 0,
    Rising = 1,
}

/// A maximal run of contour bins with one slope, as a right triangle in
/// matrix coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvatureSegment {
    pub orientation: usize,
    pub sign: SlopeSign,
    pub triangle: Triangle<f64>,
}

impl CurvatureSegment {
    fn new(orientation: usize, from: (i32, i32), to: (i32, i32)) -> Self {
        let column_scan = is_column_scan(orientation);
        let ((fx, fy), (tx, ty)) = (from, to);
        let primary = match orientation % 4 {
            0 => tx < fx,
            1 => tx >= fx,
            2 => ty >= fy,
            _ => ty < fy,
        };
        let corner = if primary { (fx, ty) } else { (tx, fy) };
        let sign = if primary != column_scan {
            SlopeSign::Rising
        } else {
            SlopeSign::Falling
        };
        let coord = |(x, y): (i32, i32)| Coord {
            x: x as f64,
            y: y as f64,
        };

        Self {
            orientation,
            sign,
            triangle: Triangle::new(coord(from), coord(to), coord(corner)),
        }
    }

    /// Number of pixels inside `window` whose centre lies inside the
    /// triangle.
    pub fn covered_pixels(&self, window: &Rect) -> usize {
        let bounds = self.triangle.bounding_rect();
        let x0 = window.x.max(bounds.min().x.floor() as i32);
        let y0 = window.y.max(bounds.min().y.floor() as i32);
        let x1 = window.right().min(bounds.max().x.ceil() as i32 + 1);
        let y1 = window.bottom().min(bounds.max().y.ceil() as i32 + 1);

        (y0..y1)
            .flat_map(|y| (x0..x1).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                self.triangle
                    .contains(&point![x: x as f64 + 0.5, y: y as f64 + 0.5])
            })
            .count()
    }
}

/// The 8×2×3 tensor of zone areas, indexed by orientation, slope sign and
/// zone.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Array3<f64>);

impl FeatureVector {
    pub fn zeros() -> Self {
        Self(Array3::zeros((ORIENTATIONS, SLOPE_SIGNS, ZONES)))
    }

    pub fn get(&self, orientation: usize, sign: SlopeSign, zone: usize) -> f64 {
        self.0[[orientation, sign as usize, zone]]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.iter().copied().collect()
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.0
    }

    /// Sum of squared cell differences.
    pub fn squared_distance(&self, other: &FeatureVector) -> f64 {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum()
    }

    /// Sum of absolute cell differences.
    pub fn absolute_distance(&self, other: &FeatureVector) -> f64 {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| (a - b).abs())
            .sum()
    }
}

/// Everything derived from one normalized glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    /// Per orientation and bin, the offset of the first ink pixel.
    pub contour: Array2<f64>,
    pub slopes: Array2<Slope>,
    pub segments: Vec<CurvatureSegment>,
    pub vector: FeatureVector,
    /// Per matrix cell, the ring distance to the nearest ink pixel.
    pub closest_ink: Array2<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureExtractor {
    matrix_size: usize,
}

fn is_column_scan(orientation: usize) -> bool {
    orientation % 4 >= 2
}

impl FeatureExtractor {
    pub fn new(matrix_size: usize) -> Self {
        Self { matrix_size }
    }

    pub fn matrix_size(&self) -> usize {
        self.matrix_size
    }

    #[instrument(level = "trace", skip(self, bitmap))]
    pub fn extract(&self, bitmap: &Raster) -> Features {
        let contour = self.contour(bitmap);
        let slopes = self.slopes(&contour);
        let segments = self.curvature(&contour, &slopes);
        let vector = self.curvature_vector(&segments);
        let closest_ink = self.closest_ink(bitmap);

        Features {
            contour,
            slopes,
            segments,
            vector,
            closest_ink,
        }
    }

    /// Traces the eight outlines of `bitmap`, bucketing samples into
    /// `matrix_size` bins. Orientations `0..4` start at the border (left,
    /// right, top, bottom), `4..8` at the centre line.
    pub fn contour(&self, bitmap: &Raster) -> Array2<f64> {
        let n = self.matrix_size;
        let (w, h) = (bitmap.width() as i32, bitmap.height() as i32);
        let mut contour = Array2::from_elem((ORIENTATIONS, n), UNDEFINED);
        if w == 0 || h == 0 || n == 0 {
            return contour;
        }

        let mut sum = Array2::<f64>::zeros((ORIENTATIONS, n));
        let mut count = Array2::<u32>::zeros((ORIENTATIONS, n));
        let fx = n as f64 / w as f64;
        let fy = n as f64 / h as f64;
        let far = n as f64;
        let bin = |pos: i32, scale: f64| ((pos as f64 * scale).round() as usize).min(n - 1);
        let mut record = |orientation: usize, bin: usize, value: f64| {
            sum[[orientation, bin]] += value;
            count[[orientation, bin]] += 1;
        };

        for origin in 0..2 {
            let base = 4 * origin as usize;

            for y in 0..h {
                let z = bin(y, fy);
                let left = (w * origin / 2..w).find(|&x| bitmap.is_ink(x, y));
                record(base, z, left.map_or(far, |x| fx * x as f64));
                let right = (0..w - w * origin / 2).rev().find(|&x| bitmap.is_ink(x, y));
                record(base + 1, z, right.map_or(UNDEFINED, |x| fx * x as f64));
            }

            for x in 0..w {
                let z = bin(x, fx);
                let top = (h * origin / 2..h).find(|&y| bitmap.is_ink(x, y));
                record(base + 2, z, top.map_or(far, |y| fy * y as f64));
                let bottom = (0..h - h * origin / 2).rev().find(|&y| bitmap.is_ink(x, y));
                record(base + 3, z, bottom.map_or(UNDEFINED, |y| fy * y as f64));
            }
        }

        for ((value, sum), count) in contour.iter_mut().zip(sum.iter()).zip(count.iter()) {
            if *count > 0 {
                *value = sum / *count as f64;
            }
        }
        contour
    }

    pub fn slopes(&self, contour: &Array2<f64>) -> Array2<Slope> {
        let n = contour.ncols();
        Array2::from_shape_fn(contour.dim(), |(o, i)| {
            let b = contour[[o, i]] as i32;
            let a = if i == 0 { b } else { contour[[o, i - 1]] as i32 };
            let c = if i + 1 == n { b } else { contour[[o, i + 1]] as i32 };
            Slope::classify(a, b, c, self.matrix_size as i32)
        })
    }

    pub fn curvature(&self, contour: &Array2<f64>, slopes: &Array2<Slope>) -> Vec<CurvatureSegment> {
        let mut segments = Vec::new();
        for orientation in 0..ORIENTATIONS {
            self.orientation_segments(
                orientation,
                contour.row(orientation),
                slopes.row(orientation),
                &mut segments,
            );
        }
        segments
    }

    /// Walks one orientation. A run extends while bins keep the slope of
    /// its first bin or are flat; it closes on any other slope or an
    /// undefined bin, and the bin that closed it is not revisited.
    fn orientation_segments(
        &self,
        orientation: usize,
        values: ArrayView1<f64>,
        slopes: ArrayView1<Slope>,
        segments: &mut Vec<CurvatureSegment>,
    ) {
        let n = values.len();
        let far = self.matrix_size as i32;
        let column_scan = is_column_scan(orientation);

        let mut from = (0, 0);
        let mut first = true;
        let mut tx = 0;
        let mut i = 0;

        while i < n {
            if first {
                tx = values[i] as i32;
            } else {
                let start = slopes[i];
                while i < n {
                    if values[i] <= UNDEFINED {
                        break;
                    }
                    if slopes[i] != start && slopes[i] != Slope::Flat {
                        break;
                    }
                    tx = values[i] as i32;
                    i += 1;
                }
            }

            if tx == -1 || tx == far {
                first = true;
                i += 1;
                continue;
            }

            let along = i as i32 - if first { 0 } else { 1 };
            let to = if column_scan { (along, tx) } else { (tx, along) };

            if !first && from != to {
                segments.push(CurvatureSegment::new(orientation, from, to));
            }

            from = to;
            first = i < n && values[i] <= UNDEFINED;
            i += 1;
        }
    }

    /// Accumulates segment areas per zone. Row scans split the matrix into
    /// horizontal thirds, column scans into vertical thirds.
    pub fn curvature_vector(&self, segments: &[CurvatureSegment]) -> FeatureVector {
        let n = self.matrix_size as i32;
        let third = n as f64 / 3.0;
        let edges = [0, third as i32, (2.0 * third) as i32, n];
        let mut vector = FeatureVector::zeros();

        for segment in segments {
            for zone in 0..ZONES {
                let span = edges[zone + 1] - edges[zone];
                let band = if is_column_scan(segment.orientation) {
                    Rect::new(edges[zone], 0, span, n)
                } else {
                    Rect::new(0, edges[zone], n, span)
                };
                vector.0[[segment.orientation, segment.sign as usize, zone]] +=
                    segment.covered_pixels(&band) as f64;
            }
        }
        vector
    }

    /// Ring distance from every cell to the nearest ink pixel; `matrix_size`
    /// when the bitmap is blank.
    pub fn closest_ink(&self, bitmap: &Raster) -> Array2<u32> {
        let n = self.matrix_size as i32;
        Array2::from_shape_fn((n as usize, n as usize), |(y, x)| {
            let (x, y) = (x as i32, y as i32);
            (0..n)
                .find(|&s| {
                    (-s..=s).any(|i| {
                        bitmap.is_ink(x + i, y - s)
                            || bitmap.is_ink(x + i, y + s)
                            || bitmap.is_ink(x - s, y + i)
                            || bitmap.is_ink(x + s, y + i)
                    })
                })
                .unwrap_or(n) as u32
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 18;

    fn l_shape() -> Raster {
        Raster::from_fn(N as u32, N as u32, |x, y| x < 4 || y >= 14)
    }

    #[test]
    fn slope_table() {
        let n = N as i32;
        assert_eq!(Slope::classify(3, 3, 3, n), Slope::Flat);
        assert_eq!(Slope::classify(3, n, 3, n), Slope::Undefined);
        assert_eq!(Slope::classify(3, -1, 3, n), Slope::Undefined);
        assert_eq!(Slope::classify(2, 3, 4, n), Slope::Rising);
        assert_eq!(Slope::classify(4, 3, 2, n), Slope::Falling);
        assert_eq!(Slope::classify(2, 3, 2, n), Slope::Rising);
        assert_eq!(Slope::classify(4, 3, 4, n), Slope::Flat);
        assert_eq!(Slope::classify(n, 3, 3, n), Slope::Flat);
        assert_eq!(Slope::classify(3, 3, n, n), Slope::Flat);
        assert_eq!(Slope::classify(3, 3, 17, n), Slope::Rising);
        assert_eq!(Slope::classify(3, 3, 1, n), Slope::Falling);
    }

    #[test]
    fn vector_has_48_finite_cells() {
        let extractor = FeatureExtractor::new(N);
        for bitmap in [
            l_shape(),
            Raster::new(N as u32, N as u32),
            Raster::from_fn(N as u32, N as u32, |x, y| x == 9 && y == 9),
        ] {
            let features = extractor.extract(&bitmap);
            assert_eq!(features.vector.len(), FEATURE_LEN);
            assert!(features.vector.iter().all(|v| v.is_finite()));
            assert!(features.contour.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn blank_bitmap_has_no_segments() {
        let extractor = FeatureExtractor::new(N);
        let features = extractor.extract(&Raster::new(N as u32, N as u32));
        assert!(features.segments.is_empty());
        assert!(features.slopes.iter().all(|s| *s == Slope::Undefined));
        assert_eq!(features.vector, FeatureVector::zeros());
        assert!(features.closest_ink.iter().all(|d| *d == N as u32));
    }

    #[test]
    fn solid_square_has_only_flat_outlines() {
        let extractor = FeatureExtractor::new(N);
        let features = extractor.extract(&Raster::from_fn(N as u32, N as u32, |_, _| true));
        assert_eq!(features.vector, FeatureVector::zeros());
        assert!(features.closest_ink.iter().all(|d| *d == 0));
    }

    #[test]
    fn l_shape_contour() {
        let extractor = FeatureExtractor::new(N);
        let contour = extractor.contour(&l_shape());
        // Left outline from the border hugs the stem.
        assert!(contour.row(0).iter().all(|v| *v == 0.0));
        // Right outline steps from the stem to the foot.
        assert_eq!(contour[[1, 0]], 3.0);
        assert_eq!(contour[[1, 13]], 3.0);
        assert_eq!(contour[[1, 14]], 17.0);
        // Scanning right from the centre line misses the stem entirely.
        assert_eq!(contour[[4, 0]], N as f64);
        assert_eq!(contour[[4, 15]], 9.0);
    }

    #[test]
    fn l_shape_step_lands_in_lower_zone() {
        let extractor = FeatureExtractor::new(N);
        let features = extractor.extract(&l_shape());
        let step = features
            .segments
            .iter()
            .find(|s| s.orientation == 1 && s.covered_pixels(&Rect::new(0, 0, 18, 18)) > 0)
            .expect("right outline step");
        assert_eq!(step.sign, SlopeSign::Rising);
        assert!(features.vector.get(1, SlopeSign::Rising, 2) > 0.0);
        assert_eq!(features.vector.get(1, SlopeSign::Rising, 0), 0.0);
        assert_eq!(features.vector.get(0, SlopeSign::Rising, 2), 0.0);
        assert_eq!(features.vector.get(0, SlopeSign::Falling, 2), 0.0);
    }

    #[test]
    fn closest_ink_measures_rings() {
        let extractor = FeatureExtractor::new(5);
        let dot = Raster::from_fn(5, 5, |x, y| x == 2 && y == 2);
        let grid = extractor.closest_ink(&dot);
        assert_eq!(grid[[2, 2]], 0);
        assert_eq!(grid[[1, 1]], 1);
        assert_eq!(grid[[0, 0]], 2);
        assert_eq!(grid[[0, 4]], 2);
    }
}
