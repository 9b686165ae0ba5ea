use std::collections::HashSet;

use tracing::instrument;

use crate::{Raster, Rect};

const TOP: u8 = 1;
const LEFT: u8 = 2;
const BOTTOM: u8 = 4;
const RIGHT: u8 = 8;
const ALL_SIDES: u8 = TOP | LEFT | BOTTOM | RIGHT;

/// Size window a detected shape must fit into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorBounds {
    pub min_width: i32,
    pub max_width: i32,
    pub min_height: i32,
    pub max_height: i32,
}

impl DetectorBounds {
    fn accepts(&self, rect: &Rect) -> bool {
        (self.min_width..=self.max_width).contains(&rect.width)
            && (self.min_height..=self.max_height).contains(&rect.height)
    }
}

/// Finds one tight bounding rectangle per connected glyph shape inside
/// `region`.
///
/// Every ink pixel without ink directly above it seeds a box that first
/// grows until its edges are clear of ink and then shrinks back onto the
/// shape. Shapes outside `bounds` are dropped. Outside of `learning` mode
/// repeated rectangles are reported once, in order of first detection.
#[instrument(level = "debug", skip(raster, bounds))]
pub fn find_character_rects(
    raster: &Raster,
    region: &Rect,
    bounds: &DetectorBounds,
    learning: bool,
) -> Vec<Rect> {
    let limit = region.intersection(&raster.bounds());
    let mut seen = HashSet::new();
    let mut rects = Vec::new();
    let mut rejected = 0usize;

    for y in limit.y..limit.bottom() {
        for x in limit.x..limit.right() {
            if !raster.is_ink(x, y) || raster.is_ink(x, y - 1) {
                continue;
            }

            let rect = fit_box(raster, &limit, x, y, bounds);
            if !bounds.accepts(&rect) || scan_bounds(raster, &rect) != ALL_SIDES {
                rejected += 1;
                continue;
            }
            if learning || seen.insert(rect) {
                rects.push(rect);
            }
        }
    }

    log::debug!(
        "Detected {} character rectangles, rejected {rejected} seeds.",
        rects.len()
    );
    rects
}

/// Grow-then-shrink box fitting from the seed pixel at `x`, `y`.
fn fit_box(raster: &Raster, limit: &Rect, x: i32, y: i32, bounds: &DetectorBounds) -> Rect {
    let mut rect = Rect::new(x, y, 2, 2).intersection(limit);

    // Overshoot the maximum a little so oversized shapes stay oversized.
    while rect.height < bounds.max_height + 3 && rect.width < bounds.max_width + 3 {
        let mask = scan_bounds(raster, &rect);
        if mask == 0 {
            break;
        }

        let mut grown = rect;
        if mask & TOP != 0 {
            grown.y -= 1;
            grown.height += 1;
        }
        if mask & LEFT != 0 {
            grown.x -= 1;
            grown.width += 1;
        }
        if mask & BOTTOM != 0 {
            grown.height += 1;
        }
        if mask & RIGHT != 0 {
            grown.width += 1;
        }

        let grown = grown.intersection(limit);
        if grown == rect {
            break;
        }
        rect = grown;
    }

    while rect.height > bounds.min_height && rect.width > bounds.min_width {
        let mask = scan_bounds(raster, &rect);
        if mask == ALL_SIDES {
            break;
        }

        if mask & TOP == 0 {
            rect.y += 1;
            rect.height -= 1;
        }
        if mask & LEFT == 0 {
            rect.x += 1;
            rect.width -= 1;
        }
        if mask & BOTTOM == 0 {
            rect.height -= 1;
        }
        if mask & RIGHT == 0 {
            rect.width -= 1;
        }
        if rect.is_empty() {
            break;
        }
    }

    rect
}

/// Bit mask of the sides of `rect` whose outermost row or column holds ink.
fn scan_bounds(raster: &Raster, rect: &Rect) -> u8 {
    if rect.is_empty() {
        return 0;
    }
    let mut mask = 0;
    if raster.row_has_ink(rect.y, rect.x, rect.width) {
        mask |= TOP;
    }
    if raster.column_has_ink(rect.x, rect.y, rect.height) {
        mask |= LEFT;
    }
    if raster.row_has_ink(rect.bottom() - 1, rect.x, rect.width) {
        mask |= BOTTOM;
    }
    if raster.column_has_ink(rect.right() - 1, rect.y, rect.height) {
        mask |= RIGHT;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: DetectorBounds = DetectorBounds {
        min_width: 1,
        max_width: 20,
        min_height: 1,
        max_height: 20,
    };

    fn detect(raster: &Raster, bounds: &DetectorBounds, learning: bool) -> Vec<Rect> {
        find_character_rects(raster, &raster.bounds(), bounds, learning)
    }

    #[test]
    fn single_block() {
        let mut raster = Raster::new(40, 30);
        raster.fill_rect(&Rect::new(10, 10, 5, 7), true);
        assert_eq!(detect(&raster, &BOUNDS, false), vec![Rect::new(10, 10, 5, 7)]);
    }

    #[test]
    fn blocks_come_out_in_seed_order() {
        let mut raster = Raster::new(40, 30);
        raster.fill_rect(&Rect::new(20, 5, 4, 4), true);
        raster.fill_rect(&Rect::new(3, 12, 6, 9), true);
        assert_eq!(
            detect(&raster, &BOUNDS, false),
            vec![Rect::new(20, 5, 4, 4), Rect::new(3, 12, 6, 9)]
        );
    }

    #[test]
    fn horizontal_rule_is_rejected() {
        let mut raster = Raster::new(80, 10);
        raster.fill_rect(&Rect::new(5, 4, 60, 2), true);
        assert!(detect(&raster, &BOUNDS, false).is_empty());
    }

    #[test]
    fn speckle_is_rejected() {
        let mut raster = Raster::new(20, 20);
        raster.fill_rect(&Rect::new(8, 8, 1, 1), true);
        let bounds = DetectorBounds {
            min_width: 3,
            min_height: 3,
            ..BOUNDS
        };
        assert!(detect(&raster, &bounds, false).is_empty());
        assert_eq!(detect(&raster, &BOUNDS, false), vec![Rect::new(8, 8, 1, 1)]);
    }

    #[test]
    fn shapes_with_several_seeds_are_reported_once() {
        let mut raster = Raster::new(30, 30);
        raster.draw_pattern(
            5,
            5,
            &[
                "#...#", //
                "#...#", //
                "#...#", //
                "#####", //
            ],
            2,
        );
        let found = detect(&raster, &BOUNDS, false);
        assert_eq!(found, vec![Rect::new(5, 5, 10, 8)]);

        let learned = detect(&raster, &BOUNDS, true);
        assert!(learned.len() > 1);
        assert!(learned.iter().all(|r| *r == Rect::new(5, 5, 10, 8)));
    }

    #[test]
    fn glyph_touching_the_edge() {
        let mut raster = Raster::new(20, 20);
        raster.fill_rect(&Rect::new(0, 0, 4, 6), true);
        raster.fill_rect(&Rect::new(15, 14, 5, 6), true);
        assert_eq!(
            detect(&raster, &BOUNDS, false),
            vec![Rect::new(0, 0, 4, 6), Rect::new(15, 14, 5, 6)]
        );
    }

    #[test]
    fn growth_stays_inside_the_region() {
        let mut raster = Raster::new(40, 20);
        raster.fill_rect(&Rect::new(5, 5, 30, 4), true);
        let region = Rect::new(0, 0, 20, 20);
        let found = find_character_rects(&raster, &region, &BOUNDS, false);
        assert_eq!(found, vec![Rect::new(5, 5, 15, 4)]);
    }
}
