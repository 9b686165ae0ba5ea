use float_ord::FloatOrd;
use tracing::instrument;

use crate::{Raster, Rect};

/// Cuts word boxes into symbol boxes along vertical ink valleys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphSplitter {
    /// Expected glyph width over ink height.
    pub aspect_ratio: f64,
    pub min_symbol_width: i32,
    pub max_symbol_width: i32,
}

impl GlyphSplitter {
    /// Returns one rectangle per symbol, left to right, each spanning the
    /// full height of `word`.
    #[instrument(level = "trace", skip(self, raster))]
    pub fn split(&self, raster: &Raster, word: &Rect) -> Vec<Rect> {
        let mut symbols = Vec::new();
        for (offset, width) in self.column_ranges(raster, word) {
            let range = Rect::new(word.x + offset, word.y, width, word.height);
            self.split_range(raster, &range, &mut symbols);
        }
        log::trace!("Split word {word:?} into {} symbols.", symbols.len());
        symbols
    }

    /// `(offset, width)` of every run of ink-bearing columns, relative to
    /// the word's left edge.
    pub fn column_ranges(&self, raster: &Raster, word: &Rect) -> Vec<(i32, i32)> {
        let has_ink = |offset: i32| raster.column_fill(word.x + offset, word.y, word.height) > 0.0;
        let mut ranges = Vec::new();
        let mut offset = 0;

        while offset < word.width {
            while offset < word.width && !has_ink(offset) {
                offset += 1;
            }
            let start = offset;
            while offset < word.width && has_ink(offset) {
                offset += 1;
            }
            if offset > start {
                ranges.push((start, offset - start));
            }
        }
        ranges
    }

    /// How many glyphs an unbroken run of ink most likely holds, never more
    /// than minimum-width slots fit into it.
    pub fn symbol_count(&self, raster: &Raster, range: &Rect) -> i32 {
        let ink_height = raster
            .borders(range)
            .map_or(range.height, |b| range.height - b.top - b.bottom)
            .max(1);
        let by_aspect = (range.width as f64 / (self.aspect_ratio * ink_height as f64)).ceil();
        let by_width = (range.width as f64 / self.max_symbol_width.max(1) as f64).ceil();
        let slots = (range.width / self.min_symbol_width.max(1)).max(1);
        by_aspect.max(by_width).min(slots as f64) as i32
    }

    fn split_range(&self, raster: &Raster, range: &Rect, symbols: &mut Vec<Rect>) {
        let count = self.symbol_count(raster, range);
        if count <= 1 {
            symbols.push(*range);
            return;
        }

        let first = symbols.len();
        let step = range.width as f64 / count as f64;
        let radius = self.min_symbol_width / 4;
        let mut prev = 0;

        for i in 1..count {
            let centre = (step * i as f64) as i32;
            let valley = (centre - radius..=centre + radius)
                .filter(|&c| c > prev && c <= range.width)
                .min_by_key(|&c| FloatOrd(raster.column_fill(range.x + c, range.y, range.height)));
            let Some(cut) = valley else {
                continue;
            };
            // Narrow pieces stay attached to the next one.
            if cut - prev > self.min_symbol_width {
                symbols.push(Rect::new(range.x + prev, range.y, cut - prev, range.height));
                prev = cut;
            }
        }

        let rest = range.width - prev;
        let committed = symbols.len() > first;
        match symbols.last_mut() {
            Some(last) if committed && rest <= self.min_symbol_width => {
                last.width += rest;
            }
            _ if rest > 0 => {
                symbols.push(Rect::new(range.x + prev, range.y, rest, range.height));
            }
            _ => {}
        }
    }
}
