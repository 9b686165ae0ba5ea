use std::sync::Arc;

use float_ord::FloatOrd;
use tracing::instrument;

use crate::{
    detector::{find_character_rects, DetectorBounds},
    features::FeatureExtractor,
    OcrError, Raster, Rect, Symbol, SymbolMatch,
};

/// Characters of the reference sheet, row by row.
pub const DEFAULT_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789@+'/\\\"*.-:,&()=*";

/// Distance between an unknown glyph and a template. Every metric scores
/// identical glyphs 0 and grows with dissimilarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    /// Sum of squared differences of the curvature vectors.
    #[default]
    Curvature,
    /// Sum of absolute differences of the curvature vectors.
    CurvatureAbsolute,
    /// Mean difference of the nearest-ink grids, relative to the matrix size.
    Template,
    /// Mean difference of the contour tables, relative to the matrix size.
    Contour,
}

impl Metric {
    pub fn distance(&self, unknown: &Symbol, template: &Symbol) -> f64 {
        match self {
            Metric::Curvature => unknown.vector().squared_distance(template.vector()),
            Metric::CurvatureAbsolute => unknown.vector().absolute_distance(template.vector()),
            Metric::Template => {
                let n = unknown.closest_ink().nrows().max(1) as f64;
                mean_abs_diff(
                    unknown.closest_ink().iter().map(|v| *v as f64),
                    template.closest_ink().iter().map(|v| *v as f64),
                ) / n
            }
            Metric::Contour => {
                let n = unknown.contour().ncols().max(1) as f64;
                mean_abs_diff(
                    unknown.contour().iter().copied(),
                    template.contour().iter().copied(),
                ) / n
            }
        }
    }
}

fn mean_abs_diff(a: impl Iterator<Item = f64>, b: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = a
        .zip(b)
        .fold((0.0, 0usize), |(sum, count), (a, b)| (sum + (a - b).abs(), count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Layout of a reference sheet: `columns`×`rows` cells, filled row by row
/// with the characters of an alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlphabetGrid {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl Default for AlphabetGrid {
    fn default() -> Self {
        Self {
            columns: 13,
            rows: 6,
            cell_width: 71,
            cell_height: 69,
        }
    }
}

impl AlphabetGrid {
    pub fn cells(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// The `index`-th cell, inset by one pixel so grid lines stay out.
    pub fn cell(&self, index: usize) -> Rect {
        let column = (index % self.columns.max(1) as usize) as i32;
        let row = (index / self.columns.max(1) as usize) as i32;
        let (w, h) = (self.cell_width as i32, self.cell_height as i32);
        Rect::new(w * column + 1, h * row + 1, w - 2, h - 2)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.columns == 0 || self.rows == 0 {
            return Err(OcrError::InvalidConfiguration(format!(
                "alphabet grid needs at least one cell, got {}x{}",
                self.columns, self.rows
            )));
        }
        if self.cell_width < 3 || self.cell_height < 3 {
            return Err(OcrError::InvalidConfiguration(format!(
                "alphabet cells must be at least 3x3 pixels, got {}x{}",
                self.cell_width, self.cell_height
            )));
        }
        Ok(())
    }

    fn check_alphabet(&self, alphabet: &str) -> crate::Result<usize> {
        let len = alphabet.chars().count();
        if len == 0 {
            return Err(OcrError::InvalidAlphabet("alphabet is empty".into()));
        }
        if len > self.cells() {
            return Err(OcrError::InvalidAlphabet(format!(
                "{len} characters do not fit a grid of {} cells",
                self.cells()
            )));
        }
        Ok(len)
    }
}

/// Nearest-neighbour matcher over a set of learned templates.
#[derive(Debug, Clone)]
pub struct Classifier {
    extractor: FeatureExtractor,
    metric: Metric,
    templates: Arc<Vec<Arc<Symbol>>>,
}

impl Classifier {
    pub fn new(extractor: FeatureExtractor, metric: Metric) -> Self {
        Self {
            extractor,
            metric,
            templates: Arc::default(),
        }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Snapshot of the current template set. Later learning does not
    /// affect a snapshot already handed out.
    pub fn templates(&self) -> Arc<Vec<Arc<Symbol>>> {
        Arc::clone(&self.templates)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn clear(&mut self) {
        self.templates = Arc::default();
    }

    pub fn add_template(&mut self, symbol: Symbol) {
        self.extend([symbol]);
    }

    fn extend(&mut self, symbols: impl IntoIterator<Item = Symbol>) {
        let mut next = Vec::clone(&self.templates);
        next.extend(symbols.into_iter().map(Arc::new));
        self.templates = Arc::new(next);
    }

    /// Reads one template per alphabet character off a reference sheet and
    /// returns how many were added. Blank cells are skipped.
    #[instrument(level = "debug", skip(self, raster))]
    pub fn learn(
        &mut self,
        font: &str,
        raster: &Raster,
        grid: &AlphabetGrid,
        alphabet: &str,
    ) -> crate::Result<usize> {
        grid.validate()?;
        grid.check_alphabet(alphabet)?;

        let mut learned = Vec::new();
        for (index, label) in alphabet.chars().enumerate() {
            let cell = grid.cell(index);
            let bounds = DetectorBounds {
                min_width: 1,
                max_width: cell.width,
                min_height: 1,
                max_height: cell.height,
            };
            let glyph = find_character_rects(raster, &cell, &bounds, true)
                .into_iter()
                .reduce(|a, b| a.union(&b));
            let Some(glyph) = glyph else {
                log::trace!("Cell {index} ({label:?}) is blank, skipping.");
                continue;
            };
            match Symbol::extract(raster, &glyph, &self.extractor) {
                Some(symbol) => learned.push(symbol.with_label(label, font)),
                None => log::trace!("Cell {index} ({label:?}) has no usable glyph."),
            }
        }

        let count = learned.len();
        self.extend(learned);
        log::debug!(
            "Learned {count} templates for font {font:?}, {} in total.",
            self.len()
        );
        Ok(count)
    }

    /// Scores `unknown` against every template `accept` lets through, best
    /// first. Equal scores keep the order in which templates were learned.
    pub fn classify(
        &self,
        unknown: &Symbol,
        mut accept: impl FnMut(&Symbol) -> bool,
    ) -> Vec<SymbolMatch> {
        let mut matches = self
            .templates
            .iter()
            .filter(|template| accept(template))
            .map(|template| SymbolMatch {
                score: self.metric.distance(unknown, template),
                symbol: Arc::clone(template),
            })
            .collect::<Vec<_>>();
        matches.sort_by_key(|m| FloatOrd(m.score));
        matches
    }

    pub fn best(&self, unknown: &Symbol, accept: impl FnMut(&Symbol) -> bool) -> Option<SymbolMatch> {
        self.classify(unknown, accept).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const L: [&str; 7] = [
        "#....", "#....", "#....", "#....", "#....", "#....", "#####",
    ];
    const O: [&str; 7] = [
        ".###.", "#...#", "#...#", "#...#", "#...#", "#...#", ".###.",
    ];
    const T: [&str; 7] = [
        "#####", "..#..", "..#..", "..#..", "..#..", "..#..", "..#..",
    ];

    fn glyph(pattern: &[&str]) -> Raster {
        let mut raster = Raster::new(14, 18);
        raster.draw_pattern(2, 2, pattern, 2);
        raster
    }

    fn classifier(metric: Metric) -> Classifier {
        let extractor = FeatureExtractor::new(18);
        let mut classifier = Classifier::new(extractor, metric);
        for (label, pattern) in [('L', L), ('O', O), ('T', T)] {
            let raster = glyph(&pattern);
            let symbol = Symbol::extract(&raster, &raster.bounds(), &extractor).unwrap();
            classifier.add_template(symbol.with_label(label, "test"));
        }
        classifier
    }

    fn unknown(classifier: &Classifier, pattern: &[&str]) -> Symbol {
        let raster = glyph(pattern);
        Symbol::extract(&raster, &raster.bounds(), classifier.extractor()).unwrap()
    }

    #[test]
    fn exact_copy_ranks_first() {
        let classifier = classifier(Metric::Curvature);
        for (label, pattern) in [('L', L), ('O', O), ('T', T)] {
            let matches = classifier.classify(&unknown(&classifier, &pattern), |_| true);
            assert_eq!(matches.len(), 3);
            assert_eq!(matches[0].label(), Some(label));
            assert_eq!(matches[0].score, 0.0);
            assert!(matches.windows(2).all(|w| w[0].score <= w[1].score));
        }
    }

    #[test]
    fn rejecting_every_template_is_no_match() {
        let classifier = classifier(Metric::Curvature);
        let glyph = unknown(&classifier, &O);
        assert!(classifier.classify(&glyph, |_| false).is_empty());
        assert!(classifier.best(&glyph, |_| false).is_none());
        assert!(Classifier::new(FeatureExtractor::new(18), Metric::Curvature)
            .best(&glyph, |_| true)
            .is_none());
    }

    #[test]
    fn predicate_filters_candidates() {
        let classifier = classifier(Metric::Curvature);
        let glyph = unknown(&classifier, &O);
        let best = classifier
            .best(&glyph, |s| s.label() != Some('O'))
            .unwrap();
        assert_ne!(best.label(), Some('O'));
        assert!(best.score > 0.0);
    }

    #[test]
    fn alternative_metrics_agree_on_the_winner() {
        for metric in [Metric::CurvatureAbsolute, Metric::Template, Metric::Contour] {
            let classifier = classifier(metric);
            for (label, pattern) in [('L', L), ('O', O), ('T', T)] {
                let best = classifier
                    .best(&unknown(&classifier, &pattern), |_| true)
                    .unwrap();
                assert_eq!(best.label(), Some(label), "{metric:?}");
                assert_eq!(best.score, 0.0);
            }
        }
    }

    #[test]
    fn learning_reads_the_grid() {
        let grid = AlphabetGrid {
            columns: 3,
            rows: 1,
            cell_width: 20,
            cell_height: 20,
        };
        let mut sheet = Raster::new(60, 20);
        sheet.draw_pattern(4, 3, &L, 2);
        sheet.draw_pattern(24, 3, &O, 2);

        let mut classifier = Classifier::new(FeatureExtractor::new(18), Metric::Curvature);
        let before = classifier.templates();
        assert_eq!(classifier.learn("mono", &sheet, &grid, "LOX").unwrap(), 2);
        assert!(before.is_empty());

        let templates = classifier.templates();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].label(), Some('L'));
        assert_eq!(templates[1].label(), Some('O'));
        assert_eq!(templates[1].font(), Some("mono"));

        let glyph = unknown(&classifier, &O);
        assert_eq!(classifier.best(&glyph, |_| true).unwrap().label(), Some('O'));

        classifier.clear();
        assert!(classifier.is_empty());
        assert_eq!(templates.len(), 2);
    }

    #[test]
    fn alphabet_must_fit_the_grid() {
        let grid = AlphabetGrid {
            columns: 2,
            rows: 1,
            cell_width: 20,
            cell_height: 20,
        };
        let sheet = Raster::new(40, 20);
        let mut classifier = Classifier::new(FeatureExtractor::new(18), Metric::Curvature);
        assert!(matches!(
            classifier.learn("mono", &sheet, &grid, ""),
            Err(OcrError::InvalidAlphabet(_))
        ));
        assert!(matches!(
            classifier.learn("mono", &sheet, &grid, "ABC"),
            Err(OcrError::InvalidAlphabet(_))
        ));
        assert_eq!(DEFAULT_ALPHABET.chars().count(), AlphabetGrid::default().cells());
    }
}
