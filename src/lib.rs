//! Template OCR over binary page images.
//!
//! A page is segmented into character boxes, grouped into words and cut into
//! symbols once per [`OcrEngine::load_page`]. Each [`OcrEngine::scan`] then
//! classifies the symbols against templates learned from reference sheets,
//! comparing directional-curvature features.

mod classifier;
pub mod detector;
mod error;
pub mod features;
mod geometry;
pub mod grouper;
mod raster;
mod resolver;
mod result;
mod settings;
pub mod splitter;
mod symbol;
pub mod util;

pub use classifier::*;
pub use error::*;
pub use geometry::*;
pub use raster::*;
pub use resolver::*;
pub use result::*;
pub use settings::*;
pub use symbol::*;

use detector::{find_character_rects, DetectorBounds};
use features::FeatureExtractor;
use grouper::group_words;
use splitter::GlyphSplitter;
use tracing::instrument;

#[derive(Debug, Clone, Default)]
pub struct OcrEngineBuilder {
    settings: Settings,
    grid: AlphabetGrid,
}

impl OcrEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn character_aspect_ratio(mut self, ratio: f64) -> Self {
        self.settings.character_aspect_ratio = ratio;
        self
    }

    pub fn character_spacing(mut self, spacing: CharacterSpacing) -> Self {
        self.settings.character_spacing = spacing;
        self
    }

    pub fn symbol_width(mut self, min: u32, max: u32) -> Self {
        self.settings.min_symbol_width = min;
        self.settings.max_symbol_width = max;
        self
    }

    pub fn symbol_height(mut self, min: u32, max: u32) -> Self {
        self.settings.min_symbol_height = min;
        self.settings.max_symbol_height = max;
        self
    }

    pub fn max_line_width(mut self, width: u32) -> Self {
        self.settings.max_line_width = width;
        self
    }

    pub fn matrix_size(mut self, size: usize) -> Self {
        self.settings.matrix_size = size;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.settings.metric = metric;
        self
    }

    pub fn alphabet_grid(mut self, grid: AlphabetGrid) -> Self {
        self.grid = grid;
        self
    }

    #[instrument(skip(self))]
    pub fn build(self) -> Result<OcrEngine> {
        self.settings.validate()?;
        self.grid.validate()?;
        let extractor = FeatureExtractor::new(self.settings.matrix_size);
        Ok(OcrEngine {
            settings: self.settings,
            grid: self.grid,
            classifier: Classifier::new(extractor, self.settings.metric),
            page: None,
        })
    }
}

#[derive(Debug, Clone)]
struct LoadedPage {
    raster: Raster,
    layout: Layout,
}

#[derive(Debug, Clone)]
pub struct OcrEngine {
    settings: Settings,
    grid: AlphabetGrid,
    classifier: Classifier,
    page: Option<LoadedPage>,
}

impl OcrEngine {
    pub fn builder() -> OcrEngineBuilder {
        OcrEngineBuilder::new()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut Classifier {
        &mut self.classifier
    }

    /// Learns one template per character of `alphabet` (or
    /// [`DEFAULT_ALPHABET`]) from a reference sheet laid out on the
    /// configured grid. Returns the number of templates added.
    #[instrument(level = "debug", skip(self, sheet))]
    pub fn learn_alphabet(
        &mut self,
        font: &str,
        sheet: &Raster,
        alphabet: Option<&str>,
    ) -> Result<usize> {
        self.classifier
            .learn(font, sheet, &self.grid, alphabet.unwrap_or(DEFAULT_ALPHABET))
    }

    pub fn clear_alphabets(&mut self) {
        self.classifier.clear();
    }

    /// Segments `region` of the page into words and symbols, replacing any
    /// previously loaded page.
    #[instrument(
        level = "debug",
        skip(self, raster),
        fields(width = raster.width(), height = raster.height())
    )]
    pub fn load_page(&mut self, raster: Raster, region: Region) -> Result<()> {
        region.validate()?;
        let settings = &self.settings;
        let area = region
            .to_pixels(raster.width(), raster.height())
            .intersection(&raster.bounds());
        let spacing = settings.character_spacing.resolve(raster.width());

        let bounds = DetectorBounds {
            min_width: settings.min_symbol_width as i32,
            max_width: settings.max_line_width as i32,
            min_height: settings.min_symbol_height as i32,
            max_height: settings.max_symbol_height as i32,
        };
        let rects = find_character_rects(&raster, &area, &bounds, false);
        let words = group_words(
            &rects,
            spacing,
            settings.min_symbol_height as i32,
            settings.max_symbol_height as i32,
        );

        let splitter = GlyphSplitter {
            aspect_ratio: settings.character_aspect_ratio,
            min_symbol_width: settings.min_symbol_width as i32,
            max_symbol_width: settings.max_symbol_width as i32,
        };
        let mut layout = Layout::new();
        for word in words {
            let id = layout.push_word(word);
            for symbol in splitter.split(&raster, &word) {
                layout.push_child(id, symbol);
            }
        }

        log::debug!(
            "Loaded page: {} words, {} boxes, spacing {spacing} px.",
            layout.words().len(),
            layout.len()
        );
        self.page = Some(LoadedPage { raster, layout });
        Ok(())
    }

    /// The loaded page, if any.
    pub fn raster(&self) -> Option<&Raster> {
        self.page.as_ref().map(|p| &p.raster)
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.page.as_ref().map(|p| &p.layout)
    }

    /// Classifies every word overlapping `region` and returns the words the
    /// resolver accepts, in detection order. Results of earlier scans are
    /// replaced, so the boxes always reflect the most recent resolver.
    #[instrument(level = "debug", skip(self, resolver))]
    pub fn scan(&mut self, region: Region, resolver: &dyn Resolver) -> Result<Vec<&TextBox>> {
        region.validate()?;
        let page = self.page.as_mut().ok_or(OcrError::PageNotLoaded)?;
        let (width, height) = (page.raster.width(), page.raster.height());
        log::debug!("Scanning against {} templates.", self.classifier.len());

        let mut accepted = Vec::new();
        for word in page.layout.words().to_vec() {
            if !region.overlaps(&page.layout[word].rect, width, height) {
                continue;
            }
            scan_word(&self.classifier, page, word, resolver);
            if resolver.accept_word(&page.raster, &page.layout[word]) {
                accepted.push(word);
            }
        }

        log::debug!("Scan accepted {} words.", accepted.len());
        let layout = &page.layout;
        Ok(accepted.into_iter().map(|id| &layout[id]).collect())
    }

    /// Scans a region placed relative to `anchor`: `offset_x`/`offset_y`
    /// move the anchor's top-left corner and `width`/`height` span the
    /// region, all in page fractions. Negative extents reach back from the
    /// corner; the result is clipped to the page.
    pub fn scan_relative(
        &mut self,
        anchor: &Rect,
        offset_x: f64,
        offset_y: f64,
        width: f64,
        height: f64,
        resolver: &dyn Resolver,
    ) -> Result<Vec<&TextBox>> {
        let raster = self.raster().ok_or(OcrError::PageNotLoaded)?;
        let x1 = anchor.x as f64 / raster.width() as f64 + offset_x;
        let y1 = anchor.y as f64 / raster.height() as f64 + offset_y;
        let (x2, y2) = (x1 + width, y1 + height);
        let clip = |v: f64| v.clamp(0.0, 1.0);
        let region = Region::new(
            clip(x1.min(x2)),
            clip(y1.min(y2)),
            clip(x1.max(x2)),
            clip(y1.max(y2)),
        );
        self.scan(region, resolver)
    }
}

/// Classifies the symbols of one word and rolls their best matches up into
/// the word.
fn scan_word(
    classifier: &Classifier,
    page: &mut LoadedPage,
    word: BoxId,
    resolver: &dyn Resolver,
) {
    let LoadedPage { raster, layout } = page;
    let raster = &*raster;
    let children = layout[word].children().to_vec();
    // Words that could not be split are classified as a single symbol.
    let symbols = if children.is_empty() { vec![word] } else { children };

    for &id in &symbols {
        let text_box = &layout[id];
        let matches = match Symbol::extract(raster, &text_box.rect, classifier.extractor()) {
            Some(unknown) => classifier.classify(&unknown, |candidate| {
                resolver.accept_symbol(raster, text_box, candidate)
            }),
            None => {
                log::trace!("No ink in symbol box {:?}.", text_box.rect);
                Vec::new()
            }
        };
        let complete = !matches.is_empty();
        if let Some(text_box) = layout.get_mut(id) {
            text_box.set_results(matches, complete);
        }
    }

    if layout[word].is_leaf() {
        return;
    }
    let best = symbols
        .iter()
        .filter_map(|&id| layout[id].best().cloned())
        .collect::<Vec<_>>();
    let complete = best.len() == symbols.len();
    if let Some(text_box) = layout.get_mut(word) {
        text_box.set_results(best, complete);
    }
}
