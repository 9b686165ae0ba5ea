use std::{fmt, ops::Index, sync::Arc};

use crate::{Rect, Symbol};

/// One candidate classification: a template and its distance to the glyph.
/// Lower scores are better matches.
#[derive(Debug, Clone)]
pub struct SymbolMatch {
    pub score: f64,
    pub symbol: Arc<Symbol>,
}

impl SymbolMatch {
    pub fn label(&self) -> Option<char> {
        self.symbol.label()
    }

    /// Case-insensitive label comparison.
    pub fn matches_label(&self, label: char) -> bool {
        self.label()
            .is_some_and(|own| own.to_lowercase().eq(label.to_lowercase()))
    }
}

impl PartialEq for SymbolMatch {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && Arc::ptr_eq(&self.symbol, &other.symbol)
    }
}

/// Handle of a box inside a [`Layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub rect: Rect,
    index: usize,
    parent: Option<BoxId>,
    children: Vec<BoxId>,
    results: Vec<SymbolMatch>,
    complete: bool,
}

impl TextBox {
    fn new(rect: Rect, index: usize, parent: Option<BoxId>) -> Self {
        Self {
            rect,
            index,
            parent,
            children: Vec::new(),
            results: Vec::new(),
            complete: false,
        }
    }

    /// Position among its siblings.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parent(&self) -> Option<BoxId> {
        self.parent
    }

    pub fn children(&self) -> &[BoxId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// For a symbol, every accepted candidate ranked best first. For a word,
    /// the best candidate of each symbol, left to right.
    pub fn results(&self) -> &[SymbolMatch] {
        &self.results
    }

    pub fn best(&self) -> Option<&SymbolMatch> {
        self.results.first()
    }

    /// Whether the last scan found a candidate for every symbol.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The results that make up the recognised text.
    fn chosen(&self) -> &[SymbolMatch] {
        if self.is_leaf() {
            &self.results[..self.results.len().min(1)]
        } else {
            &self.results
        }
    }

    pub fn text(&self) -> String {
        self.chosen().iter().filter_map(SymbolMatch::label).collect()
    }

    /// Mean score of the recognised text, `None` before a successful scan.
    pub fn score(&self) -> Option<f64> {
        let chosen = self.chosen();
        if chosen.is_empty() {
            return None;
        }
        Some(chosen.iter().map(|m| m.score).sum::<f64>() / chosen.len() as f64)
    }

    pub(crate) fn set_results(&mut self, results: Vec<SymbolMatch>, complete: bool) {
        self.results = results;
        self.complete = complete;
    }
}

impl fmt::Display for TextBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// All boxes of a page: words at the top level, their symbols as children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    boxes: Vec<TextBox>,
    words: Vec<BoxId>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_word(&mut self, rect: Rect) -> BoxId {
        let id = BoxId(self.boxes.len());
        self.boxes.push(TextBox::new(rect, self.words.len(), None));
        self.words.push(id);
        id
    }

    pub fn push_child(&mut self, parent: BoxId, rect: Rect) -> BoxId {
        let id = BoxId(self.boxes.len());
        let index = self.boxes[parent.0].children.len();
        self.boxes.push(TextBox::new(rect, index, Some(parent)));
        self.boxes[parent.0].children.push(id);
        id
    }

    pub fn get(&self, id: BoxId) -> Option<&TextBox> {
        self.boxes.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: BoxId) -> Option<&mut TextBox> {
        self.boxes.get_mut(id.0)
    }

    /// Word boxes in detection order.
    pub fn words(&self) -> &[BoxId] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Every box without children, words that could not be split included.
    pub fn leaves(&self) -> impl Iterator<Item = BoxId> + '_ {
        (0..self.boxes.len())
            .map(BoxId)
            .filter(|id| self.boxes[id.0].is_leaf())
    }
}

impl Index<BoxId> for Layout {
    type Output = TextBox;

    fn index(&self, id: BoxId) -> &TextBox {
        &self.boxes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_links() {
        let mut layout = Layout::new();
        let word = layout.push_word(Rect::new(0, 0, 30, 10));
        let a = layout.push_child(word, Rect::new(0, 0, 10, 10));
        let b = layout.push_child(word, Rect::new(10, 0, 10, 10));
        let other = layout.push_word(Rect::new(50, 0, 10, 10));

        assert_eq!(layout.words(), &[word, other]);
        assert_eq!(layout[word].children(), &[a, b]);
        assert_eq!(layout[b].parent(), Some(word));
        assert_eq!(layout[b].index(), 1);
        assert_eq!(layout[other].index(), 1);
        assert_eq!(layout.leaves().collect::<Vec<_>>(), vec![a, b, other]);
    }

    #[test]
    fn unscanned_box_has_no_text() {
        let mut layout = Layout::new();
        let word = layout.push_word(Rect::new(0, 0, 30, 10));
        assert_eq!(layout[word].text(), "");
        assert_eq!(layout[word].score(), None);
        assert!(!layout[word].is_complete());
    }
}
