use crate::{Raster, Symbol, TextBox};

/// Acceptance policy consulted while a page is scanned.
pub trait Resolver {
    /// Whether `symbol` may be considered as a match for `text_box`.
    fn accept_symbol(&self, raster: &Raster, text_box: &TextBox, symbol: &Symbol) -> bool;

    /// Whether a scanned word is reported.
    fn accept_word(&self, raster: &Raster, text_box: &TextBox) -> bool;
}

/// Accepts any symbol. With a word list, only words that match one of the
/// list within `max_errors` edits are reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleResolver {
    pub max_errors: usize,
    pub words: Vec<String>,
}

impl SimpleResolver {
    pub fn new<I, S>(max_errors: usize, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            max_errors,
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}

impl Resolver for SimpleResolver {
    fn accept_symbol(&self, _raster: &Raster, _text_box: &TextBox, _symbol: &Symbol) -> bool {
        true
    }

    fn accept_word(&self, _raster: &Raster, text_box: &TextBox) -> bool {
        if self.words.is_empty() {
            return true;
        }
        let text = text_box.text();
        self.words
            .iter()
            .any(|word| compare_words(word, &text, self.max_errors, false))
    }
}

/// Restricts symbols to letters and/or digits, depending on which kinds the
/// word list contains. Without a word list both kinds are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterResolver {
    words: SimpleResolver,
    letters: bool,
    digits: bool,
}

impl LetterResolver {
    pub fn new<I, S>(max_errors: usize, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words = SimpleResolver::new(max_errors, words);
        let chars = || words.words.iter().flat_map(|w| w.chars());
        let unrestricted = words.words.is_empty();
        Self {
            letters: unrestricted || chars().any(char::is_alphabetic),
            digits: unrestricted || chars().any(|c| c.is_ascii_digit()),
            words,
        }
    }
}

impl Default for LetterResolver {
    fn default() -> Self {
        Self::new(0, Vec::<String>::new())
    }
}

impl Resolver for LetterResolver {
    fn accept_symbol(&self, _raster: &Raster, _text_box: &TextBox, symbol: &Symbol) -> bool {
        symbol.label().is_some_and(|c| {
            (self.letters && c.is_alphabetic()) || (self.digits && c.is_ascii_digit())
        })
    }

    fn accept_word(&self, raster: &Raster, text_box: &TextBox) -> bool {
        self.words.accept_word(raster, text_box)
    }
}

/// Digits only; every word is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumericResolver;

impl Resolver for NumericResolver {
    fn accept_symbol(&self, _raster: &Raster, _text_box: &TextBox, symbol: &Symbol) -> bool {
        symbol.label().is_some_and(|c| c.is_ascii_digit())
    }

    fn accept_word(&self, _raster: &Raster, _text_box: &TextBox) -> bool {
        true
    }
}

/// Fuzzy match of `candidate` against `template`, tolerating up to
/// `max_errors` substituted, inserted or dropped characters.
///
/// A `\r` in the template matches any character. A trailing `^` lets the
/// candidate run on past the end of the template.
pub fn compare_words(
    template: &str,
    candidate: &str,
    max_errors: usize,
    case_sensitive: bool,
) -> bool {
    let fold = |s: &str| -> Vec<char> {
        if case_sensitive {
            s.chars().collect()
        } else {
            s.chars().flat_map(char::to_lowercase).collect()
        }
    };
    let mut template = fold(template);
    let candidate = fold(candidate);
    let open_ended = template.last() == Some(&'^');
    if open_ended {
        template.pop();
    }

    edit_errors(&template, &candidate, max_errors, 0, open_ended) <= max_errors
}

fn edit_errors(
    template: &[char],
    candidate: &[char],
    max_errors: usize,
    errors: usize,
    open_ended: bool,
) -> usize {
    let next = |t: usize, c: usize, errors: usize| {
        edit_errors(&template[t..], &candidate[c..], max_errors, errors, open_ended)
    };
    let mut i = 0;
    while i < template.len() && i < candidate.len() {
        let t = template[i];
        if t != '\r' && t != candidate[i] {
            let errors = errors + 1;
            if errors > max_errors {
                return errors;
            }
            return next(i + 1, i, errors)
                .min(next(i, i + 1, errors))
                .min(next(i + 1, i + 1, errors));
        }
        i += 1;
    }

    if open_ended && i == template.len() {
        return errors;
    }
    errors + (template.len() - i).abs_diff(candidate.len() - i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{features::FeatureExtractor, Layout, Rect};

    #[test]
    fn exact_and_case_folding() {
        assert!(compare_words("Invoice", "invoice", 0, false));
        assert!(!compare_words("Invoice", "invoice", 0, true));
        assert!(compare_words("", "", 0, false));
    }

    #[test]
    fn edits_within_budget() {
        let template = "abcdefghijklmnop";
        assert!(compare_words(template, "abcdxfghijklmnop", 1, false));
        assert!(compare_words(template, "abcdxxfghijklmnop", 2, false));
        assert!(!compare_words(template, "abcdxxxfghijklmnop", 2, false));
        assert!(compare_words(template, "abcdfghijklmnop", 1, false));
        assert!(compare_words(template, "axcdexghijklmnop", 2, false));
        assert!(!compare_words(template, "axcdexghijklmnop", 1, false));
        assert!(compare_words(template, "abcdefghijklmn", 2, false));
        assert!(!compare_words(template, "abcdefghijklmn", 1, false));
    }

    #[test]
    fn wildcards_and_open_ends() {
        assert!(compare_words("a\rc", "abc", 0, false));
        assert!(compare_words("a\rc", "axc", 0, false));
        assert!(!compare_words("total", "totals123", 0, false));
        assert!(compare_words("total^", "totals123", 0, false));
        assert!(!compare_words("total^", "tota", 0, false));
    }

    fn symbol(label: char) -> Symbol {
        let raster = Raster::from_pattern(&["##", "##"]);
        Symbol::from_bitmap(raster, &FeatureExtractor::new(18)).with_label(label, "test")
    }

    #[test]
    fn symbol_policies() {
        let raster = Raster::new(1, 1);
        let mut layout = Layout::new();
        let word = layout.push_word(Rect::new(0, 0, 1, 1));
        let text_box = &layout[word];

        let digits = LetterResolver::new(0, ["1234"]);
        assert!(digits.accept_symbol(&raster, text_box, &symbol('7')));
        assert!(!digits.accept_symbol(&raster, text_box, &symbol('A')));

        let letters = LetterResolver::new(0, ["Total"]);
        assert!(letters.accept_symbol(&raster, text_box, &symbol('x')));
        assert!(!letters.accept_symbol(&raster, text_box, &symbol('7')));

        let any = LetterResolver::default();
        assert!(any.accept_symbol(&raster, text_box, &symbol('A')));
        assert!(any.accept_symbol(&raster, text_box, &symbol('7')));
        assert!(!any.accept_symbol(&raster, text_box, &symbol('.')));

        assert!(NumericResolver.accept_symbol(&raster, text_box, &symbol('0')));
        assert!(!NumericResolver.accept_symbol(&raster, text_box, &symbol('O')));
        assert!(SimpleResolver::default().accept_symbol(&raster, text_box, &symbol('.')));
    }

    #[test]
    fn word_lists_filter_unscanned_words() {
        let raster = Raster::new(1, 1);
        let mut layout = Layout::new();
        let word = layout.push_word(Rect::new(0, 0, 1, 1));
        assert!(SimpleResolver::default().accept_word(&raster, &layout[word]));
        assert!(!SimpleResolver::new(0, ["total"]).accept_word(&raster, &layout[word]));
        assert!(SimpleResolver::new(2, ["ab"]).accept_word(&raster, &layout[word]));
    }
}
