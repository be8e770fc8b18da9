//! Options handed through to atomic conversion functions.
//!
//! The engine never reads these itself. Functions reach them through
//! `Convert::options()`.

/// Configuration for the built-in atomic conversions.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Trim surrounding whitespace before parsing text.
    pub trim_strings: bool,
    /// Words accepted as `true` when parsing text (case-insensitive).
    pub true_words: Vec<String>,
    /// Words accepted as `false` when parsing text (case-insensitive).
    pub false_words: Vec<String>,
    /// Fixed number of fractional digits when formatting floats. `None` uses
    /// the shortest round-trip form.
    pub float_precision: Option<usize>,
    /// Allow float → integer conversions that drop a fractional part.
    pub allow_lossy_float: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            trim_strings: true,
            true_words: vec!["true".into(), "yes".into(), "on".into(), "1".into()],
            false_words: vec!["false".into(), "no".into(), "off".into(), "0".into()],
            float_precision: None,
            allow_lossy_float: true,
        }
    }
}

impl ConvertOptions {
    /// Create options with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trim_strings(mut self, trim: bool) -> Self {
        self.trim_strings = trim;
        self
    }

    pub fn with_true_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.true_words = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_false_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.false_words = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_float_precision(mut self, precision: Option<usize>) -> Self {
        self.float_precision = precision;
        self
    }

    pub fn with_allow_lossy_float(mut self, allow: bool) -> Self {
        self.allow_lossy_float = allow;
        self
    }

    /// Interpret `text` as a boolean word, if it is one.
    pub fn parse_bool_word(&self, text: &str) -> Option<bool> {
        if self.true_words.iter().any(|w| w.eq_ignore_ascii_case(text)) {
            Some(true)
        } else if self.false_words.iter().any(|w| w.eq_ignore_ascii_case(text)) {
            Some(false)
        } else {
            None
        }
    }

    /// Apply `trim_strings` to `text`.
    pub fn prepare<'a>(&self, text: &'a str) -> &'a str {
        if self.trim_strings { text.trim() } else { text }
    }
}
