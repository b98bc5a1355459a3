//! Sentence boundary detection.
//!
//! A small punctuation-driven segmenter standing in for an upstream
//! sentence splitter:
//! - Period, question mark, exclamation point end a sentence
//! - Optionally semicolons (when `include_semicolons` is enabled)
//! - Optionally line breaks (when `split_on_newlines` is enabled)
//!
//! Periods that follow a known abbreviation ("Dr.", "pt.", "approx.") do not
//! end a sentence.

use std::collections::HashSet;

use crate::{Document, TokenRange};

/// Splits a [`Document`] into sentence spans.
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    abbreviations: HashSet<String>,
    /// When true, treat semicolons as sentence boundaries
    include_semicolons: bool,
    /// When true, a token followed by a blank line ends a sentence
    split_on_newlines: bool,
}

impl SentenceSplitter {
    pub fn new() -> Self {
        let common_abbrevs = [
            "dr", "mr", "mrs", "ms", "prof", "sr", "jr", "e.g", "i.e", "vs", "etc", "approx", "pt",
            "hx", "dx", "rx", "sx", "tx", "mg", "ml", "q", "b.i.d", "t.i.d", "p.o", "st",
        ];
        SentenceSplitter {
            abbreviations: common_abbrevs.iter().map(|a| a.to_string()).collect(),
            include_semicolons: false,
            split_on_newlines: false,
        }
    }

    /// Enable semicolon detection as sentence boundaries.
    pub fn with_semicolons(mut self) -> Self {
        self.include_semicolons = true;
        self
    }

    /// End a sentence at blank lines (two or more consecutive newlines).
    pub fn with_newlines(mut self) -> Self {
        self.split_on_newlines = true;
        self
    }

    pub fn with_custom_abbreviations(mut self, abbreviations: &[&str]) -> Self {
        for abbrev in abbreviations {
            self.abbreviations.insert(abbrev.trim_end_matches('.').to_lowercase());
        }
        self
    }

    fn is_sentence_ending_punctuation(&self, text: &str) -> bool {
        if matches!(text, "." | "?" | "!") {
            return true;
        }
        self.include_semicolons && text == ";"
    }

    fn is_abbreviation(&self, text: &str) -> bool {
        let normalized = text.trim_end_matches('.').to_lowercase();
        self.abbreviations.contains(&normalized)
    }

    /// Compute sentence spans covering every token of the document.
    pub fn split(&self, doc: &Document) -> Vec<TokenRange> {
        let tokens = doc.tokens();
        let mut sentences = Vec::new();
        let mut start = 0;

        for (idx, token) in tokens.iter().enumerate() {
            let mut ends_here = false;

            if self.is_sentence_ending_punctuation(token.text()) {
                let after_abbrev = token.text() == "."
                    && idx > 0
                    && tokens[idx - 1].whitespace().is_empty()
                    && self.is_abbreviation(tokens[idx - 1].text());
                ends_here = !after_abbrev;
            }

            if self.split_on_newlines && token.whitespace().matches('\n').count() >= 2 {
                ends_here = true;
            }

            if ends_here {
                sentences.push(TokenRange::new(start, idx + 1));
                start = idx + 1;
            }
        }

        if start < tokens.len() {
            sentences.push(TokenRange::new(start, tokens.len()));
        }
        sentences
    }
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self::new()
    }
}
