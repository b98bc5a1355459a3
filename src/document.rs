//! Tokenized documents.
//!
//! A [`Document`] is the read-only input every component in this workspace
//! consumes: the original text, a token sequence with stable indices and byte
//! offsets, and optionally the sentence spans produced by a segmenter.
//!
//! Tokenization itself is an outside concern. [`Document::from_text`] uses
//! Unicode word boundaries, which is enough for tests and simple pipelines;
//! callers with their own tokenizer build documents through
//! [`Document::from_tokens`] or [`Document::from_parts`].

use unicode_segmentation::UnicodeSegmentation;

use crate::{SentenceSplitter, TokenRange};

/// A single token with its position in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    text: String,
    lower: String,
    /// Byte offset of the first character in the document text
    offset: usize,
    /// Whitespace following the token (may contain newlines)
    whitespace: String,
}

impl Token {
    pub fn new(text: impl Into<String>, offset: usize, whitespace: impl Into<String>) -> Self {
        let text = text.into();
        let lower = text.to_lowercase();
        Self {
            text,
            lower,
            offset,
            whitespace: whitespace.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Byte offset one past the last character of the token.
    pub fn end_offset(&self) -> usize {
        self.offset + self.text.len()
    }

    pub fn whitespace(&self) -> &str {
        &self.whitespace
    }

    /// Token text followed by its trailing whitespace.
    pub fn text_with_ws(&self) -> String {
        let mut out = String::with_capacity(self.text.len() + self.whitespace.len());
        out.push_str(&self.text);
        out.push_str(&self.whitespace);
        out
    }

    pub fn is_punct(&self) -> bool {
        !self.text.is_empty() && self.text.chars().all(|c| !c.is_alphanumeric() && !c.is_whitespace())
    }

    pub fn is_digit(&self) -> bool {
        !self.text.is_empty() && self.text.chars().all(|c| c.is_ascii_digit())
    }

    pub fn is_alpha(&self) -> bool {
        !self.text.is_empty() && self.text.chars().all(char::is_alphabetic)
    }

    pub fn is_upper(&self) -> bool {
        self.text.chars().any(char::is_alphabetic)
            && self.text.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase)
    }

    pub fn is_title(&self) -> bool {
        let mut chars = self.text.chars();
        match chars.next() {
            Some(first) if first.is_uppercase() => chars.all(|c| !c.is_alphabetic() || c.is_lowercase()),
            _ => false,
        }
    }
}

/// A tokenized document with optional sentence boundaries.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    tokens: Vec<Token>,
    /// Sentence spans in document order, tiling the token sequence
    sentences: Option<Vec<TokenRange>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("token_count", &self.tokens.len())
            .field("sentence_count", &self.sentences.as_ref().map(Vec::len))
            .field("text_len", &self.text.len())
            .finish()
    }
}

impl Document {
    /// Tokenize text on Unicode word boundaries.
    ///
    /// Whitespace segments are attached to the preceding token as trailing
    /// whitespace. No sentence boundaries are set.
    pub fn from_text(text: &str) -> Self {
        let mut tokens: Vec<Token> = Vec::new();
        for (offset, segment) in text.split_word_bound_indices() {
            if segment.chars().all(char::is_whitespace) {
                if let Some(last) = tokens.last_mut() {
                    last.whitespace.push_str(segment);
                }
                continue;
            }
            tokens.push(Token::new(segment, offset, ""));
        }
        Self {
            text: text.to_string(),
            tokens,
            sentences: None,
        }
    }

    /// Build a document from pre-split words joined by single spaces.
    pub fn from_tokens<S: AsRef<str>>(words: &[S]) -> Self {
        let mut text = String::new();
        let mut tokens = Vec::with_capacity(words.len());
        for (idx, word) in words.iter().enumerate() {
            let word = word.as_ref();
            let offset = text.len();
            text.push_str(word);
            let whitespace = if idx + 1 < words.len() { " " } else { "" };
            text.push_str(whitespace);
            tokens.push(Token::new(word, offset, whitespace));
        }
        Self {
            text,
            tokens,
            sentences: None,
        }
    }

    /// Build a document from text and tokens produced elsewhere.
    pub fn from_parts(text: impl Into<String>, tokens: Vec<Token>) -> Self {
        Self {
            text: text.into(),
            tokens,
            sentences: None,
        }
    }

    /// Attach sentence spans. Spans are sorted; gaps are left as-is.
    pub fn with_sentences(mut self, mut sentences: Vec<TokenRange>) -> Self {
        sentences.sort();
        self.sentences = Some(sentences);
        self
    }

    /// Attach sentence boundaries given as sentence-start token indices.
    ///
    /// Token 0 always starts a sentence.
    pub fn with_sentence_starts(self, starts: &[usize]) -> Self {
        let len = self.tokens.len();
        let mut starts: Vec<usize> = starts.iter().copied().filter(|&s| s < len).collect();
        starts.push(0);
        starts.sort_unstable();
        starts.dedup();
        let sentences = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(len);
                TokenRange::new(start, end)
            })
            .filter(|range| !range.is_empty())
            .collect();
        self.with_sentences(sentences)
    }

    /// Treat the whole document as a single sentence.
    pub fn with_single_sentence(self) -> Self {
        let len = self.tokens.len();
        self.with_sentences(vec![TokenRange::new(0, len)])
    }

    /// Run a sentence splitter and attach its boundaries.
    pub fn segment_sentences(self, splitter: &SentenceSplitter) -> Self {
        let sentences = splitter.split(&self);
        self.with_sentences(sentences)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, idx: usize) -> Option<&Token> {
        self.tokens.get(idx)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Range covering every token.
    pub fn full_range(&self) -> TokenRange {
        TokenRange::new(0, self.tokens.len())
    }

    pub fn has_sentences(&self) -> bool {
        self.sentences.is_some()
    }

    pub fn sentences(&self) -> Option<&[TokenRange]> {
        self.sentences.as_deref()
    }

    /// The sentence containing token `idx`.
    ///
    /// Returns `None` when no sentence boundaries were set or the token is
    /// not covered by any sentence.
    pub fn sentence_of(&self, idx: usize) -> Option<TokenRange> {
        let sentences = self.sentences.as_ref()?;
        let pos = sentences.partition_point(|s| s.start <= idx);
        if pos == 0 {
            return None;
        }
        let candidate = sentences[pos - 1];
        if candidate.contains(idx) {
            Some(candidate)
        } else {
            None
        }
    }

    /// Source text covered by a token range, without trailing whitespace.
    pub fn text_of(&self, range: TokenRange) -> &str {
        if range.is_empty() || range.end > self.tokens.len() {
            return "";
        }
        let start = self.tokens[range.start].offset();
        let end = self.tokens[range.end - 1].end_offset();
        self.text.get(start..end).unwrap_or("")
    }

    /// Lower-cased texts of the tokens in a range.
    pub fn lower_texts(&self, range: TokenRange) -> Vec<&str> {
        self.tokens[range.start.min(self.len())..range.end.min(self.len())]
            .iter()
            .map(Token::lower)
            .collect()
    }

    /// A range widened by `n` tokens on each side, clamped to the document.
    pub fn window(&self, range: TokenRange, n: usize) -> TokenRange {
        TokenRange::new(
            range.start.saturating_sub(n),
            range.end.saturating_add(n).min(self.tokens.len()),
        )
    }

    /// Token range whose boundaries align exactly with the byte offsets.
    pub fn char_span(&self, start: usize, end: usize) -> Option<TokenRange> {
        let first = self.tokens.iter().position(|t| t.offset() == start)?;
        let last = self.tokens[first..]
            .iter()
            .position(|t| t.end_offset() == end)
            .map(|p| p + first)?;
        Some(TokenRange::new(first, last + 1))
    }
}
