//! Whitespace segmentation and character ↔ token offset mapping.
//!
//! # Two Tokenizations
//!
//! The annotation tool tokenizes internally and lets annotators select
//! character ranges; this crate tokenizes on whitespace only. The two
//! disagree around punctuation, so an annotation can start or end inside
//! one of our tokens:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Text:    "gave  Ben's  book"                                    │
//! │  Chars:    0123456789012345678                                   │
//! │  Tokens:  [gave]  [Ben's]  [book]                                │
//! │            0..4    6..11    13..17                               │
//! │                                                                  │
//! │  Tool span "Ben" = chars 6..9   ← ends inside token "Ben's"      │
//! │                                                                  │
//! │  Resolution: stretch outward to the token boundary               │
//! │      end 9 → 11   (token 1, exclusive token end 2)               │
//! │      + one MalformedInput diagnostic                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Offsets that fall into whitespace are snapped inward instead (a leading
//! or trailing blank adds nothing to a span).
//!
//! This module provides:
//! - [`TokenizedText`]: lines, tokens, and the start/end offset maps
//! - [`TokenRange`]: half-open token interval used by every record
//! - [`Snap`]: how a character offset was mapped, for diagnostics

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

// =============================================================================
// Token Range
// =============================================================================

/// Half-open interval of token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TokenRange {
    /// Token index (start, inclusive)
    pub begin: usize,
    /// Token index (end, exclusive)
    pub end: usize,
}

impl TokenRange {
    /// Create a range; `end` is clamped to be at least `begin`.
    #[must_use]
    pub fn new(begin: usize, end: usize) -> Self {
        Self {
            begin,
            end: end.max(begin),
        }
    }

    /// Number of tokens.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    /// Check if empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    /// Whether `other` lies inside this range. Empty ranges are contained
    /// anywhere between `begin` and `end`.
    #[must_use]
    pub const fn contains(&self, other: &TokenRange) -> bool {
        other.begin >= self.begin && other.end <= self.end
    }

    /// Whether the two ranges share at least one token. An empty range
    /// shares none, even when it sits strictly inside the other.
    #[must_use]
    pub const fn overlaps(&self, other: &TokenRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.begin < other.end && other.begin < self.end
    }

    /// Smallest range covering both.
    #[must_use]
    pub fn union(&self, other: &TokenRange) -> TokenRange {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        TokenRange::new(self.begin.min(other.begin), self.end.max(other.end))
    }

    /// As a std range.
    #[must_use]
    pub const fn as_range(&self) -> Range<usize> {
        self.begin..self.end
    }
}

// =============================================================================
// Tokens and Lines
// =============================================================================

/// A whitespace-delimited token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Dense index across the whole document.
    pub index: usize,
    /// Token text.
    pub text: String,
    /// Character offset (start, inclusive)
    pub char_start: usize,
    /// Character offset (end, exclusive)
    pub char_end: usize,
}

/// One line of the document (split on `\n`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Tokens of this line, in order.
    pub tokens: Vec<Token>,
}

/// How a character offset was turned into a token boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snap {
    /// The offset was a token boundary.
    Exact,
    /// The offset fell inside a token; the span was widened to cover it.
    Stretched,
    /// The offset fell into whitespace; it moved to the nearest token
    /// boundary inside the span.
    Whitespace,
}

/// Result of converting a character span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    /// Token range of the span.
    pub range: TokenRange,
    /// How the start offset was mapped.
    pub begin: Snap,
    /// How the end offset was mapped.
    pub end: Snap,
}

// =============================================================================
// Tokenized Text
// =============================================================================

/// Segmented document with offset maps.
///
/// ```rust
/// use standoff_tree::offset::{Snap, TokenizedText};
///
/// let text = TokenizedText::segment("Anna gave\nBen a book .");
/// assert_eq!(text.len(), 6);
/// assert_eq!(text.lines().len(), 2);
///
/// // "Ben" = chars 10..13
/// let conv = text.convert(10, 13);
/// assert_eq!((conv.range.begin, conv.range.end), (2, 3));
/// assert_eq!(conv.end, Snap::Exact);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TokenizedText {
    lines: Vec<Line>,
    offsets: Vec<(usize, usize)>,
    texts: Vec<String>,
    by_start: HashMap<usize, usize>,
    by_end: HashMap<usize, usize>,
    char_len: usize,
}

impl TokenizedText {
    /// Split text into lines and whitespace-delimited tokens.
    #[must_use]
    pub fn segment(text: &str) -> Self {
        let mut out = Self::default();
        let mut line = Line::default();
        let mut current: Option<(usize, String)> = None;
        let mut char_idx = 0;

        for ch in text.chars() {
            if ch.is_whitespace() {
                if let Some((start, token)) = current.take() {
                    out.push_token(&mut line, start, char_idx, token);
                }
                if ch == '\n' {
                    out.lines.push(std::mem::take(&mut line));
                }
            } else {
                match current.as_mut() {
                    Some((_, token)) => token.push(ch),
                    None => current = Some((char_idx, ch.to_string())),
                }
            }
            char_idx += 1;
        }
        if let Some((start, token)) = current.take() {
            out.push_token(&mut line, start, char_idx, token);
        }
        out.lines.push(line);
        out.char_len = char_idx;
        out
    }

    fn push_token(&mut self, line: &mut Line, start: usize, end: usize, text: String) {
        let index = self.offsets.len();
        self.offsets.push((start, end));
        self.texts.push(text.clone());
        self.by_start.insert(start, index);
        self.by_end.insert(end, index);
        line.tokens.push(Token {
            index,
            text,
            char_start: start,
            char_end: end,
        });
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Check if the text has no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Length of the text in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Lines with their tokens.
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Token whose first character is at `char_offset`.
    #[must_use]
    pub fn token_starting_at(&self, char_offset: usize) -> Option<usize> {
        self.by_start.get(&char_offset).copied()
    }

    /// Token whose (exclusive) end is at `char_offset`.
    #[must_use]
    pub fn token_ending_at(&self, char_offset: usize) -> Option<usize> {
        self.by_end.get(&char_offset).copied()
    }

    /// Character span of a token.
    #[must_use]
    pub fn char_span(&self, token: usize) -> Option<(usize, usize)> {
        self.offsets.get(token).copied()
    }

    /// Map a start offset to the first token of a span.
    #[must_use]
    pub fn begin_token(&self, char_offset: usize) -> (usize, Snap) {
        if let Some(idx) = self.token_starting_at(char_offset) {
            return (idx, Snap::Exact);
        }
        // First token starting after the offset.
        let next = self.offsets.partition_point(|&(start, _)| start <= char_offset);
        match next.checked_sub(1).and_then(|prev| self.offsets.get(prev).map(|o| (prev, o))) {
            Some((prev, &(_, end))) if end > char_offset => (prev, Snap::Stretched),
            _ => (next, Snap::Whitespace),
        }
    }

    /// Map an end offset (exclusive) to the exclusive token end of a span.
    #[must_use]
    pub fn end_token(&self, char_offset: usize) -> (usize, Snap) {
        if let Some(idx) = self.token_ending_at(char_offset) {
            return (idx + 1, Snap::Exact);
        }
        // Tokens [0, n) start before the offset.
        let n = self.offsets.partition_point(|&(start, _)| start < char_offset);
        match n.checked_sub(1).and_then(|last| self.offsets.get(last)) {
            Some(&(_, end)) if end > char_offset => (n, Snap::Stretched),
            _ => (n, Snap::Whitespace),
        }
    }

    /// Convert a character span to a token range.
    #[must_use]
    pub fn convert(&self, char_begin: usize, char_end: usize) -> Conversion {
        let (begin, begin_snap) = self.begin_token(char_begin);
        let (end, end_snap) = self.end_token(char_end);
        Conversion {
            range: TokenRange::new(begin, end),
            begin: begin_snap,
            end: end_snap,
        }
    }

    /// Tokens of a range joined by single spaces.
    #[must_use]
    pub fn text_of(&self, range: TokenRange) -> String {
        let end = range.end.min(self.texts.len());
        let begin = range.begin.min(end);
        self.texts[begin..end].join(" ")
    }

    /// Range covering the whole document.
    #[must_use]
    pub fn full_range(&self) -> TokenRange {
        TokenRange::new(0, self.len())
    }
}

// =============================================================================
// Tests
// =============================================================================


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every token maps back to itself through both offset maps.
        #[test]
        fn roundtrip_token_offsets(text in "[a-zé€ .,\n\t]{0,120}") {
            let tokenized = TokenizedText::segment(&text);
            for idx in 0..tokenized.len() {
                let (start, end) = tokenized.char_span(idx).unwrap();
                prop_assert_eq!(tokenized.token_starting_at(start), Some(idx));
                prop_assert_eq!(tokenized.token_ending_at(end), Some(idx));
                let conv = tokenized.convert(start, end);
                prop_assert_eq!(conv.range, TokenRange::new(idx, idx + 1));
                prop_assert_eq!(conv.begin, Snap::Exact);
                prop_assert_eq!(conv.end, Snap::Exact);
            }
        }

        /// Conversion is monotonic, so containment in chars implies
        /// containment in tokens.
        #[test]
        fn conversion_preserves_containment(
            text in "[a-z ]{1,80}",
            a in 0usize..80, b in 0usize..80, c in 0usize..80, d in 0usize..80,
        ) {
            let tokenized = TokenizedText::segment(&text);
            let len = tokenized.char_len();
            let mut outer = [a.min(len), b.min(len)];
            outer.sort_unstable();
            let inner_begin = outer[0] + c % (outer[1] - outer[0] + 1);
            let inner_end = inner_begin + d % (outer[1] - inner_begin + 1);

            let o = tokenized.convert(outer[0], outer[1]).range;
            let i = tokenized.convert(inner_begin, inner_end).range;
            prop_assert!(i.is_empty() || o.contains(&i), "{:?} not in {:?}", i, o);
        }
    }
}
