//! Sentence-aware chunking.
//!
//! Cleaned page text is split into sentence segments, which are then packed
//! greedily into chunks whose length (in chars) stays inside the configured
//! window. Packing never reorders text: joining the chunks of a page with
//! single spaces reproduces its segments in order.

use crate::options::ChunkOptions;

/// Characters that end a segment. The terminator stays with its segment.
pub const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '؟', '،', '؛', ':', '\n'];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Splits text into trimmed, non-empty segments, each keeping its terminator.
///
/// Text without any terminator comes back as a single segment.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        if SENTENCE_TERMINATORS.contains(&c) {
            let end = idx + c.len_utf8();
            push_trimmed(&mut segments, &text[start..end]);
            start = end;
        }
    }
    push_trimmed(&mut segments, &text[start..]);

    segments
}

fn push_trimmed<'a>(segments: &mut Vec<&'a str>, segment: &'a str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed);
    }
}

/// Packs page text into bounded chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    options: ChunkOptions,
}

impl Chunker {
    pub fn new(options: ChunkOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ChunkOptions {
        &self.options
    }

    /// Chunks cleaned page text. Returned chunks are in source order and never
    /// empty; chunk ids are assigned by the caller.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let pieces = self.segments(text);
        let mut chunks = self.pack(pieces);
        self.merge_tail(&mut chunks);

        let viable = self.options.viable_len();
        chunks.retain(|c| !c.is_empty() && char_len(c) >= viable);
        chunks
    }

    /// Sentence segments, with oversized segments wrapped at whitespace.
    fn segments(&self, text: &str) -> Vec<String> {
        let limit = self.options.max + self.options.overflow_tolerance;
        let mut pieces = Vec::new();
        for segment in split_sentences(text) {
            if char_len(segment) > limit {
                pieces.extend(wrap_words(segment, self.options.max));
            } else {
                pieces.push(segment.to_string());
            }
        }
        pieces
    }

    fn pack(&self, pieces: Vec<String>) -> Vec<String> {
        let ChunkOptions {
            min,
            max,
            overflow_tolerance,
        } = self.options;

        let mut chunks = Vec::new();
        let mut buf = String::new();

        for piece in pieces {
            let mut segment = piece;
            loop {
                if buf.is_empty() {
                    buf = segment;
                    break;
                }

                let buf_len = char_len(&buf);
                let joined = buf_len + 1 + char_len(&segment);

                if joined <= max {
                    append(&mut buf, &segment);
                    break;
                }

                if buf_len < min {
                    if joined <= max + overflow_tolerance {
                        append(&mut buf, &segment);
                        break;
                    }
                    // Top the undersized buffer up to `max`, carry the rest
                    let budget = max.saturating_sub(buf_len + 1);
                    if let Some((head, tail)) = split_words_within(&segment, budget) {
                        append(&mut buf, &head);
                        chunks.push(std::mem::take(&mut buf));
                        segment = tail;
                        continue;
                    }
                }

                chunks.push(std::mem::replace(&mut buf, segment));
                break;
            }
        }

        if !buf.is_empty() {
            chunks.push(buf);
        }
        chunks
    }

    fn merge_tail(&self, chunks: &mut Vec<String>) {
        if chunks.len() < 2 {
            return;
        }
        let last_len = chunks.last().map_or(0, |c| char_len(c));
        if last_len < self.options.min {
            if let Some(last) = chunks.pop() {
                if let Some(prev) = chunks.last_mut() {
                    append(prev, &last);
                }
            }
        }
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkOptions::default())
    }
}

fn append(buf: &mut String, segment: &str) {
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(segment);
}

/// Splits off the longest whole-word prefix of `segment` that fits in
/// `budget` chars. A first word longer than `budget` is cut inside. `None`
/// when the budget is zero or nothing would remain.
fn split_words_within(segment: &str, budget: usize) -> Option<(String, String)> {
    let mut used = 0;
    let mut cut = None;

    for (idx, word) in word_spans(segment) {
        let word_len = char_len(word);
        let needed = if used == 0 { word_len } else { used + 1 + word_len };
        if needed > budget {
            break;
        }
        used = needed;
        cut = Some(idx + word.len());
    }

    let Some(cut) = cut else {
        return split_chars_within(segment, budget);
    };
    let head = segment[..cut].trim();
    let tail = segment[cut..].trim();
    if head.is_empty() || tail.is_empty() {
        return None;
    }
    Some((head.split_whitespace().collect::<Vec<_>>().join(" "), tail.to_string()))
}

/// Cuts the first `budget` chars off `segment`.
fn split_chars_within(segment: &str, budget: usize) -> Option<(String, String)> {
    if budget == 0 {
        return None;
    }
    let (idx, _) = segment.char_indices().nth(budget)?;
    let head = segment[..idx].trim();
    let tail = segment[idx..].trim();
    if head.is_empty() || tail.is_empty() {
        return None;
    }
    Some((head.to_string(), tail.to_string()))
}

/// Byte offset and text of each whitespace-separated word.
fn word_spans(s: &str) -> impl Iterator<Item = (usize, &str)> {
    s.split_whitespace()
        .map(move |w| (w.as_ptr() as usize - s.as_ptr() as usize, w))
}

/// Wraps a long segment into pieces of at most `width` chars, breaking at
/// whitespace and hard-splitting words longer than `width`.
fn wrap_words(segment: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut pieces = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in segment.split_whitespace() {
        let word_len = char_len(word);

        if word_len > width {
            if !line.is_empty() {
                pieces.push(std::mem::take(&mut line));
                line_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for part in chars.chunks(width) {
                pieces.push(part.iter().collect());
            }
            continue;
        }

        let needed = if line.is_empty() { word_len } else { line_len + 1 + word_len };
        if needed > width {
            pieces.push(std::mem::take(&mut line));
            line.push_str(word);
            line_len = word_len;
        } else {
            append(&mut line, word);
            line_len = needed;
        }
    }

    if !line.is_empty() {
        pieces.push(line);
    }
    pieces
}
