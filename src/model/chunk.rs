//! Emitted chunks and their JSONL form.

use super::{value_as_string, value_as_u32};
use crate::quality::FlagSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cleaned, scored chunk of page text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub page: Option<u32>,
    /// 1-based position within the page.
    pub chunk_id: u32,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub source: Option<String>,
    pub has_math: bool,
    pub quality: f64,
    pub flags: FlagSet,
}

impl Chunk {
    /// Length in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Borrowed output record.
    pub fn record(&self) -> ChunkRecord<'_> {
        ChunkRecord {
            text: &self.text,
            metadata: ChunkMetadata {
                page: self.page,
                chunk_id: self.chunk_id,
                subject: self.subject.as_deref(),
                grade: self.grade.as_deref(),
                source: self.source.as_deref(),
                quality: self.quality,
                has_math: self.has_math,
                flags: &self.flags,
            },
        }
    }

    /// Serializes the chunk as one JSONL line (without the newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.record())
    }
}

/// Output JSONL shape: `{text, metadata: {...}}`.
#[derive(Debug, Serialize)]
pub struct ChunkRecord<'a> {
    pub text: &'a str,
    pub metadata: ChunkMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub struct ChunkMetadata<'a> {
    pub page: Option<u32>,
    pub chunk_id: u32,
    pub subject: Option<&'a str>,
    pub grade: Option<&'a str>,
    pub source: Option<&'a str>,
    pub quality: f64,
    pub has_math: bool,
    pub flags: &'a FlagSet,
}

/// A chunk read back from a chunked JSONL file for evaluation.
///
/// Only the text and its position are trusted; any stored quality or flags
/// are recomputed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawChunk")]
pub struct ChunkInput {
    pub text: String,
    pub page: Option<u32>,
    pub chunk_id: Option<u32>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub source: Option<String>,
}

impl ChunkInput {
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[derive(Deserialize)]
struct RawChunk {
    #[serde(default)]
    text: Option<Value>,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, Value>>,
}

impl From<RawChunk> for ChunkInput {
    fn from(raw: RawChunk) -> Self {
        let meta = raw.metadata.unwrap_or_default();
        let text = match raw.text {
            Some(Value::String(s)) => s.trim().to_string(),
            _ => String::new(),
        };
        let label = |key: &str| meta.get(key).and_then(value_as_string);

        ChunkInput {
            text,
            page: meta.get("page").and_then(value_as_u32),
            chunk_id: meta.get("chunk_id").and_then(value_as_u32),
            subject: label("subject"),
            grade: label("grade"),
            source: label("source"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::Flag;

    fn sample() -> Chunk {
        Chunk {
            text: "جملة عربية".to_string(),
            page: Some(4),
            chunk_id: 2,
            subject: Some("maths".to_string()),
            grade: None,
            source: Some("g2.pdf".to_string()),
            has_math: false,
            quality: 91.5,
            flags: FlagSet::from([Flag::TooShort]),
        }
    }

    #[test]
    fn test_output_shape() {
        let value: Value = serde_json::from_str(&sample().to_json_line().unwrap()).unwrap();
        assert_eq!(value["text"], "جملة عربية");
        let meta = &value["metadata"];
        assert_eq!(meta["page"], 4);
        assert_eq!(meta["chunk_id"], 2);
        assert_eq!(meta["subject"], "maths");
        assert!(meta["grade"].is_null());
        assert_eq!(meta["quality"], 91.5);
        assert_eq!(meta["has_math"], false);
        assert_eq!(meta["flags"][0], "TOO_SHORT");
    }

    #[test]
    fn test_output_reads_back_as_input() {
        let chunk = sample();
        let input = ChunkInput::from_json(&chunk.to_json_line().unwrap()).unwrap();
        assert_eq!(input.text, chunk.text);
        assert_eq!(input.page, Some(4));
        assert_eq!(input.chunk_id, Some(2));
        assert_eq!(input.source.as_deref(), Some("g2.pdf"));
    }

    #[test]
    fn test_legacy_quality_label_ignored() {
        let line = r#"{"text":" نص ","metadata":{"page":"7","chunk_id":1,"quality":"low"}}"#;
        let input = ChunkInput::from_json(line).unwrap();
        assert_eq!(input.text, "نص");
        assert_eq!(input.page, Some(7));
    }

    #[test]
    fn test_char_len() {
        assert_eq!(sample().len(), 10);
        assert!(!sample().is_empty());
    }
}
