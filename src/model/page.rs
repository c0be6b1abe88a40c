//! Raw OCR page records.

use super::{value_as_string, value_as_u32};
use serde::Deserialize;
use serde_json::Value;

/// One OCR'd page as produced by the extraction stage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawPage")]
pub struct PageRecord {
    pub text: String,
    pub page: Option<u32>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub term: Option<String>,
    pub source: Option<String>,
}

impl PageRecord {
    /// Creates a record with text only.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = Some(grade.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Parses one JSONL line.
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(default)]
    text: Option<Value>,
    #[serde(default)]
    page: Option<Value>,
    #[serde(default)]
    metadata: Option<RawMetadata>,
}

#[derive(Deserialize, Default)]
struct RawMetadata {
    #[serde(default)]
    page: Option<Value>,
    #[serde(default)]
    subject: Option<Value>,
    #[serde(default)]
    grade: Option<Value>,
    #[serde(default)]
    term: Option<Value>,
    #[serde(default)]
    source: Option<Value>,
}

impl From<RawPage> for PageRecord {
    fn from(raw: RawPage) -> Self {
        let meta = raw.metadata.unwrap_or_default();
        let label = |v: &Option<Value>| v.as_ref().and_then(value_as_string);

        let text = match raw.text {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };

        PageRecord {
            text,
            page: meta
                .page
                .as_ref()
                .and_then(value_as_u32)
                .or_else(|| raw.page.as_ref().and_then(value_as_u32)),
            subject: label(&meta.subject),
            grade: label(&meta.grade),
            term: label(&meta.term),
            source: label(&meta.source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_record() {
        let line = r#"{"text":"نص الصفحة","metadata":{"page":3,"subject":"علوم","grade":4,"term":"1","source":"book.pdf"}}"#;
        let page = PageRecord::from_json(line).unwrap();
        assert_eq!(page.text, "نص الصفحة");
        assert_eq!(page.page, Some(3));
        assert_eq!(page.subject.as_deref(), Some("علوم"));
        assert_eq!(page.grade.as_deref(), Some("4"));
        assert_eq!(page.term.as_deref(), Some("1"));
        assert_eq!(page.source.as_deref(), Some("book.pdf"));
    }

    #[test]
    fn test_missing_keys_are_none() {
        let page = PageRecord::from_json(r#"{"text":"abc"}"#).unwrap();
        assert_eq!(page, PageRecord::new("abc"));

        let empty = PageRecord::from_json("{}").unwrap();
        assert!(empty.text.is_empty());
    }

    #[test]
    fn test_page_fallbacks() {
        let top = PageRecord::from_json(r#"{"text":"x","page":"9"}"#).unwrap();
        assert_eq!(top.page, Some(9));

        let both = PageRecord::from_json(r#"{"text":"x","page":1,"metadata":{"page":2}}"#).unwrap();
        assert_eq!(both.page, Some(2));

        let null_text = PageRecord::from_json(r#"{"text":null,"metadata":null}"#).unwrap();
        assert!(null_text.text.is_empty());
        assert_eq!(null_text.page, None);
    }

    #[test]
    fn test_malformed_line() {
        assert!(PageRecord::from_json("{not json").is_err());
        assert!(PageRecord::from_json(r#""just text""#).is_err());
    }
}
