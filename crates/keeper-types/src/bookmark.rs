//! Bookmark domain types.
//!
//! `BookmarkDocument` is the whole per-user payload persisted in blob
//! storage. Only `bookmarks-list` is interpreted; every other top-level field
//! is carried through untouched so that newer writers do not lose data when
//! an older store mutates the list.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::BookmarkError;

/// A user's persisted bookmark document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookmarkDocument {
    /// Bookmarks in render order.
    ///
    /// Decoding is lenient: non-string entries are dropped, and a value that
    /// is not an array reads as an empty list. The rest of the document is
    /// still kept.
    #[serde(
        rename = "bookmarks-list",
        default,
        deserialize_with = "lenient_list"
    )]
    pub bookmarks_list: Vec<String>,

    /// Unknown top-level fields, preserved across mutate-and-save cycles.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let list = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(entry) => Some(entry),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(list)
}

impl BookmarkDocument {
    /// Decode a document from raw object bytes.
    ///
    /// Fails only when the bytes are not JSON or not a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Encode the document as compact JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// A validated user identifier.
///
/// The identifier is trusted (authenticated upstream); the only rule is that
/// it is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, BookmarkError> {
        if raw.is_empty() {
            return Err(BookmarkError::InvalidArgument(
                "no user ID was provided, which is required".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of an add, delete or clear operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    /// Entries appended (add), removed (delete) or cleared (clear).
    pub applied: Vec<String>,
    /// Entries that were requested but not applied: already present or
    /// repeated within the batch (add), not found (delete).
    pub skipped: Vec<String>,
    /// Whether the document was written back to storage.
    pub persisted: bool,
    /// The batch was not a sequence of strings; nothing was done.
    pub malformed: bool,
}

impl MutationOutcome {
    /// Outcome for a batch that was rejected before any I/O.
    pub fn malformed() -> Self {
        Self {
            malformed: true,
            ..Self::default()
        }
    }

    /// Outcome for an operation that found nothing to write.
    pub fn untouched() -> Self {
        Self::default()
    }
}

/// Interpret a dynamically-typed batch as a list of bookmark strings.
///
/// Returns `None` unless `value` is an array whose elements are all strings.
pub fn parse_batch(value: &serde_json::Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Split a comma-separated command argument into trimmed bookmark names.
///
/// Empty segments are dropped, so `"a, ,b,"` yields `["a", "b"]`.
pub fn split_items(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_deserialize_preserves_unknown_fields() {
        let raw = br#"{"bookmarks-list":["a","b"],"theme":"dark","meta":{"v":2}}"#;
        let doc = BookmarkDocument::from_slice(raw).unwrap();
        assert_eq!(doc.bookmarks_list, vec!["a", "b"]);
        assert_eq!(doc.extra.get("theme"), Some(&json!("dark")));
        assert_eq!(doc.extra.get("meta"), Some(&json!({"v": 2})));

        let encoded: serde_json::Value = serde_json::from_slice(&doc.to_vec().unwrap()).unwrap();
        assert_eq!(
            encoded,
            json!({"bookmarks-list": ["a", "b"], "theme": "dark", "meta": {"v": 2}})
        );
    }

    #[test]
    fn test_document_missing_list_is_empty() {
        let doc = BookmarkDocument::from_slice(br#"{"owner":"alice"}"#).unwrap();
        assert!(doc.bookmarks_list.is_empty());
        assert_eq!(doc.extra.len(), 1);
    }

    #[test]
    fn test_document_null_list_is_empty() {
        let doc = BookmarkDocument::from_slice(br#"{"bookmarks-list":null}"#).unwrap();
        assert!(doc.bookmarks_list.is_empty());
    }

    #[test]
    fn test_document_rejects_non_object() {
        assert!(BookmarkDocument::from_slice(b"not json").is_err());
        assert!(BookmarkDocument::from_slice(b"[1,2,3]").is_err());
        assert!(BookmarkDocument::from_slice(b"\"text\"").is_err());
    }

    #[test]
    fn test_document_mixed_list_keeps_strings_and_fields() {
        let doc =
            BookmarkDocument::from_slice(br#"{"bookmarks-list":["a",1,null,"b"],"theme":"dark"}"#)
                .unwrap();
        assert_eq!(doc.bookmarks_list, vec!["a", "b"]);
        assert_eq!(doc.extra.get("theme"), Some(&json!("dark")));
    }

    #[test]
    fn test_document_non_array_list_reads_empty() {
        let doc = BookmarkDocument::from_slice(br#"{"bookmarks-list":"a","theme":"dark"}"#).unwrap();
        assert!(doc.bookmarks_list.is_empty());
        assert_eq!(doc.extra.get("theme"), Some(&json!("dark")));
        assert!(!doc.extra.contains_key("bookmarks-list"));
    }

    #[test]
    fn test_default_document_wire_shape() {
        let encoded = String::from_utf8(BookmarkDocument::default().to_vec().unwrap()).unwrap();
        assert_eq!(encoded, r#"{"bookmarks-list":[]}"#);
    }

    #[test]
    fn test_user_id_rejects_empty() {
        assert!(matches!(
            UserId::parse(""),
            Err(BookmarkError::InvalidArgument(_))
        ));
        assert_eq!(UserId::parse("alice").unwrap().as_str(), "alice");
    }

    #[test]
    fn test_parse_batch() {
        assert_eq!(
            parse_batch(&json!(["a", "b"])),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(parse_batch(&json!([])), Some(Vec::new()));
        assert_eq!(parse_batch(&json!("a")), None);
        assert_eq!(parse_batch(&json!(["a", 1])), None);
        assert_eq!(parse_batch(&json!({"a": 1})), None);
    }

    #[test]
    fn test_split_items() {
        assert_eq!(split_items("news, music ,  work"), vec!["news", "music", "work"]);
        assert_eq!(split_items("a, ,b,"), vec!["a", "b"]);
        assert!(split_items("").is_empty());
    }

    #[test]
    fn test_malformed_outcome() {
        let outcome = MutationOutcome::malformed();
        assert!(outcome.malformed);
        assert!(!outcome.persisted);
        assert!(outcome.applied.is_empty());
    }
}
