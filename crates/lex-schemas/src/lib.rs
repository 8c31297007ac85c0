//! lex-schemas
//!
//! Plain data shapes shared by the engine, the storage backends and the
//! request layer. No IO and no business logic live here.
//!
//! The dictionary is a strict three-level tree:
//! `Headword -> Translation -> ExampleSentence`. Children reference their
//! parent by id; trees are assembled from flat, freshly fetched lists.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Surrogate id of any stored record (`bigserial` in Postgres, so ids grow
/// with insertion order).
pub type RecordId = i64;

/// Optimistic-concurrency counter. Starts at 1, +1 per applied update.
pub type Version = i32;

/// Version every record carries right after insertion.
pub const INITIAL_VERSION: Version = 1;

// ---------------------------------------------------------------------------
// Stored entities
// ---------------------------------------------------------------------------

/// Top-level dictionary entry. `word` is the natural key (unique).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headword {
    pub id: RecordId,
    pub word: String,
    pub version: Version,
    #[serde(default)]
    pub translations: Vec<Translation>,
}

impl Headword {
    pub fn new(id: RecordId, word: impl Into<String>, version: Version) -> Self {
        Self {
            id,
            word: word.into(),
            version,
            translations: Vec::new(),
        }
    }
}

/// Rendering of a headword in the target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: RecordId,
    pub headword_id: RecordId,
    pub target_word: String,
    pub version: Version,
    #[serde(default)]
    pub sentences: Vec<ExampleSentence>,
}

impl Translation {
    pub fn new(
        id: RecordId,
        headword_id: RecordId,
        target_word: impl Into<String>,
        version: Version,
    ) -> Self {
        Self {
            id,
            headword_id,
            target_word: target_word.into(),
            version,
            sentences: Vec::new(),
        }
    }
}

/// Source/target sentence pair illustrating a translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleSentence {
    pub id: RecordId,
    pub translation_id: RecordId,
    pub source_sentence: String,
    pub target_sentence: String,
    pub version: Version,
}

// ---------------------------------------------------------------------------
// Single-record views with parent context
// ---------------------------------------------------------------------------

/// Parent headword as shown next to a child record (no subtree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadwordRef {
    pub id: RecordId,
    pub word: String,
    pub version: Version,
}

/// Parent translation as shown next to a sentence (no subtree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRef {
    pub id: RecordId,
    pub target_word: String,
    pub version: Version,
}

impl From<&Headword> for HeadwordRef {
    fn from(h: &Headword) -> Self {
        Self {
            id: h.id,
            word: h.word.clone(),
            version: h.version,
        }
    }
}

impl From<&Translation> for TranslationRef {
    fn from(t: &Translation) -> Self {
        Self {
            id: t.id,
            target_word: t.target_word.clone(),
            version: t.version,
        }
    }
}

/// One translation with its sentences and the headword it renders.
/// Serializes as the translation's own fields plus a `headword` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationDetail {
    #[serde(flatten)]
    pub translation: Translation,
    pub headword: HeadwordRef,
}

/// One sentence with the translation and headword above it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceDetail {
    #[serde(flatten)]
    pub sentence: ExampleSentence,
    pub translation: TranslationRef,
    pub headword: HeadwordRef,
}

// ---------------------------------------------------------------------------
// Creation payloads (fresh trees, no reconciliation)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHeadword {
    pub word: String,
    #[serde(default)]
    pub translations: Vec<NewTranslation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTranslation {
    pub target_word: String,
    #[serde(default)]
    pub sentences: Vec<NewExampleSentence>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExampleSentence {
    pub source_sentence: String,
    pub target_sentence: String,
}

impl NewTranslation {
    pub fn new(target_word: impl Into<String>) -> Self {
        Self {
            target_word: target_word.into(),
            sentences: Vec::new(),
        }
    }
}

impl NewExampleSentence {
    pub fn new(source_sentence: impl Into<String>, target_sentence: impl Into<String>) -> Self {
        Self {
            source_sentence: source_sentence.into(),
            target_sentence: target_sentence.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Partial-edit payloads
// ---------------------------------------------------------------------------

/// Partial edit of a headword. Every field is optional.
///
/// `translations` is aligned positionally with the stored translations:
/// entry `i` edits stored translation `i`, entries past the end create new
/// translations, and stored translations past the end of the list are left
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadwordEdit {
    pub word: Option<String>,
    pub expected_version: Option<Version>,
    pub translations: Option<Vec<TranslationEdit>>,
}

/// Partial edit of one translation (same positional rules one level down).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationEdit {
    pub target_word: Option<String>,
    pub expected_version: Option<Version>,
    pub sentences: Option<Vec<SentenceEdit>>,
}

/// Partial edit of one example sentence. Unset text keeps the stored value on
/// update and defaults to an empty string on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceEdit {
    pub source_sentence: Option<String>,
    pub target_sentence: Option<String>,
    pub expected_version: Option<Version>,
}

impl TranslationEdit {
    pub fn target_word(word: impl Into<String>) -> Self {
        Self {
            target_word: Some(word.into()),
            ..Self::default()
        }
    }
}

impl SentenceEdit {
    pub fn both(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_sentence: Some(source.into()),
            target_sentence: Some(target.into()),
            expected_version: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Headword selector
// ---------------------------------------------------------------------------

/// Locates a headword by exactly one key.
///
/// JSON form is externally tagged: `{"id": 7}` or `{"word": "pisać"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadwordSelector {
    Id(RecordId),
    Word(String),
}

/// Rejection reasons when building a selector from two optional keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("either id or word must be provided")]
    Missing,
    #[error("only one of id or word may be provided")]
    Ambiguous,
}

impl HeadwordSelector {
    /// Central validation point for request layers that receive the two keys
    /// as independent optional parameters.
    pub fn from_parts(id: Option<RecordId>, word: Option<String>) -> Result<Self, SelectorError> {
        match (id, word) {
            (Some(id), None) => Ok(HeadwordSelector::Id(id)),
            (None, Some(word)) => Ok(HeadwordSelector::Word(word)),
            (None, None) => Err(SelectorError::Missing),
            (Some(_), Some(_)) => Err(SelectorError::Ambiguous),
        }
    }

    pub fn is_by_word(&self) -> bool {
        matches!(self, HeadwordSelector::Word(_))
    }
}

impl std::fmt::Display for HeadwordSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeadwordSelector::Id(id) => write!(f, "id={id}"),
            HeadwordSelector::Word(word) => write!(f, "word={word}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_requires_exactly_one_key() {
        assert_eq!(
            HeadwordSelector::from_parts(Some(3), None),
            Ok(HeadwordSelector::Id(3))
        );
        assert_eq!(
            HeadwordSelector::from_parts(None, Some("kot".to_string())),
            Ok(HeadwordSelector::Word("kot".to_string()))
        );
        assert_eq!(
            HeadwordSelector::from_parts(None, None),
            Err(SelectorError::Missing)
        );
        assert_eq!(
            HeadwordSelector::from_parts(Some(3), Some("kot".to_string())),
            Err(SelectorError::Ambiguous)
        );
    }

    #[test]
    fn selector_json_is_externally_tagged() {
        let by_word: HeadwordSelector = serde_json::from_str(r#"{"word":"pisać"}"#).unwrap();
        assert_eq!(by_word, HeadwordSelector::Word("pisać".to_string()));
        assert!(by_word.is_by_word());

        let by_id = serde_json::to_value(HeadwordSelector::Id(9)).unwrap();
        assert_eq!(by_id, serde_json::json!({"id": 9}));
    }

    #[test]
    fn edit_payloads_default_missing_fields() {
        let edit: HeadwordEdit =
            serde_json::from_str(r#"{"translations":[{"sentences":[{"source_sentence":"a"}]}]}"#)
                .unwrap();
        assert_eq!(edit.word, None);
        assert_eq!(edit.expected_version, None);
        let translations = edit.translations.unwrap();
        assert_eq!(translations[0].target_word, None);
        let sentences = translations[0].sentences.as_ref().unwrap();
        assert_eq!(sentences[0].source_sentence.as_deref(), Some("a"));
        assert_eq!(sentences[0].target_sentence, None);
    }
}
