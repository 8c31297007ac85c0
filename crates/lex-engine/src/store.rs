//! Storage boundary consumed by the engine.
//!
//! Backends own atomicity per call: each method is one statement (or one
//! critical section) against the store. The engine never asks for a
//! transaction spanning several calls.

use lex_schemas::{ExampleSentence, Headword, HeadwordSelector, RecordId, Translation, Version};

use crate::error::{DictResult, Entity};

/// New scalar values for one conditional update. The variant picks the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFields<'a> {
    Headword {
        word: &'a str,
    },
    Translation {
        target_word: &'a str,
    },
    ExampleSentence {
        source_sentence: &'a str,
        target_sentence: &'a str,
    },
}

impl RecordFields<'_> {
    pub fn entity(&self) -> Entity {
        match self {
            RecordFields::Headword { .. } => Entity::Headword,
            RecordFields::Translation { .. } => Entity::Translation,
            RecordFields::ExampleSentence { .. } => Entity::ExampleSentence,
        }
    }
}

/// Read/write contract every dictionary backend implements.
///
/// Records come back flat: `Headword::translations` and
/// `Translation::sentences` are always empty here. Lists are ordered by
/// insertion (ascending id) so positional alignment is deterministic.
///
/// Missing rows are reported as `DictError::NotFound`, other failures as
/// `DictError::Storage`.
#[async_trait::async_trait]
pub trait DictionaryStore: Send + Sync {
    /// Short backend label for logs (e.g. `"postgres"`).
    fn backend_name(&self) -> &'static str;

    async fn fetch_headword(&self, selector: &HeadwordSelector) -> DictResult<Headword>;

    async fn list_headwords(&self) -> DictResult<Vec<Headword>>;

    /// Insert `word`, or return the existing row when the natural key is
    /// taken. Must be a single atomic step: no check-then-insert.
    async fn insert_or_fetch_headword(&self, word: &str) -> DictResult<Headword>;

    /// Delete the headword (children cascade) and return the deleted row.
    async fn delete_headword(&self, selector: &HeadwordSelector) -> DictResult<Headword>;

    async fn fetch_translation(&self, id: RecordId) -> DictResult<Translation>;

    async fn list_translations(&self, headword_id: RecordId) -> DictResult<Vec<Translation>>;

    async fn insert_translation(
        &self,
        headword_id: RecordId,
        target_word: &str,
    ) -> DictResult<Translation>;

    async fn delete_translation(&self, id: RecordId) -> DictResult<Translation>;

    async fn fetch_sentence(&self, id: RecordId) -> DictResult<ExampleSentence>;

    async fn list_sentences(&self, translation_id: RecordId) -> DictResult<Vec<ExampleSentence>>;

    /// Plain insert; a duplicate source/target pair under the same
    /// translation is `InvalidInput`.
    async fn insert_sentence(
        &self,
        translation_id: RecordId,
        source_sentence: &str,
        target_sentence: &str,
    ) -> DictResult<ExampleSentence>;

    /// Insert the sentence, or return the existing row when the translation
    /// already holds the same source/target pair. Single atomic step.
    async fn insert_or_fetch_sentence(
        &self,
        translation_id: RecordId,
        source_sentence: &str,
        target_sentence: &str,
    ) -> DictResult<ExampleSentence>;

    async fn delete_sentence(&self, id: RecordId) -> DictResult<ExampleSentence>;

    /// Write `fields` to row `id` only if its stored version still equals
    /// `expected_version`, bumping the version by one in the same step.
    ///
    /// Returns whether a row was affected. `false` covers both "version moved"
    /// and "row vanished"; the engine reports either as a conflict.
    async fn conditional_update(
        &self,
        id: RecordId,
        expected_version: Version,
        fields: RecordFields<'_>,
    ) -> DictResult<bool>;
}
