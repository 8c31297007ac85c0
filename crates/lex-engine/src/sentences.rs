//! Example-sentence reconciler and the standalone sentence operations.

use lex_schemas::{
    ExampleSentence, HeadwordRef, HeadwordSelector, NewExampleSentence, RecordId, SentenceDetail,
    SentenceEdit, TranslationRef,
};
use tracing::debug;

use crate::error::DictResult;
use crate::store::{DictionaryStore, RecordFields};
use crate::versioned::conditional_update;

/// Reconcile `edits` against the sentences currently stored under
/// `translation_id`. The current list is read once, here.
pub async fn reconcile_sentences<S>(
    store: &S,
    translation_id: RecordId,
    edits: &[SentenceEdit],
) -> DictResult<Vec<ExampleSentence>>
where
    S: DictionaryStore + ?Sized,
{
    let current = store.list_sentences(translation_id).await?;
    merge_sentences(store, translation_id, current, edits).await
}

/// Positional merge of `edits` into `current`.
///
/// - index inside `current`: partial update guarded by that sentence's version
/// - index past the end: new sentence, unset text defaults to `""`
/// - `current` entries past the end of `edits` are returned untouched
///
/// A conflict aborts the walk; sentences updated at earlier indices stay
/// committed.
pub async fn merge_sentences<S>(
    store: &S,
    translation_id: RecordId,
    mut current: Vec<ExampleSentence>,
    edits: &[SentenceEdit],
) -> DictResult<Vec<ExampleSentence>>
where
    S: DictionaryStore + ?Sized,
{
    for (idx, edit) in edits.iter().enumerate() {
        match current.get_mut(idx) {
            Some(sentence) => apply_sentence_edit(store, sentence, edit).await?,
            None => {
                let inserted = store
                    .insert_sentence(
                        translation_id,
                        edit.source_sentence.as_deref().unwrap_or_default(),
                        edit.target_sentence.as_deref().unwrap_or_default(),
                    )
                    .await?;
                debug!(translation_id, sentence_id = inserted.id, idx, "sentence appended");
                current.push(inserted);
            }
        }
    }
    Ok(current)
}

/// Write one edit onto an existing sentence. Always issues the conditional
/// update, even when no text changes, so a stale caller is always detected.
pub(crate) async fn apply_sentence_edit<S>(
    store: &S,
    sentence: &mut ExampleSentence,
    edit: &SentenceEdit,
) -> DictResult<()>
where
    S: DictionaryStore + ?Sized,
{
    let source = edit
        .source_sentence
        .clone()
        .unwrap_or_else(|| sentence.source_sentence.clone());
    let target = edit
        .target_sentence
        .clone()
        .unwrap_or_else(|| sentence.target_sentence.clone());
    let expected = edit.expected_version.unwrap_or(sentence.version);

    let version = conditional_update(
        store,
        sentence.id,
        expected,
        RecordFields::ExampleSentence {
            source_sentence: &source,
            target_sentence: &target,
        },
    )
    .await?;

    sentence.source_sentence = source;
    sentence.target_sentence = target;
    sentence.version = version;
    Ok(())
}

// ---------------------------------------------------------------------------
// Standalone operations
// ---------------------------------------------------------------------------

/// Attach a sentence to an existing translation. Idempotent: adding a pair
/// the translation already holds returns the stored row.
pub async fn add_sentence<S>(
    store: &S,
    translation_id: RecordId,
    new: &NewExampleSentence,
) -> DictResult<ExampleSentence>
where
    S: DictionaryStore + ?Sized,
{
    store.fetch_translation(translation_id).await?;
    let sentence = store
        .insert_or_fetch_sentence(translation_id, &new.source_sentence, &new.target_sentence)
        .await?;
    debug!(translation_id, sentence_id = sentence.id, "sentence added");
    Ok(sentence)
}

/// One sentence with the translation and headword it belongs to.
pub async fn get_sentence<S>(store: &S, id: RecordId) -> DictResult<SentenceDetail>
where
    S: DictionaryStore + ?Sized,
{
    let sentence = store.fetch_sentence(id).await?;
    let translation = store.fetch_translation(sentence.translation_id).await?;
    let headword = store
        .fetch_headword(&HeadwordSelector::Id(translation.headword_id))
        .await?;
    Ok(SentenceDetail {
        sentence,
        translation: TranslationRef::from(&translation),
        headword: HeadwordRef::from(&headword),
    })
}

/// Sentences of one translation in insertion order.
pub async fn list_sentences<S>(
    store: &S,
    translation_id: RecordId,
) -> DictResult<Vec<ExampleSentence>>
where
    S: DictionaryStore + ?Sized,
{
    store.fetch_translation(translation_id).await?;
    store.list_sentences(translation_id).await
}

pub async fn update_sentence<S>(
    store: &S,
    id: RecordId,
    edit: &SentenceEdit,
) -> DictResult<ExampleSentence>
where
    S: DictionaryStore + ?Sized,
{
    let mut sentence = store.fetch_sentence(id).await?;
    apply_sentence_edit(store, &mut sentence, edit).await?;
    Ok(sentence)
}

pub async fn delete_sentence<S>(store: &S, id: RecordId) -> DictResult<ExampleSentence>
where
    S: DictionaryStore + ?Sized,
{
    store.delete_sentence(id).await
}
