//! Translation reconciler (one level above sentences) and the standalone
//! translation operations.

use lex_schemas::{
    HeadwordRef, HeadwordSelector, NewTranslation, RecordId, Translation, TranslationDetail,
    TranslationEdit,
};
use tracing::debug;

use crate::error::{DictError, DictResult, Entity};
use crate::sentences::reconcile_sentences;
use crate::store::{DictionaryStore, RecordFields};
use crate::versioned::{conditional_update, ensure_expected_version};

/// Reconcile `edits` against the translations currently stored under
/// `headword_id`. Returns the full resulting collection with sentences.
pub async fn reconcile_translations<S>(
    store: &S,
    headword_id: RecordId,
    edits: &[TranslationEdit],
) -> DictResult<Vec<Translation>>
where
    S: DictionaryStore + ?Sized,
{
    let current = store.list_translations(headword_id).await?;
    merge_translations(store, headword_id, current, edits).await
}

/// Positional merge of `edits` into `current`, same rules as
/// [`crate::merge_sentences`]:
///
/// - index inside `current`: conditional update of `target_word` (if given),
///   then sentence reconciliation (if given)
/// - index past the end: new translation; `target_word` is mandatory and any
///   sentence edits are inserted as fresh sentences
/// - surplus stored translations are returned untouched
///
/// Overflow entries are validated before the first write.
pub async fn merge_translations<S>(
    store: &S,
    headword_id: RecordId,
    mut current: Vec<Translation>,
    edits: &[TranslationEdit],
) -> DictResult<Vec<Translation>>
where
    S: DictionaryStore + ?Sized,
{
    check_overflow_edits(current.len(), edits)?;

    for (idx, edit) in edits.iter().enumerate() {
        match current.get_mut(idx) {
            Some(translation) => apply_translation_edit(store, translation, edit).await?,
            None => {
                let created = insert_from_edit(store, headword_id, edit).await?;
                debug!(headword_id, translation_id = created.id, idx, "translation appended");
                current.push(created);
            }
        }
    }

    for translation in current.iter_mut().skip(edits.len()) {
        translation.sentences = store.list_sentences(translation.id).await?;
    }
    Ok(current)
}

/// Every edit past the `existing` stored translations creates a row, so it
/// must name its `target_word`.
pub(crate) fn check_overflow_edits(existing: usize, edits: &[TranslationEdit]) -> DictResult<()> {
    match edits
        .iter()
        .enumerate()
        .skip(existing)
        .find_map(|(idx, e)| e.target_word.is_none().then_some(idx))
    {
        Some(idx) => Err(DictError::invalid(format!(
            "required field missing for a new translation: target_word (edit #{idx})"
        ))),
        None => Ok(()),
    }
}

/// Apply one edit to an existing translation: scalar first, then children.
pub(crate) async fn apply_translation_edit<S>(
    store: &S,
    translation: &mut Translation,
    edit: &TranslationEdit,
) -> DictResult<()>
where
    S: DictionaryStore + ?Sized,
{
    match edit.target_word.as_deref() {
        Some(target_word) => {
            let expected = edit.expected_version.unwrap_or(translation.version);
            translation.version = conditional_update(
                store,
                translation.id,
                expected,
                RecordFields::Translation { target_word },
            )
            .await?;
            translation.target_word = target_word.to_string();
        }
        None => ensure_expected_version(
            Entity::Translation,
            translation.id,
            translation.version,
            edit.expected_version,
        )?,
    }

    translation.sentences = match edit.sentences.as_deref() {
        Some(sentence_edits) => reconcile_sentences(store, translation.id, sentence_edits).await?,
        None => store.list_sentences(translation.id).await?,
    };
    Ok(())
}

/// Overflow branch: nothing stored to merge against, so sentences go straight
/// in. Caller has already checked `target_word`.
async fn insert_from_edit<S>(
    store: &S,
    headword_id: RecordId,
    edit: &TranslationEdit,
) -> DictResult<Translation>
where
    S: DictionaryStore + ?Sized,
{
    let target_word = edit.target_word.as_deref().ok_or_else(|| {
        DictError::invalid("required field missing for a new translation: target_word")
    })?;
    let mut translation = store.insert_translation(headword_id, target_word).await?;
    for sentence in edit.sentences.iter().flatten() {
        let inserted = store
            .insert_sentence(
                translation.id,
                sentence.source_sentence.as_deref().unwrap_or_default(),
                sentence.target_sentence.as_deref().unwrap_or_default(),
            )
            .await?;
        translation.sentences.push(inserted);
    }
    Ok(translation)
}

/// Insert a complete new translation tree under `headword_id`.
pub(crate) async fn insert_translation_tree<S>(
    store: &S,
    headword_id: RecordId,
    new: &NewTranslation,
) -> DictResult<Translation>
where
    S: DictionaryStore + ?Sized,
{
    let mut translation = store.insert_translation(headword_id, &new.target_word).await?;
    for sentence in &new.sentences {
        let inserted = store
            .insert_sentence(
                translation.id,
                &sentence.source_sentence,
                &sentence.target_sentence,
            )
            .await?;
        translation.sentences.push(inserted);
    }
    debug!(
        headword_id,
        translation_id = translation.id,
        sentences = translation.sentences.len(),
        "translation inserted"
    );
    Ok(translation)
}

/// Translations of `headword_id` with their sentences, insertion order.
pub(crate) async fn load_translations<S>(
    store: &S,
    headword_id: RecordId,
) -> DictResult<Vec<Translation>>
where
    S: DictionaryStore + ?Sized,
{
    let mut translations = store.list_translations(headword_id).await?;
    for translation in translations.iter_mut() {
        translation.sentences = store.list_sentences(translation.id).await?;
    }
    Ok(translations)
}

// ---------------------------------------------------------------------------
// Standalone operations
// ---------------------------------------------------------------------------

/// Add a translation under the headword addressed by `parent`.
pub async fn add_translation<S>(
    store: &S,
    parent: &HeadwordSelector,
    new: &NewTranslation,
) -> DictResult<Translation>
where
    S: DictionaryStore + ?Sized,
{
    let headword = store.fetch_headword(parent).await?;
    insert_translation_tree(store, headword.id, new).await
}

/// One translation with its sentences and its parent headword.
pub async fn get_translation<S>(store: &S, id: RecordId) -> DictResult<TranslationDetail>
where
    S: DictionaryStore + ?Sized,
{
    let translation = load_translation(store, id).await?;
    let headword = store
        .fetch_headword(&HeadwordSelector::Id(translation.headword_id))
        .await?;
    Ok(TranslationDetail {
        headword: HeadwordRef::from(&headword),
        translation,
    })
}

async fn load_translation<S>(store: &S, id: RecordId) -> DictResult<Translation>
where
    S: DictionaryStore + ?Sized,
{
    let mut translation = store.fetch_translation(id).await?;
    translation.sentences = store.list_sentences(id).await?;
    Ok(translation)
}

/// Children-of query for a headword.
pub async fn list_translations<S>(
    store: &S,
    parent: &HeadwordSelector,
) -> DictResult<Vec<Translation>>
where
    S: DictionaryStore + ?Sized,
{
    let headword = store.fetch_headword(parent).await?;
    load_translations(store, headword.id).await
}

pub async fn update_translation<S>(
    store: &S,
    id: RecordId,
    edit: &TranslationEdit,
) -> DictResult<Translation>
where
    S: DictionaryStore + ?Sized,
{
    let mut translation = store.fetch_translation(id).await?;
    apply_translation_edit(store, &mut translation, edit).await?;
    Ok(translation)
}

/// Delete a translation; the returned snapshot carries the sentences that
/// were cascaded away.
pub async fn delete_translation<S>(store: &S, id: RecordId) -> DictResult<Translation>
where
    S: DictionaryStore + ?Sized,
{
    let snapshot = load_translation(store, id).await?;
    store.delete_translation(id).await?;
    Ok(snapshot)
}
