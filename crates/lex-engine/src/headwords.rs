//! Headword orchestration: idempotent create, rename plus translation
//! reconciliation on edit, snapshot-then-cascade on delete.

use lex_schemas::{Headword, HeadwordEdit, HeadwordSelector, NewHeadword};
use tracing::{debug, info};

use crate::error::{DictError, DictResult, Entity};
use crate::store::{DictionaryStore, RecordFields};
use crate::translations::{
    check_overflow_edits, insert_translation_tree, load_translations, merge_translations,
};
use crate::versioned::{conditional_update, ensure_expected_version};

/// Create-or-fetch by natural key, then insert every supplied translation as
/// a fresh child. Returns the complete stored tree, so a second `add` of the
/// same word shows the translations both calls attached.
pub async fn add_headword<S>(store: &S, new: &NewHeadword) -> DictResult<Headword>
where
    S: DictionaryStore + ?Sized,
{
    validate_word(&new.word)?;

    let mut headword = store.insert_or_fetch_headword(&new.word).await?;
    for translation in &new.translations {
        insert_translation_tree(store, headword.id, translation).await?;
    }
    headword.translations = load_translations(store, headword.id).await?;

    info!(
        headword_id = headword.id,
        word = %headword.word,
        version = headword.version,
        added = new.translations.len(),
        "headword added"
    );
    Ok(headword)
}

/// One headword with its full translation/sentence tree.
pub async fn get_headword<S>(store: &S, selector: &HeadwordSelector) -> DictResult<Headword>
where
    S: DictionaryStore + ?Sized,
{
    let mut headword = store.fetch_headword(selector).await?;
    headword.translations = load_translations(store, headword.id).await?;
    Ok(headword)
}

/// Every headword with its full tree, ascending id.
pub async fn list_headwords<S>(store: &S) -> DictResult<Vec<Headword>>
where
    S: DictionaryStore + ?Sized,
{
    let mut headwords = store.list_headwords().await?;
    for headword in headwords.iter_mut() {
        headword.translations = load_translations(store, headword.id).await?;
    }
    Ok(headwords)
}

/// Apply a partial edit to the headword located by `selector`.
///
/// A new `word` is only written when the headword was located by id; when
/// located by word the rename is ignored. Translation edits are validated
/// before the rename and then go through [`crate::merge_translations`]. A
/// conflict anywhere aborts the call and leaves earlier writes committed.
pub async fn update_headword<S>(
    store: &S,
    selector: &HeadwordSelector,
    edit: Option<&HeadwordEdit>,
) -> DictResult<Headword>
where
    S: DictionaryStore + ?Sized,
{
    let mut headword = store.fetch_headword(selector).await?;

    let Some(edit) = edit else {
        headword.translations = load_translations(store, headword.id).await?;
        return Ok(headword);
    };

    // Children are read and checked before the rename so a malformed edit
    // list is rejected with nothing written.
    let current_translations = match edit.translations.as_deref() {
        Some(edits) => {
            let current = store.list_translations(headword.id).await?;
            check_overflow_edits(current.len(), edits)?;
            Some(current)
        }
        None => None,
    };

    match edit.word.as_deref() {
        Some(word) if !selector.is_by_word() => {
            validate_word(word)?;
            let expected = edit.expected_version.unwrap_or(headword.version);
            headword.version = conditional_update(
                store,
                headword.id,
                expected,
                RecordFields::Headword { word },
            )
            .await?;
            headword.word = word.to_string();
        }
        requested => {
            if let Some(word) = requested {
                debug!(
                    headword_id = headword.id,
                    requested = word,
                    "rename ignored: headword located by word"
                );
            }
            ensure_expected_version(
                Entity::Headword,
                headword.id,
                headword.version,
                edit.expected_version,
            )?;
        }
    }

    headword.translations = match (edit.translations.as_deref(), current_translations) {
        (Some(edits), Some(current)) => {
            merge_translations(store, headword.id, current, edits).await?
        }
        _ => load_translations(store, headword.id).await?,
    };

    info!(
        headword_id = headword.id,
        version = headword.version,
        translations = headword.translations.len(),
        "headword updated"
    );
    Ok(headword)
}

/// Snapshot the full tree, then delete (children cascade in the backend).
pub async fn delete_headword<S>(store: &S, selector: &HeadwordSelector) -> DictResult<Headword>
where
    S: DictionaryStore + ?Sized,
{
    let snapshot = get_headword(store, selector).await?;
    store
        .delete_headword(&HeadwordSelector::Id(snapshot.id))
        .await?;
    info!(
        headword_id = snapshot.id,
        word = %snapshot.word,
        translations = snapshot.translations.len(),
        "headword deleted"
    );
    Ok(snapshot)
}

fn validate_word(word: &str) -> DictResult<()> {
    if word.trim().is_empty() {
        return Err(DictError::invalid("headword word must not be empty"));
    }
    Ok(())
}
