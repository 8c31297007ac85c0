//! Scenario: deletes and the per-entity operations.
//!
//! # Invariants under test
//! - Deleting a missing headword is "not found", never a conflict, and
//!   mutates nothing.
//! - Delete returns the full pre-deletion tree and cascades to children.
//! - Translation and sentence operations address their parent explicitly
//!   and report a missing parent as "not found".
//! - Single-record getters carry their parent context.
//! - Adding a sentence pair the translation already holds returns the
//!   stored row.

use lex_engine::{
    add_headword, add_sentence, add_translation, delete_headword, delete_sentence,
    delete_translation, get_headword, get_sentence, get_translation, list_headwords, list_sentences,
    list_translations, update_sentence, DictError, Entity, HeadwordSelector, NewExampleSentence,
    NewHeadword, NewTranslation, SentenceEdit,
};
use lex_testkit::MemoryStore;

async fn seed(store: &MemoryStore) -> anyhow::Result<lex_engine::Headword> {
    let hw = add_headword(
        store,
        &NewHeadword {
            word: "biegać".to_string(),
            translations: vec![
                NewTranslation {
                    target_word: "run".to_string(),
                    sentences: vec![
                        NewExampleSentence::new("Biegam rano.", "I run in the morning."),
                        NewExampleSentence::new("Biega szybko.", "He runs fast."),
                    ],
                },
                NewTranslation::new("jog"),
            ],
        },
    )
    .await?;
    Ok(hw)
}

#[tokio::test]
async fn deleting_missing_word_is_not_found() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    seed(&store).await?;

    let err = delete_headword(&store, &HeadwordSelector::Word("pływać".to_string()))
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "got {err:?}");
    assert!(!err.is_conflict());
    assert_eq!(store.headword_count(), 1);
    assert_eq!(store.translation_count(), 2);
    assert_eq!(store.sentence_count(), 2);
    Ok(())
}

#[tokio::test]
async fn delete_returns_snapshot_and_cascades() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let hw = seed(&store).await?;

    let snapshot = delete_headword(&store, &HeadwordSelector::Word("biegać".to_string())).await?;

    assert_eq!(snapshot, hw);
    assert_eq!(snapshot.translations[0].sentences.len(), 2);
    assert_eq!(store.headword_count(), 0);
    assert_eq!(store.translation_count(), 0);
    assert_eq!(store.sentence_count(), 0);

    let err = get_headword(&store, &HeadwordSelector::Id(hw.id)).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn translation_lifecycle_through_standalone_ops() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let hw = seed(&store).await?;

    let added = add_translation(
        &store,
        &HeadwordSelector::Id(hw.id),
        &NewTranslation {
            target_word: "sprint".to_string(),
            sentences: vec![NewExampleSentence::new("Biegł sprintem.", "He sprinted.")],
        },
    )
    .await?;
    assert_eq!(added.headword_id, hw.id);
    assert_eq!(added.sentences.len(), 1);

    let listed = list_translations(&store, &HeadwordSelector::Word("biegać".to_string())).await?;
    let targets: Vec<&str> = listed.iter().map(|t| t.target_word.as_str()).collect();
    assert_eq!(targets, vec!["run", "jog", "sprint"]);

    let fetched = get_translation(&store, added.id).await?;
    assert_eq!(fetched.translation, added);
    assert_eq!(fetched.headword.id, hw.id);
    assert_eq!(fetched.headword.word, "biegać");

    let removed = delete_translation(&store, hw.translations[0].id).await?;
    assert_eq!(removed.sentences.len(), 2, "snapshot carries cascaded sentences");
    assert_eq!(store.translation_count(), 2);
    assert_eq!(store.sentence_count(), 1);

    let err = get_translation(&store, removed.id).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn adding_the_same_sentence_twice_returns_the_stored_row() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let hw = seed(&store).await?;
    let jog = hw.translations[1].id;
    let pair = NewExampleSentence::new("Biegam w parku.", "I jog in the park.");

    let first = add_sentence(&store, jog, &pair).await?;
    let again = add_sentence(&store, jog, &pair).await?;
    assert_eq!(again.id, first.id);
    assert_eq!(again.version, first.version);
    assert_eq!(list_sentences(&store, jog).await?.len(), 1);

    // The same pair under another translation is a separate row.
    let run = hw.translations[0].id;
    let elsewhere = add_sentence(&store, run, &pair).await?;
    assert_ne!(elsewhere.id, first.id);

    let detail = get_sentence(&store, first.id).await?;
    assert_eq!(detail.sentence, first);
    assert_eq!(detail.translation.id, jog);
    assert_eq!(detail.translation.target_word, "jog");
    assert_eq!(detail.headword.word, "biegać");
    Ok(())
}

#[tokio::test]
async fn translation_under_missing_headword_is_not_found() {
    let store = MemoryStore::new();

    let err = add_translation(
        &store,
        &HeadwordSelector::Word("nic".to_string()),
        &NewTranslation::new("nothing"),
    )
    .await
    .unwrap_err();

    match err {
        DictError::NotFound { entity, key } => {
            assert_eq!(entity, Entity::Headword);
            assert_eq!(key, "word=nic");
        }
        other => panic!("expected not found, got {other:?}"),
    }
    assert_eq!(store.translation_count(), 0);
}

#[tokio::test]
async fn sentence_lifecycle_through_standalone_ops() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let hw = seed(&store).await?;
    let jog = hw.translations[1].id;

    assert!(list_sentences(&store, jog).await?.is_empty());

    let added = add_sentence(
        &store,
        jog,
        &NewExampleSentence::new("Biegam w parku.", "I jog in the park."),
    )
    .await?;
    assert_eq!(added.translation_id, jog);

    let edited = update_sentence(
        &store,
        added.id,
        &SentenceEdit {
            target_sentence: Some("I go jogging in the park.".to_string()),
            expected_version: Some(added.version),
            ..SentenceEdit::default()
        },
    )
    .await?;
    assert_eq!(edited.source_sentence, "Biegam w parku.");
    assert_eq!(edited.version, added.version + 1);

    let removed = delete_sentence(&store, added.id).await?;
    assert_eq!(removed, edited);
    assert!(list_sentences(&store, jog).await?.is_empty());

    let err = list_sentences(&store, 9_999).await.unwrap_err();
    assert!(err.is_not_found());
    let err = delete_sentence(&store, added.id).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn list_headwords_returns_full_trees_in_insertion_order() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    seed(&store).await?;
    add_headword(
        &store,
        &NewHeadword {
            word: "skakać".to_string(),
            translations: vec![NewTranslation::new("jump")],
        },
    )
    .await?;

    let all = list_headwords(&store).await?;
    let words: Vec<&str> = all.iter().map(|h| h.word.as_str()).collect();
    assert_eq!(words, vec!["biegać", "skakać"]);
    assert_eq!(all[0].translations[0].sentences.len(), 2);
    assert_eq!(all[1].translations[0].target_word, "jump");
    Ok(())
}
