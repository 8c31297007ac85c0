//! Scenario: lost-update detection at every level.
//!
//! # Invariants under test
//! - An edit carrying a stale `expected_version` fails with a version
//!   conflict and leaves the stored row unchanged.
//! - A foreign write landing between the engine's read and its write is
//!   reported as a conflict, not overwritten.
//! - A stale rename onto a word another headword holds is still a version
//!   conflict: the version check comes before uniqueness.
//! - There is no cross-row rollback: a conflict at translation index 2
//!   leaves the updates already applied at indices 0 and 1 committed.

use lex_engine::{
    add_headword, get_headword, get_sentence, update_headword, update_translation, DictError,
    Entity, HeadwordEdit, HeadwordSelector, NewExampleSentence, NewHeadword, NewTranslation,
    SentenceEdit, TranslationEdit,
};
use lex_testkit::MemoryStore;

async fn seed_three(store: &MemoryStore) -> anyhow::Result<lex_engine::Headword> {
    let hw = add_headword(
        store,
        &NewHeadword {
            word: "pisać".to_string(),
            translations: vec![
                NewTranslation {
                    target_word: "write".to_string(),
                    sentences: vec![NewExampleSentence::new("Piszę list.", "I write a letter.")],
                },
                NewTranslation::new("type"),
                NewTranslation::new("spell"),
            ],
        },
    )
    .await?;
    Ok(hw)
}

#[tokio::test]
async fn stale_expected_version_on_rename_is_rejected() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let hw = seed_three(&store).await?;

    let renamed = update_headword(
        &store,
        &HeadwordSelector::Id(hw.id),
        Some(&HeadwordEdit {
            word: Some("napisać".to_string()),
            expected_version: Some(hw.version),
            translations: None,
        }),
    )
    .await?;
    assert_eq!(renamed.version, hw.version + 1);

    // Second caller still holds the original version.
    let err = update_headword(
        &store,
        &HeadwordSelector::Id(hw.id),
        Some(&HeadwordEdit {
            word: Some("pisywać".to_string()),
            expected_version: Some(hw.version),
            translations: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(err.is_conflict(), "got {err:?}");

    let stored = get_headword(&store, &HeadwordSelector::Id(hw.id)).await?;
    assert_eq!(stored.word, "napisać");
    assert_eq!(stored.version, renamed.version);
    Ok(())
}

#[tokio::test]
async fn stale_expected_version_without_scalar_change_writes_nothing() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let hw = seed_three(&store).await?;

    let err = update_headword(
        &store,
        &HeadwordSelector::Word("pisać".to_string()),
        Some(&HeadwordEdit {
            word: None,
            expected_version: Some(hw.version + 7),
            translations: Some(vec![TranslationEdit::target_word("scribble")]),
        }),
    )
    .await
    .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(store.conditional_update_count(), 0);
    let stored = get_headword(&store, &HeadwordSelector::Id(hw.id)).await?;
    assert_eq!(stored.translations[0].target_word, "write");
    Ok(())
}

#[tokio::test]
async fn foreign_write_between_read_and_write_is_a_conflict() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let hw = seed_three(&store).await?;
    let translation = &hw.translations[1];

    store.interfere_before_update(Entity::Translation, translation.id);

    let err = update_translation(
        &store,
        translation.id,
        &TranslationEdit::target_word("key in"),
    )
    .await
    .unwrap_err();

    match err {
        DictError::VersionConflict { entity, id } => {
            assert_eq!(entity, Entity::Translation);
            assert_eq!(id, translation.id);
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(
        err_message_for(Entity::Translation),
        "this translation has been modified by a different process"
    );

    let stored = get_headword(&store, &HeadwordSelector::Id(hw.id)).await?;
    assert_eq!(stored.translations[1].target_word, "type");
    assert_eq!(stored.translations[1].version, translation.version + 1);
    Ok(())
}

fn err_message_for(entity: Entity) -> String {
    DictError::VersionConflict { entity, id: 0 }.to_string()
}

#[tokio::test]
async fn conflict_deep_in_tree_keeps_earlier_updates() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let hw = seed_three(&store).await?;
    let third = hw.translations[2].id;

    store.interfere_before_update(Entity::Translation, third);

    let err = update_headword(
        &store,
        &HeadwordSelector::Id(hw.id),
        Some(&HeadwordEdit {
            word: None,
            expected_version: None,
            translations: Some(vec![
                TranslationEdit {
                    target_word: Some("write down".to_string()),
                    expected_version: None,
                    sentences: Some(vec![SentenceEdit {
                        target_sentence: Some("I am writing a letter.".to_string()),
                        ..SentenceEdit::default()
                    }]),
                },
                TranslationEdit::target_word("typewrite"),
                TranslationEdit::target_word("spell out"),
            ]),
        }),
    )
    .await
    .unwrap_err();
    assert!(err.is_conflict());

    let stored = get_headword(&store, &HeadwordSelector::Id(hw.id)).await?;
    assert_eq!(stored.translations[0].target_word, "write down");
    assert_eq!(
        stored.translations[0].sentences[0].target_sentence,
        "I am writing a letter."
    );
    assert_eq!(stored.translations[0].sentences[0].source_sentence, "Piszę list.");
    assert_eq!(stored.translations[1].target_word, "typewrite");
    assert_eq!(stored.translations[2].target_word, "spell");
    Ok(())
}

#[tokio::test]
async fn sentence_conflict_surfaces_unchanged_through_headword_update() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let hw = seed_three(&store).await?;
    let sentence = &hw.translations[0].sentences[0];

    let err = update_headword(
        &store,
        &HeadwordSelector::Id(hw.id),
        Some(&HeadwordEdit {
            translations: Some(vec![TranslationEdit {
                sentences: Some(vec![SentenceEdit {
                    source_sentence: Some("Pisałem list.".to_string()),
                    expected_version: Some(sentence.version + 1),
                    ..SentenceEdit::default()
                }]),
                ..TranslationEdit::default()
            }]),
            ..HeadwordEdit::default()
        }),
    )
    .await
    .unwrap_err();

    match err {
        DictError::VersionConflict { entity, id } => {
            assert_eq!(entity, Entity::ExampleSentence);
            assert_eq!(id, sentence.id);
        }
        other => panic!("expected sentence conflict, got {other:?}"),
    }

    let unchanged = get_sentence(&store, sentence.id).await?;
    assert_eq!(unchanged.sentence.source_sentence, "Piszę list.");
    assert_eq!(unchanged.sentence.version, sentence.version);
    Ok(())
}

#[tokio::test]
async fn stale_rename_onto_taken_word_reports_the_conflict() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let hw = seed_three(&store).await?;
    add_headword(
        &store,
        &NewHeadword {
            word: "pisywać".to_string(),
            translations: Vec::new(),
        },
    )
    .await?;

    let err = update_headword(
        &store,
        &HeadwordSelector::Id(hw.id),
        Some(&HeadwordEdit {
            word: Some("pisywać".to_string()),
            expected_version: Some(hw.version + 1),
            translations: None,
        }),
    )
    .await
    .unwrap_err();

    assert!(err.is_conflict(), "got {err:?}");
    let stored = get_headword(&store, &HeadwordSelector::Id(hw.id)).await?;
    assert_eq!(stored.word, "pisać");
    assert_eq!(stored.version, hw.version);
    Ok(())
}
