//! lex-testkit
//!
//! In-process [`DictionaryStore`] used by scenario tests and by the daemon's
//! route tests. Behaves like the Postgres backend where the engine can
//! observe it: per-table ascending ids, unique words and sentence pairs,
//! cascading deletes and an atomic compare-and-increment on every
//! conditional update.
//!
//! On top of that it can inject a concurrent writer between the engine's
//! read and its write ([`MemoryStore::interfere_before_update`]), which is
//! the only way to exercise the conflict path deterministically.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use lex_engine::{
    DictError, DictResult, DictionaryStore, Entity, ExampleSentence, Headword, HeadwordSelector,
    RecordFields, RecordId, Translation, Version, INITIAL_VERSION,
};
use tracing::debug;

#[derive(Default)]
struct Tables {
    next_headword_id: RecordId,
    next_translation_id: RecordId,
    next_sentence_id: RecordId,
    headwords: BTreeMap<RecordId, Headword>,
    translations: BTreeMap<RecordId, Translation>,
    sentences: BTreeMap<RecordId, ExampleSentence>,
    interference: BTreeSet<(Entity, RecordId)>,
    conditional_updates: usize,
}

impl Tables {
    fn headword_by(&self, selector: &HeadwordSelector) -> DictResult<&Headword> {
        let found = match selector {
            HeadwordSelector::Id(id) => self.headwords.get(id),
            HeadwordSelector::Word(word) => self.headwords.values().find(|h| &h.word == word),
        };
        found.ok_or_else(|| DictError::not_found(Entity::Headword, selector))
    }

    fn cascade_translation(&mut self, translation_id: RecordId) {
        self.sentences
            .retain(|_, s| s.translation_id != translation_id);
    }

    fn stored_version(&self, entity: Entity, id: RecordId) -> Option<Version> {
        match entity {
            Entity::Headword => self.headwords.get(&id).map(|r| r.version),
            Entity::Translation => self.translations.get(&id).map(|r| r.version),
            Entity::ExampleSentence => self.sentences.get(&id).map(|r| r.version),
        }
    }

    /// Row holding the `(translation_id, source, target)` triple, other than
    /// `except`.
    fn sentence_with_text(
        &self,
        translation_id: RecordId,
        source_sentence: &str,
        target_sentence: &str,
        except: Option<RecordId>,
    ) -> Option<&ExampleSentence> {
        self.sentences.values().find(|s| {
            s.translation_id == translation_id
                && s.source_sentence == source_sentence
                && s.target_sentence == target_sentence
                && Some(s.id) != except
        })
    }

    fn push_sentence(
        &mut self,
        translation_id: RecordId,
        source_sentence: &str,
        target_sentence: &str,
    ) -> ExampleSentence {
        self.next_sentence_id += 1;
        let row = ExampleSentence {
            id: self.next_sentence_id,
            translation_id,
            source_sentence: source_sentence.to_string(),
            target_sentence: target_sentence.to_string(),
            version: INITIAL_VERSION,
        };
        self.sentences.insert(row.id, row.clone());
        row
    }

    /// Simulated foreign writer: bump the stored version without touching
    /// any other field.
    fn bump_version(&mut self, entity: Entity, id: RecordId) {
        let version = match entity {
            Entity::Headword => self.headwords.get_mut(&id).map(|r| &mut r.version),
            Entity::Translation => self.translations.get_mut(&id).map(|r| &mut r.version),
            Entity::ExampleSentence => self.sentences.get_mut(&id).map(|r| &mut r.version),
        };
        if let Some(version) = version {
            *version += 1;
            debug!(%entity, id, version = *version, "interfering writer bumped version");
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arrange for another writer to update `(entity, id)` right before the
    /// next conditional update of that row. One-shot.
    pub fn interfere_before_update(&self, entity: Entity, id: RecordId) {
        self.lock().interference.insert((entity, id));
    }

    pub fn headword_count(&self) -> usize {
        self.lock().headwords.len()
    }

    pub fn translation_count(&self) -> usize {
        self.lock().translations.len()
    }

    pub fn sentence_count(&self) -> usize {
        self.lock().sentences.len()
    }

    /// Number of conditional updates attempted, applied or not.
    pub fn conditional_update_count(&self) -> usize {
        self.lock().conditional_updates
    }
}

#[async_trait::async_trait]
impl DictionaryStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_headword(&self, selector: &HeadwordSelector) -> DictResult<Headword> {
        self.lock().headword_by(selector).cloned()
    }

    async fn list_headwords(&self) -> DictResult<Vec<Headword>> {
        Ok(self.lock().headwords.values().cloned().collect())
    }

    async fn insert_or_fetch_headword(&self, word: &str) -> DictResult<Headword> {
        let mut t = self.lock();
        if let Some(existing) = t.headwords.values().find(|h| h.word == word) {
            return Ok(existing.clone());
        }
        t.next_headword_id += 1;
        let row = Headword::new(t.next_headword_id, word, INITIAL_VERSION);
        t.headwords.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_headword(&self, selector: &HeadwordSelector) -> DictResult<Headword> {
        let mut t = self.lock();
        let id = t.headword_by(selector)?.id;
        let children: Vec<RecordId> = t
            .translations
            .values()
            .filter(|tr| tr.headword_id == id)
            .map(|tr| tr.id)
            .collect();
        for translation_id in children {
            t.cascade_translation(translation_id);
            t.translations.remove(&translation_id);
        }
        t.headwords
            .remove(&id)
            .ok_or_else(|| DictError::not_found(Entity::Headword, selector))
    }

    async fn fetch_translation(&self, id: RecordId) -> DictResult<Translation> {
        self.lock()
            .translations
            .get(&id)
            .cloned()
            .ok_or_else(|| DictError::not_found(Entity::Translation, id))
    }

    async fn list_translations(&self, headword_id: RecordId) -> DictResult<Vec<Translation>> {
        Ok(self
            .lock()
            .translations
            .values()
            .filter(|t| t.headword_id == headword_id)
            .cloned()
            .collect())
    }

    async fn insert_translation(
        &self,
        headword_id: RecordId,
        target_word: &str,
    ) -> DictResult<Translation> {
        let mut t = self.lock();
        if !t.headwords.contains_key(&headword_id) {
            return Err(DictError::not_found(Entity::Headword, headword_id));
        }
        t.next_translation_id += 1;
        let row = Translation::new(
            t.next_translation_id,
            headword_id,
            target_word,
            INITIAL_VERSION,
        );
        t.translations.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_translation(&self, id: RecordId) -> DictResult<Translation> {
        let mut t = self.lock();
        let row = t
            .translations
            .remove(&id)
            .ok_or_else(|| DictError::not_found(Entity::Translation, id))?;
        t.cascade_translation(id);
        Ok(row)
    }

    async fn fetch_sentence(&self, id: RecordId) -> DictResult<ExampleSentence> {
        self.lock()
            .sentences
            .get(&id)
            .cloned()
            .ok_or_else(|| DictError::not_found(Entity::ExampleSentence, id))
    }

    async fn list_sentences(&self, translation_id: RecordId) -> DictResult<Vec<ExampleSentence>> {
        Ok(self
            .lock()
            .sentences
            .values()
            .filter(|s| s.translation_id == translation_id)
            .cloned()
            .collect())
    }

    async fn insert_sentence(
        &self,
        translation_id: RecordId,
        source_sentence: &str,
        target_sentence: &str,
    ) -> DictResult<ExampleSentence> {
        let mut t = self.lock();
        if !t.translations.contains_key(&translation_id) {
            return Err(DictError::not_found(Entity::Translation, translation_id));
        }
        if t
            .sentence_with_text(translation_id, source_sentence, target_sentence, None)
            .is_some()
        {
            return Err(DictError::invalid("example sentence already exists"));
        }
        Ok(t.push_sentence(translation_id, source_sentence, target_sentence))
    }

    async fn insert_or_fetch_sentence(
        &self,
        translation_id: RecordId,
        source_sentence: &str,
        target_sentence: &str,
    ) -> DictResult<ExampleSentence> {
        let mut t = self.lock();
        if !t.translations.contains_key(&translation_id) {
            return Err(DictError::not_found(Entity::Translation, translation_id));
        }
        if let Some(existing) =
            t.sentence_with_text(translation_id, source_sentence, target_sentence, None)
        {
            return Ok(existing.clone());
        }
        Ok(t.push_sentence(translation_id, source_sentence, target_sentence))
    }

    async fn delete_sentence(&self, id: RecordId) -> DictResult<ExampleSentence> {
        self.lock()
            .sentences
            .remove(&id)
            .ok_or_else(|| DictError::not_found(Entity::ExampleSentence, id))
    }

    async fn conditional_update(
        &self,
        id: RecordId,
        expected_version: Version,
        fields: RecordFields<'_>,
    ) -> DictResult<bool> {
        let mut t = self.lock();
        t.conditional_updates += 1;

        let entity = fields.entity();
        if t.interference.remove(&(entity, id)) {
            t.bump_version(entity, id);
        }

        // Version first: a stale write never reaches the uniqueness checks.
        if t.stored_version(entity, id) != Some(expected_version) {
            return Ok(false);
        }

        match fields {
            RecordFields::Headword { word } => {
                if t.headwords.values().any(|h| h.word == word && h.id != id) {
                    return Err(DictError::invalid("headword already exists"));
                }
            }
            RecordFields::ExampleSentence {
                source_sentence,
                target_sentence,
            } => {
                let parent = t.sentences.get(&id).map(|s| s.translation_id);
                if let Some(translation_id) = parent {
                    let taken = t
                        .sentence_with_text(
                            translation_id,
                            source_sentence,
                            target_sentence,
                            Some(id),
                        )
                        .is_some();
                    if taken {
                        return Err(DictError::invalid("example sentence already exists"));
                    }
                }
            }
            RecordFields::Translation { .. } => {}
        }

        let applied = match fields {
            RecordFields::Headword { word } => match t.headwords.get_mut(&id) {
                Some(row) if row.version == expected_version => {
                    row.word = word.to_string();
                    row.version += 1;
                    true
                }
                _ => false,
            },
            RecordFields::Translation { target_word } => match t.translations.get_mut(&id) {
                Some(row) if row.version == expected_version => {
                    row.target_word = target_word.to_string();
                    row.version += 1;
                    true
                }
                _ => false,
            },
            RecordFields::ExampleSentence {
                source_sentence,
                target_sentence,
            } => match t.sentences.get_mut(&id) {
                Some(row) if row.version == expected_version => {
                    row.source_sentence = source_sentence.to_string();
                    row.target_sentence = target_sentence.to_string();
                    row.version += 1;
                    true
                }
                _ => false,
            },
        };
        Ok(applied)
    }
}
