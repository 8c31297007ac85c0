//! lex-engine
//!
//! Hierarchical optimistic-concurrency update engine for the dictionary tree.
//!
//! Architectural decisions:
//! - Storage is reached only through [`DictionaryStore`]; the engine holds no
//!   locks and no cached graph. Every call reads fresh flat lists.
//! - Each record is guarded by its own version counter; a lost update is
//!   surfaced as [`DictError::VersionConflict`], never retried here.
//! - No transaction spans a multi-level edit. A conflict deep in the tree
//!   leaves earlier positional updates committed; callers re-fetch.
//! - Child edits are aligned with stored children by position. Longer edit
//!   lists insert, shorter ones leave the surplus untouched.

mod error;
mod headwords;
mod sentences;
mod store;
mod translations;
mod versioned;

pub use error::{DictError, DictResult, Entity};
pub use headwords::{add_headword, delete_headword, get_headword, list_headwords, update_headword};
pub use sentences::{
    add_sentence, delete_sentence, get_sentence, list_sentences, merge_sentences,
    reconcile_sentences, update_sentence,
};
pub use store::{DictionaryStore, RecordFields};
pub use translations::{
    add_translation, delete_translation, get_translation, list_translations,
    merge_translations, reconcile_translations, update_translation,
};
pub use versioned::{conditional_update, ensure_expected_version};

pub use lex_schemas::*;
