//! Error taxonomy shared by the engine and every storage backend.

use lex_schemas::{RecordId, SelectorError};
use thiserror::Error;

pub type DictResult<T> = Result<T, DictError>;

/// Which of the three tables a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Headword,
    Translation,
    ExampleSentence,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Headword => "headword",
            Entity::Translation => "translation",
            Entity::ExampleSentence => "example sentence",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DictError {
    /// Caller supplied an unusable request. Raised before any mutation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The identifying key resolved to no row.
    #[error("{entity} not found: {key}")]
    NotFound { entity: Entity, key: String },

    /// A conditional update matched zero rows: somebody else wrote the record
    /// between our read and our write. Recoverable by re-reading.
    #[error("this {entity} has been modified by a different process")]
    VersionConflict { entity: Entity, id: RecordId },

    /// Anything else the storage backend reported.
    #[error("storage failure: {context}")]
    Storage {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl DictError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        DictError::InvalidInput(msg.into())
    }

    pub fn not_found(entity: Entity, key: impl std::fmt::Display) -> Self {
        DictError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn storage<E>(context: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DictError::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DictError::VersionConflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DictError::NotFound { .. })
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, DictError::InvalidInput(_))
    }

    /// Stable snake_case tag for wire responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DictError::InvalidInput(_) => "invalid_input",
            DictError::NotFound { .. } => "not_found",
            DictError::VersionConflict { .. } => "version_conflict",
            DictError::Storage { .. } => "storage",
        }
    }
}

impl From<SelectorError> for DictError {
    fn from(err: SelectorError) -> Self {
        DictError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_the_entity() {
        let err = DictError::VersionConflict {
            entity: Entity::ExampleSentence,
            id: 4,
        };
        assert_eq!(
            err.to_string(),
            "this example sentence has been modified by a different process"
        );
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
        assert_eq!(err.kind(), "version_conflict");
    }

    #[test]
    fn selector_errors_become_invalid_input() {
        let err: DictError = SelectorError::Missing.into();
        assert!(err.is_invalid_input());
        assert_eq!(
            err.to_string(),
            "invalid input: either id or word must be provided"
        );
    }

    #[test]
    fn storage_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = DictError::storage("fetch_headword failed", io);
        assert_eq!(err.to_string(), "storage failure: fetch_headword failed");
        let source = std::error::Error::source(&err).expect("source kept");
        assert_eq!(source.to_string(), "socket closed");
        assert_eq!(err.kind(), "storage");
    }

    #[test]
    fn not_found_formats_key() {
        let err = DictError::not_found(Entity::Headword, "word=pisać");
        assert_eq!(err.to_string(), "headword not found: word=pisać");
    }
}
