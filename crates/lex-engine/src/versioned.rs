//! Conflict-detection primitive used at all three levels.

use lex_schemas::{RecordId, Version};
use tracing::{debug, warn};

use crate::error::{DictError, DictResult, Entity};
use crate::store::{DictionaryStore, RecordFields};

/// Compare-and-swap write of one record.
///
/// On success returns the record's new version (`expected_version + 1`) so
/// the caller can keep its in-memory copy in sync without a re-read. Zero
/// affected rows becomes [`DictError::VersionConflict`].
pub async fn conditional_update<S>(
    store: &S,
    id: RecordId,
    expected_version: Version,
    fields: RecordFields<'_>,
) -> DictResult<Version>
where
    S: DictionaryStore + ?Sized,
{
    let entity = fields.entity();
    if store.conditional_update(id, expected_version, fields).await? {
        let version = expected_version + 1;
        debug!(%entity, id, version, "conditional update applied");
        Ok(version)
    } else {
        warn!(
            %entity,
            id,
            expected_version,
            backend = store.backend_name(),
            "conditional update matched no row: version conflict"
        );
        Err(DictError::VersionConflict { entity, id })
    }
}

/// Version check for an edit that carries an expected version but no scalar
/// change on this record. Nothing is written.
pub fn ensure_expected_version(
    entity: Entity,
    id: RecordId,
    stored: Version,
    expected: Option<Version>,
) -> DictResult<()> {
    match expected {
        Some(expected) if expected != stored => {
            warn!(%entity, id, expected, stored, "expected version is stale");
            Err(DictError::VersionConflict { entity, id })
        }
        _ => Ok(()),
    }
}
