//! Request and response types for lex-daemon HTTP endpoints that are not
//! already dictionary records.
//!
//! Entity trees and edit payloads are the `lex_engine` types themselves;
//! only envelopes and query strings live here.

use lex_engine::{HeadwordSelector, RecordId, SelectorError};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    /// Storage backend label (`postgres`, `memory`).
    pub backend: String,
    pub uptime_secs: u64,
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// `invalid_input` | `not_found` | `version_conflict` | `storage`
    pub kind: String,
}

// ---------------------------------------------------------------------------
// ?id=..|word=..
// ---------------------------------------------------------------------------

/// Headword lookup keys as they arrive on the query string. Exactly one must
/// be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeadwordQuery {
    pub id: Option<RecordId>,
    pub word: Option<String>,
}

impl HeadwordQuery {
    pub fn into_selector(self) -> Result<HeadwordSelector, SelectorError> {
        HeadwordSelector::from_parts(self.id, self.word)
    }
}
