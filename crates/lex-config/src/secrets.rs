//! Runtime credential resolution.
//!
//! Config YAML stores only env var NAMES. Callers resolve once at startup
//! and pass the result into constructors. Error messages reference the env
//! var NAME, never the value, and `Debug` output is redacted.

use anyhow::{bail, Result};

use crate::DictConfig;

/// Database URL read from the env var named by `database.url_env`.
#[derive(Clone)]
pub struct ResolvedDatabaseUrl {
    pub env_var: String,
    pub url: String,
}

impl std::fmt::Debug for ResolvedDatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL may carry a password.
        f.debug_struct("ResolvedDatabaseUrl")
            .field("env_var", &self.env_var)
            .field("url", &"<REDACTED>")
            .finish()
    }
}

/// Returns `None` if the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub fn resolve_database_url(config: &DictConfig) -> Result<ResolvedDatabaseUrl> {
    let env_var = config.database.url_env.trim();
    if env_var.is_empty() {
        bail!("SECRETS_MISSING: database.url_env is empty");
    }
    match resolve_env(env_var) {
        Some(url) => Ok(ResolvedDatabaseUrl {
            env_var: env_var.to_string(),
            url,
        }),
        None => bail!(
            "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
            env_var
        ),
    }
}
