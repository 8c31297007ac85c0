use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lex_config::LoadedConfig;
use lex_db::PgDictionaryStore;
use lex_engine::{HeadwordEdit, HeadwordSelector, NewHeadword, NewTranslation, RecordId, Version};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;

/// Used when the config cannot be loaded.
const FALLBACK_LOG_FILTER: &str = "info";

#[derive(Parser)]
#[command(name = "lex")]
#[command(about = "Dictionary store CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (defaults apply when omitted)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Headword commands
    Headword {
        #[command(subcommand)]
        cmd: HeadwordCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum HeadwordCmd {
    /// Create (or fetch) a headword and attach translations.
    Add {
        #[arg(long)]
        word: String,

        /// Target-language translation; repeatable
        #[arg(long = "translation")]
        translations: Vec<String>,
    },

    /// Print one headword with its full tree.
    Show {
        #[arg(long)]
        id: Option<RecordId>,

        #[arg(long)]
        word: Option<String>,
    },

    /// Print every headword.
    List,

    /// Rename a headword located by id.
    Rename {
        #[arg(long)]
        id: RecordId,

        #[arg(long)]
        to: String,

        /// Fail with a version conflict unless the stored version matches
        #[arg(long)]
        expected_version: Option<Version>,
    },

    /// Delete a headword (children cascade) and print the deleted tree.
    Delete {
        #[arg(long)]
        id: Option<RecordId>,

        #[arg(long)]
        word: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    // A broken config only fails the commands that need it; logging falls
    // back to the default filter meanwhile.
    let config = load_config(&cli.config_paths);
    init_tracing(
        config
            .as_ref()
            .map(|l| l.config.logging.filter.as_str())
            .unwrap_or(FALLBACK_LOG_FILTER),
    );
    if let Ok(loaded) = &config {
        debug!(config_hash = %loaded.config_hash, "config loaded");
    }

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = connect(&config?).await?;
            match cmd {
                DbCmd::Status => {
                    let s = lex_db::status(&pool).await?;
                    println!("db_ok={} has_headwords_table={}", s.ok, s.has_headwords_table);
                }
                DbCmd::Migrate => {
                    lex_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = lex_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Headword { cmd } => run_headword(cmd, config).await?,
    }

    Ok(())
}

async fn run_headword(cmd: HeadwordCmd, config: Result<LoadedConfig>) -> Result<()> {
    match cmd {
        HeadwordCmd::Add { word, translations } => {
            let new = NewHeadword {
                word,
                translations: translations.into_iter().map(NewTranslation::new).collect(),
            };
            let store = open_store(&config?).await?;
            print_json(&lex_engine::add_headword(&store, &new).await?)
        }

        HeadwordCmd::Show { id, word } => {
            // Reject a bad selector before touching the database.
            let selector = HeadwordSelector::from_parts(id, word)?;
            let store = open_store(&config?).await?;
            print_json(&lex_engine::get_headword(&store, &selector).await?)
        }

        HeadwordCmd::List => {
            let store = open_store(&config?).await?;
            print_json(&lex_engine::list_headwords(&store).await?)
        }

        HeadwordCmd::Rename {
            id,
            to,
            expected_version,
        } => {
            let edit = HeadwordEdit {
                word: Some(to),
                expected_version,
                translations: None,
            };
            let store = open_store(&config?).await?;
            let updated =
                lex_engine::update_headword(&store, &HeadwordSelector::Id(id), Some(&edit)).await?;
            print_json(&updated)
        }

        HeadwordCmd::Delete { id, word } => {
            let selector = HeadwordSelector::from_parts(id, word)?;
            let store = open_store(&config?).await?;
            print_json(&lex_engine::delete_headword(&store, &selector).await?)
        }
    }
}

fn load_config(config_paths: &[String]) -> Result<LoadedConfig> {
    if config_paths.is_empty() {
        return lex_config::load_defaults();
    }
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    lex_config::load_layered_yaml(&path_refs)
}

async fn connect(loaded: &LoadedConfig) -> Result<PgPool> {
    let db_url = lex_config::resolve_database_url(&loaded.config)?;
    debug!(env_var = %db_url.env_var, "connecting");
    lex_db::connect(&db_url.url, loaded.config.database.max_connections)
        .await
        .with_context(|| format!("connect via {}", db_url.env_var))
}

async fn open_store(loaded: &LoadedConfig) -> Result<PgDictionaryStore> {
    Ok(PgDictionaryStore::new(connect(loaded).await?))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).context("serialize output failed")?;
    println!("{s}");
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable. RUST_LOG wins over
/// the configured filter.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
