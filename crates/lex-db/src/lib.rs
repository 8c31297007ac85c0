//! lex-db
//!
//! PostgreSQL backend for the dictionary engine plus the pool/migration
//! helpers the binaries use at boot.

use anyhow::{Context, Result};
use lex_engine::{
    DictError, DictResult, DictionaryStore, Entity, ExampleSentence, Headword, HeadwordSelector,
    RecordFields, RecordId, Translation, Version,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::debug;

pub const ENV_DB_URL: &str = "LEX_DATABASE_URL";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

const UQ_HEADWORDS_WORD: &str = "uq_headwords_word";
const UQ_EXAMPLE_SENTENCES_TEXT: &str = "uq_example_sentences_text";

/// Connect to Postgres using LEX_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, DEFAULT_MAX_CONNECTIONS).await
}

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='headwords'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_headwords_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_headwords_table: bool,
}

// ---------------------------------------------------------------------------
// DictionaryStore implementation
// ---------------------------------------------------------------------------

/// [`DictionaryStore`] over a shared connection pool. Every trait method is
/// a single statement, so per-row atomicity comes from Postgres itself.
#[derive(Clone)]
pub struct PgDictionaryStore {
    pool: PgPool,
}

impl PgDictionaryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn headword_from_row(row: &PgRow) -> Result<Headword, sqlx::Error> {
    Ok(Headword::new(
        row.try_get("id")?,
        row.try_get::<String, _>("word")?,
        row.try_get("version")?,
    ))
}

fn translation_from_row(row: &PgRow) -> Result<Translation, sqlx::Error> {
    Ok(Translation::new(
        row.try_get("id")?,
        row.try_get("headword_id")?,
        row.try_get::<String, _>("target_word")?,
        row.try_get("version")?,
    ))
}

fn sentence_from_row(row: &PgRow) -> Result<ExampleSentence, sqlx::Error> {
    Ok(ExampleSentence {
        id: row.try_get("id")?,
        translation_id: row.try_get("translation_id")?,
        source_sentence: row.try_get("source_sentence")?,
        target_sentence: row.try_get("target_sentence")?,
        version: row.try_get("version")?,
    })
}

/// Detect a Postgres unique constraint violation by name.
fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

/// Postgres foreign_key_violation is 23503.
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23503"),
        _ => false,
    }
}

fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> DictError {
    move |e| DictError::storage(context, e)
}

/// Map `fetch_optional` + row decoding into NotFound / Storage.
fn required<T>(
    row: Option<PgRow>,
    decode: fn(&PgRow) -> Result<T, sqlx::Error>,
    entity: Entity,
    key: impl std::fmt::Display,
    context: &'static str,
) -> DictResult<T> {
    match row {
        Some(row) => decode(&row).map_err(storage(context)),
        None => Err(DictError::not_found(entity, key)),
    }
}

fn decode_all<T>(
    rows: Vec<PgRow>,
    decode: fn(&PgRow) -> Result<T, sqlx::Error>,
    context: &'static str,
) -> DictResult<Vec<T>> {
    rows.iter()
        .map(|r| decode(r).map_err(storage(context)))
        .collect()
}

#[async_trait::async_trait]
impl DictionaryStore for PgDictionaryStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_headword(&self, selector: &HeadwordSelector) -> DictResult<Headword> {
        let row = match selector {
            HeadwordSelector::Id(id) => {
                sqlx::query("select id, word, version from headwords where id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
            }
            HeadwordSelector::Word(word) => {
                sqlx::query("select id, word, version from headwords where word = $1")
                    .bind(word)
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(storage("fetch_headword failed"))?;

        required(
            row,
            headword_from_row,
            Entity::Headword,
            selector,
            "fetch_headword decode failed",
        )
    }

    async fn list_headwords(&self) -> DictResult<Vec<Headword>> {
        let rows = sqlx::query("select id, word, version from headwords order by id asc")
            .fetch_all(&self.pool)
            .await
            .map_err(storage("list_headwords failed"))?;
        decode_all(rows, headword_from_row, "list_headwords decode failed")
    }

    async fn insert_or_fetch_headword(&self, word: &str) -> DictResult<Headword> {
        // The no-op update makes `returning` yield the existing row on
        // conflict, in the same statement.
        let row = sqlx::query(
            r#"
            insert into headwords (word)
            values ($1)
            on conflict (word) do update set word = excluded.word
            returning id, word, version
            "#,
        )
        .bind(word)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("insert_or_fetch_headword failed"))?;

        let headword = headword_from_row(&row)
            .map_err(storage("insert_or_fetch_headword decode failed"))?;
        debug!(headword_id = headword.id, word, "headword inserted or fetched");
        Ok(headword)
    }

    async fn delete_headword(&self, selector: &HeadwordSelector) -> DictResult<Headword> {
        let row = match selector {
            HeadwordSelector::Id(id) => {
                sqlx::query("delete from headwords where id = $1 returning id, word, version")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
            }
            HeadwordSelector::Word(word) => {
                sqlx::query("delete from headwords where word = $1 returning id, word, version")
                    .bind(word)
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(storage("delete_headword failed"))?;

        required(
            row,
            headword_from_row,
            Entity::Headword,
            selector,
            "delete_headword decode failed",
        )
    }

    async fn fetch_translation(&self, id: RecordId) -> DictResult<Translation> {
        let row = sqlx::query(
            "select id, headword_id, target_word, version from translations where id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("fetch_translation failed"))?;

        required(
            row,
            translation_from_row,
            Entity::Translation,
            id,
            "fetch_translation decode failed",
        )
    }

    async fn list_translations(&self, headword_id: RecordId) -> DictResult<Vec<Translation>> {
        let rows = sqlx::query(
            r#"
            select id, headword_id, target_word, version
            from translations
            where headword_id = $1
            order by id asc
            "#,
        )
        .bind(headword_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("list_translations failed"))?;

        decode_all(rows, translation_from_row, "list_translations decode failed")
    }

    async fn insert_translation(
        &self,
        headword_id: RecordId,
        target_word: &str,
    ) -> DictResult<Translation> {
        let res = sqlx::query(
            r#"
            insert into translations (headword_id, target_word)
            values ($1, $2)
            returning id, headword_id, target_word, version
            "#,
        )
        .bind(headword_id)
        .bind(target_word)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => {
                translation_from_row(&row).map_err(storage("insert_translation decode failed"))
            }
            // Parent deleted between the engine's read and this insert.
            Err(e) if is_foreign_key_violation(&e) => {
                Err(DictError::not_found(Entity::Headword, headword_id))
            }
            Err(e) => Err(DictError::storage("insert_translation failed", e)),
        }
    }

    async fn delete_translation(&self, id: RecordId) -> DictResult<Translation> {
        let row = sqlx::query(
            r#"
            delete from translations
            where id = $1
            returning id, headword_id, target_word, version
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("delete_translation failed"))?;

        required(
            row,
            translation_from_row,
            Entity::Translation,
            id,
            "delete_translation decode failed",
        )
    }

    async fn fetch_sentence(&self, id: RecordId) -> DictResult<ExampleSentence> {
        let row = sqlx::query(
            r#"
            select id, translation_id, source_sentence, target_sentence, version
            from example_sentences
            where id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("fetch_sentence failed"))?;

        required(
            row,
            sentence_from_row,
            Entity::ExampleSentence,
            id,
            "fetch_sentence decode failed",
        )
    }

    async fn list_sentences(&self, translation_id: RecordId) -> DictResult<Vec<ExampleSentence>> {
        let rows = sqlx::query(
            r#"
            select id, translation_id, source_sentence, target_sentence, version
            from example_sentences
            where translation_id = $1
            order by id asc
            "#,
        )
        .bind(translation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("list_sentences failed"))?;

        decode_all(rows, sentence_from_row, "list_sentences decode failed")
    }

    async fn insert_sentence(
        &self,
        translation_id: RecordId,
        source_sentence: &str,
        target_sentence: &str,
    ) -> DictResult<ExampleSentence> {
        let res = sqlx::query(
            r#"
            insert into example_sentences (translation_id, source_sentence, target_sentence)
            values ($1, $2, $3)
            returning id, translation_id, source_sentence, target_sentence, version
            "#,
        )
        .bind(translation_id)
        .bind(source_sentence)
        .bind(target_sentence)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => sentence_from_row(&row).map_err(storage("insert_sentence decode failed")),
            Err(e) if is_foreign_key_violation(&e) => {
                Err(DictError::not_found(Entity::Translation, translation_id))
            }
            Err(e) if is_unique_constraint_violation(&e, UQ_EXAMPLE_SENTENCES_TEXT) => {
                Err(DictError::invalid("example sentence already exists"))
            }
            Err(e) => Err(DictError::storage("insert_sentence failed", e)),
        }
    }

    async fn insert_or_fetch_sentence(
        &self,
        translation_id: RecordId,
        source_sentence: &str,
        target_sentence: &str,
    ) -> DictResult<ExampleSentence> {
        // Same no-op update trick as headwords: the existing row comes back
        // from `returning` with its version untouched.
        let res = sqlx::query(
            r#"
            insert into example_sentences (translation_id, source_sentence, target_sentence)
            values ($1, $2, $3)
            on conflict (translation_id, source_sentence, target_sentence)
              do update set source_sentence = excluded.source_sentence
            returning id, translation_id, source_sentence, target_sentence, version
            "#,
        )
        .bind(translation_id)
        .bind(source_sentence)
        .bind(target_sentence)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => sentence_from_row(&row)
                .map_err(storage("insert_or_fetch_sentence decode failed")),
            Err(e) if is_foreign_key_violation(&e) => {
                Err(DictError::not_found(Entity::Translation, translation_id))
            }
            Err(e) => Err(DictError::storage("insert_or_fetch_sentence failed", e)),
        }
    }

    async fn delete_sentence(&self, id: RecordId) -> DictResult<ExampleSentence> {
        let row = sqlx::query(
            r#"
            delete from example_sentences
            where id = $1
            returning id, translation_id, source_sentence, target_sentence, version
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("delete_sentence failed"))?;

        required(
            row,
            sentence_from_row,
            Entity::ExampleSentence,
            id,
            "delete_sentence decode failed",
        )
    }

    async fn conditional_update(
        &self,
        id: RecordId,
        expected_version: Version,
        fields: RecordFields<'_>,
    ) -> DictResult<bool> {
        let res = match fields {
            RecordFields::Headword { word } => {
                sqlx::query(
                    r#"
                    update headwords
                    set word = $3, version = version + 1
                    where id = $1 and version = $2
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(word)
                .execute(&self.pool)
                .await
            }
            RecordFields::Translation { target_word } => {
                sqlx::query(
                    r#"
                    update translations
                    set target_word = $3, version = version + 1
                    where id = $1 and version = $2
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(target_word)
                .execute(&self.pool)
                .await
            }
            RecordFields::ExampleSentence {
                source_sentence,
                target_sentence,
            } => {
                sqlx::query(
                    r#"
                    update example_sentences
                    set source_sentence = $3, target_sentence = $4, version = version + 1
                    where id = $1 and version = $2
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(source_sentence)
                .bind(target_sentence)
                .execute(&self.pool)
                .await
            }
        };

        match res {
            Ok(done) => Ok(done.rows_affected() == 1),
            Err(e) if is_unique_constraint_violation(&e, UQ_HEADWORDS_WORD) => {
                Err(DictError::invalid("headword already exists"))
            }
            Err(e) if is_unique_constraint_violation(&e, UQ_EXAMPLE_SENTENCES_TEXT) => {
                Err(DictError::invalid("example sentence already exists"))
            }
            Err(e) => Err(DictError::storage(
                format!("conditional update of {} failed", fields.entity()),
                e,
            )),
        }
    }
}
