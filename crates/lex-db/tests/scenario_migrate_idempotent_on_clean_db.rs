//! Migrating twice on a clean DB must be idempotent.
//!
//! DB-backed test, skipped if LEX_DATABASE_URL is not set.

#[tokio::test]
async fn migrate_idempotent_on_clean_db() -> anyhow::Result<()> {
    let url = match std::env::var(lex_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: LEX_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = lex_db::connect(&url, 2).await?;

    lex_db::migrate(&pool).await?;
    lex_db::migrate(&pool).await?;

    let st = lex_db::status(&pool).await?;
    assert!(st.ok);
    assert!(st.has_headwords_table);
    Ok(())
}
