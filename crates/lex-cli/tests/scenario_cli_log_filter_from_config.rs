//! The CLI's log level follows `logging.filter` from the layered config
//! unless RUST_LOG is set.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn lex_in(dir: &tempfile::TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("lex").expect("lex binary");
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("LEX_DATABASE_URL");
    cmd
}

#[test]
fn configured_debug_filter_is_applied() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("debug.yaml");
    fs::write(&path, "logging:\n  filter: debug\n")?;

    lex_in(&dir)
        .arg("--config")
        .arg(&path)
        .args(["headword", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config loaded"))
        .stderr(predicate::str::contains("either id or word must be provided"));
    Ok(())
}

#[test]
fn default_filter_hides_debug_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    lex_in(&dir)
        .args(["headword", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config loaded").not());
    Ok(())
}

#[test]
fn rust_log_overrides_configured_filter() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("debug.yaml");
    fs::write(&path, "logging:\n  filter: debug\n")?;

    lex_in(&dir)
        .env("RUST_LOG", "error")
        .arg("--config")
        .arg(&path)
        .args(["headword", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config loaded").not());
    Ok(())
}
