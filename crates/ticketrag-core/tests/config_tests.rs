use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use ticketrag_core::config::{resolve_with_base, Config};

#[test]
#[serial]
fn defaults_apply_without_files() {
    let tmp = TempDir::new().unwrap();
    let settings = Config::load_from(tmp.path(), "test").unwrap().settings().unwrap();

    assert_eq!(settings.retrieval.top_k, 10);
    assert_eq!(settings.retrieval.min_alpha_chars, 10);
    assert_eq!(settings.retrieval.min_context_length, 100);
    assert_eq!(settings.retrieval.source_columns, vec!["Rewritten_Text", "Cleaned_Text", "text"]);
    assert_eq!(settings.server.port, 5000);
    assert_eq!(settings.data.reference_csv, "data/jira_reference.csv");
}

#[test]
#[serial]
fn env_file_then_env_vars_override() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[retrieval]\ntop_k = 4\nmin_alpha_chars = 6\n").unwrap();
    fs::write(tmp.path().join("config.test.toml"), "[retrieval]\ntop_k = 6\n").unwrap();

    let config = Config::load_from(tmp.path(), "test").unwrap();
    assert_eq!(config.get::<usize>("retrieval.top_k").unwrap(), 6);
    assert_eq!(config.get::<usize>("retrieval.min_alpha_chars").unwrap(), 6);

    std::env::set_var("APP_RETRIEVAL__TOP_K", "9");
    let config = Config::load_from(tmp.path(), "test");
    std::env::remove_var("APP_RETRIEVAL__TOP_K");
    assert_eq!(config.unwrap().settings().unwrap().retrieval.top_k, 9);
}

#[test]
#[serial]
fn zero_top_k_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[retrieval]\ntop_k = 0\n").unwrap();
    let err = Config::load_from(tmp.path(), "test").err().unwrap();
    assert!(err.to_string().contains("top_k"));
}

#[test]
#[serial]
fn empty_source_columns_are_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[retrieval]\nsource_columns = []\n").unwrap();
    assert!(Config::load_from(tmp.path(), "test").is_err());
}

#[test]
#[serial]
fn relative_paths_resolve_against_base() {
    std::env::set_var("TICKETRAG_TEST_DIR", "/srv/tickets");
    assert_eq!(resolve_with_base(std::path::Path::new("/base"), "data/x.csv"), std::path::PathBuf::from("/base/data/x.csv"));
    assert_eq!(
        resolve_with_base(std::path::Path::new("/base"), "${TICKETRAG_TEST_DIR}/x.csv"),
        std::path::PathBuf::from("/srv/tickets/x.csv")
    );
    std::env::remove_var("TICKETRAG_TEST_DIR");
}
