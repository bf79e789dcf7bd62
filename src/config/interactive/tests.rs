use super::*;
use tempfile::TempDir;

#[test]
fn load_existing_config_defaults_in_empty_dir() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = load_existing_config(temp_dir.path()).expect("config loaded successfully");

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert!(!config.embedding.host.is_empty());
    assert!(config.embedding.port > 0);
    assert!(!config.embedding.model.is_empty());
    assert!(config.embedding.batch_size > 0);
}

#[test]
fn load_existing_config_recovers_from_invalid_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(
        temp_dir.path().join(crate::config::settings::CONFIG_FILE_NAME),
        "[query]\ntop_k = 0\n",
    )
    .expect("should write config");

    let config = load_existing_config(temp_dir.path()).expect("falls back to defaults");
    assert_eq!(config.query.top_k, 5);
}

#[test]
fn show_config_reads_saved_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.save().expect("config should save");

    assert!(show_config(temp_dir.path()).is_ok());
}

#[test]
fn unreachable_ollama_reports_failure() {
    let embedding = EmbeddingConfig {
        host: "127.0.0.1".to_string(),
        port: 9,
        timeout_secs: 1,
        ..EmbeddingConfig::default()
    };

    assert!(!test_ollama_connection(&embedding));
}
