use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.protocol, "http");
    assert_eq!(config.embedding.host, "localhost");
    assert_eq!(config.embedding.port, 11434);
    assert_eq!(config.embedding.model, "bge-large");
    assert_eq!(config.embedding.device, Device::Auto);
    assert_eq!(config.chunking.chunk_size, 384);
    assert!((config.chunking.overlap_fraction - 0.3).abs() < f64::EPSILON);
    assert_eq!(config.store.collection, "pdfs");
    assert_eq!(config.store.consistency, ConsistencyLevel::Eventually);
    assert_eq!(config.query.top_k, 5);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.embedding.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.batch_size = 1001;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_size = 8;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidChunkSize(8))
    ));

    let mut invalid_config = config.clone();
    invalid_config.chunking.overlap_fraction = 1.0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidOverlapFraction(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.chunking.separators = vec![String::new()];
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidSeparators)
    ));

    let mut invalid_config = config.clone();
    invalid_config.store.collection = "bad name; drop".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidCollection(_))
    ));

    let mut invalid_config = config;
    invalid_config.query.top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));
}

#[test]
fn ollama_url_generation() {
    let configs = vec![
        ("http", "localhost", 11434, "http://localhost:11434/"),
        ("http", "127.0.0.1", 8080, "http://127.0.0.1:8080/"),
        ("https", "secure.example.com", 443, "https://secure.example.com/"),
    ];

    for (protocol, host, port, expected_url) in configs {
        let config = EmbeddingConfig {
            protocol: protocol.to_string(),
            host: host.to_string(),
            port,
            ..EmbeddingConfig::default()
        };

        let url = config.ollama_url().expect("ollama_url is ok");
        assert_eq!(url.as_str(), expected_url);
    }

    let empty_host = EmbeddingConfig {
        host: String::new(),
        ..EmbeddingConfig::default()
    };
    assert!(empty_host.validate().is_err());
}

#[test]
fn setter_validation() {
    let mut config = EmbeddingConfig::default();

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_model("   ".to_string()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_batch_size(1001).is_err());

    assert_eq!(config.protocol, "https");
    assert_eq!(config.batch_size, 128);
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_config_uses_defaults() {
    let partial_toml = r#"
        [embedding]
        provider = "hashing"
        device = "cpu"

        [chunking]
        chunk_size = 256

        [store]
        consistency = "Strong"
    "#;

    let config: Config = toml::from_str(partial_toml).expect("should parse partial toml");
    assert_eq!(config.embedding.provider, EmbeddingProvider::Hashing);
    assert_eq!(config.embedding.device, Device::Cpu);
    assert_eq!(config.embedding.host, "localhost");
    assert_eq!(config.chunking.chunk_size, 256);
    assert_eq!(config.chunking.separators.len(), 5);
    assert_eq!(config.store.consistency, ConsistencyLevel::Strong);
    assert_eq!(config.store.collection, "pdfs");
    assert_eq!(config.query.top_k, 5);
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing file falls back to defaults");

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.embedding, EmbeddingConfig::default());
}

#[test]
fn save_and_load_roundtrip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().join("nested"),
        ..Config::default()
    };
    config.store.collection = "papers".to_string();
    config.query.top_k = 3;

    config.save().expect("config should save");
    assert!(config.config_file_path().exists());

    let loaded = Config::load(temp_dir.path().join("nested")).expect("config should load");
    assert_eq!(loaded, config);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join(CONFIG_FILE_NAME),
        "[chunking]\nchunk_size = 2\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn vector_database_path_resolution() {
    let mut config = Config {
        base_dir: PathBuf::from("/home/user/.pdf-rag"),
        ..Config::default()
    };
    assert_eq!(
        config.vector_database_path(),
        PathBuf::from("/home/user/.pdf-rag/db")
    );

    config.store.path = PathBuf::from("/var/lib/rag");
    assert_eq!(config.vector_database_path(), PathBuf::from("/var/lib/rag"));
}

#[test]
fn collection_names() {
    assert!(validate_collection_name("pdfs").is_ok());
    assert!(validate_collection_name("my-docs_2").is_ok());
    assert!(validate_collection_name("").is_err());
    assert!(validate_collection_name("has space").is_err());
    assert!(validate_collection_name("quote'd").is_err());
}
