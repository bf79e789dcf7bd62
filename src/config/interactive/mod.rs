#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, EmbeddingConfig, validate_collection_name};
use crate::database::lancedb::ConsistencyLevel;
use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::{Device, EmbeddingProvider};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 PDF RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("Choose how chunk and question embeddings are produced.");
    eprintln!();

    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Chunking Configuration").bold().yellow());
    configure_chunking(&mut config.chunking)?;

    eprintln!();
    eprintln!("{}", style("Vector Store Configuration").bold().yellow());
    configure_store(&mut config)?;

    if config.embedding.provider == EmbeddingProvider::Ollama {
        eprintln!();
        eprintln!("{}", style("Testing configuration...").yellow());

        if test_ollama_connection(&config.embedding) {
            eprintln!("{}", style("✓ Ollama connection successful!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not connect to Ollama").yellow()
            );
            eprintln!("You can continue, but make sure Ollama is running before ingesting.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!(
        "  Provider: {}",
        style(format!("{:?}", config.embedding.provider)).cyan()
    );
    match config.embedding.provider {
        EmbeddingProvider::Ollama => {
            match config.embedding.ollama_url() {
                Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
                Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
            }
            eprintln!("  Model: {}", style(&config.embedding.model).cyan());
            eprintln!(
                "  Device: {}",
                style(format!("{:?}", config.embedding.device)).cyan()
            );
            eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());
        }
        EmbeddingProvider::Hashing => {
            eprintln!(
                "  Dimension: {}",
                style(config.embedding.hashing_dimension).cyan()
            );
        }
    }

    eprintln!();
    eprintln!("{}", style("Chunking Settings:").bold().yellow());
    eprintln!("  Chunk Size: {}", style(config.chunking.chunk_size).cyan());
    eprintln!(
        "  Overlap: {} ({} chars)",
        style(config.chunking.overlap_fraction).cyan(),
        config.chunking.overlap_chars()
    );
    eprintln!(
        "  Separators: {}",
        style(format!("{:?}", config.chunking.separators)).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Store Settings:").bold().yellow());
    eprintln!(
        "  Path: {}",
        style(config.vector_database_path().display()).cyan()
    );
    eprintln!("  Collection: {}", style(&config.store.collection).cyan());
    eprintln!(
        "  Consistency: {}",
        style(format!("{:?}", config.store.consistency)).cyan()
    );
    eprintln!("  Top K: {}", style(config.query.top_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    let exists = config_dir.join(super::settings::CONFIG_FILE_NAME).exists();
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("Existing configuration is invalid. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            if exists {
                eprintln!("{}", style("Found existing configuration.").green());
            } else {
                eprintln!(
                    "{}",
                    style("No existing configuration found. Using defaults.").yellow()
                );
            }
            Ok(config)
        },
    )
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let providers = &["ollama", "hashing"];
    let provider_index = Select::new()
        .with_prompt("Embedding provider")
        .default(match embedding.provider {
            EmbeddingProvider::Ollama => 0,
            EmbeddingProvider::Hashing => 1,
        })
        .items(providers)
        .interact()?;

    if provider_index == 1 {
        embedding.provider = EmbeddingProvider::Hashing;
        embedding.hashing_dimension = Input::new()
            .with_prompt("Hashing embedding dimension")
            .default(embedding.hashing_dimension)
            .validate_with(|input: &usize| -> Result<(), &str> {
                if (8..=4096).contains(input) {
                    Ok(())
                } else {
                    Err("Dimension must be between 8 and 4096")
                }
            })
            .interact_text()?;
        return Ok(());
    }

    embedding.provider = EmbeddingProvider::Ollama;
    configure_ollama(embedding)
}

fn configure_ollama(embedding: &mut EmbeddingConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == embedding.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(embedding.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = EmbeddingConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..EmbeddingConfig::default()
            };
            temp_config.ollama_url()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(embedding.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let devices = &["auto", "cpu"];
    let device_index = Select::new()
        .with_prompt("Compute device")
        .default(match embedding.device {
            Device::Auto => 0,
            Device::Cpu => 1,
        })
        .items(devices)
        .interact()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(embedding.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embedding.set_protocol(protocol)?;
    embedding.set_host(host)?;
    embedding.set_port(port)?;
    embedding.set_model(model)?;
    embedding.set_batch_size(batch_size)?;
    embedding.device = if device_index == 1 {
        Device::Cpu
    } else {
        Device::Auto
    };

    Ok(())
}

fn configure_chunking(chunking: &mut ChunkingConfig) -> Result<()> {
    chunking.chunk_size = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(chunking.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (16..=8192).contains(input) {
                Ok(())
            } else {
                Err("Chunk size must be between 16 and 8192")
            }
        })
        .interact_text()?;

    chunking.overlap_fraction = Input::new()
        .with_prompt("Overlap fraction")
        .default(chunking.overlap_fraction)
        .validate_with(|input: &f64| -> Result<(), &str> {
            if (0.0..=0.9).contains(input) {
                Ok(())
            } else {
                Err("Overlap fraction must be between 0.0 and 0.9")
            }
        })
        .interact_text()?;

    Ok(())
}

fn configure_store(config: &mut Config) -> Result<()> {
    config.store.collection = Input::new()
        .with_prompt("Default collection name")
        .default(config.store.collection.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            validate_collection_name(input)
        })
        .interact_text()?;

    let levels = &["Eventually", "Strong"];
    let level_index = Select::new()
        .with_prompt("Read consistency")
        .default(match config.store.consistency {
            ConsistencyLevel::Eventually => 0,
            ConsistencyLevel::Strong => 1,
        })
        .items(levels)
        .interact()?;
    config.store.consistency = if level_index == 1 {
        ConsistencyLevel::Strong
    } else {
        ConsistencyLevel::Eventually
    };

    config.query.top_k = Input::new()
        .with_prompt("Default number of results per question")
        .default(config.query.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=1000).contains(input) {
                Ok(())
            } else {
                Err("Top K must be between 1 and 1000")
            }
        })
        .interact_text()?;

    Ok(())
}

fn test_ollama_connection(embedding: &EmbeddingConfig) -> bool {
    let Ok(url) = embedding
        .ollama_url()
        .and_then(|base| {
            base.join("/api/version")
                .map_err(|e| ConfigError::InvalidUrl(e.to_string()))
        })
    else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) => (400..500).contains(&code),
        Err(_) => false,
    }
}
