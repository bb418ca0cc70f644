//! Shared startup code for the hkrag binaries.
use anyhow::Result;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use hkrag_core::config::{Config, Settings};
use hkrag_core::error::Error;

/// `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

pub fn load_settings(config_dir: Option<&Path>) -> Result<Settings> {
    let config = match config_dir {
        Some(dir) => Config::load_from(dir)?,
        None => Config::load()?,
    };
    config.settings()
}

/// Setup instructions for configuration errors; other errors print as-is.
pub fn print_startup_error(err: &anyhow::Error) {
    match err.downcast_ref::<Error>() {
        Some(Error::MissingCredentials { provider, hint }) => {
            eprintln!("\n❌ {provider} API key not found!");
            eprintln!("\n🔑 Get your FREE Cohere API key:");
            eprintln!("1. Go to: https://dashboard.cohere.com/api-keys");
            eprintln!("2. Sign up (no credit card needed!)");
            eprintln!("3. Copy your API key");
            eprintln!("4. export COHERE_API_KEY=your_key_here (or set it in config.toml)");
            eprintln!("\n({hint})");
        }
        Some(Error::EmbedderMismatch { expected, found }) => {
            eprintln!("\n❌ The vector store was built with '{expected}' but '{found}' is configured.");
            eprintln!("💡 Re-run hkrag-ingest --reset, or configure the original embedding model.");
        }
        Some(e @ Error::InvalidConfig(_)) => eprintln!("\n❌ {e}"),
        _ => eprintln!("\n❌ Error: {err:#}"),
    }
}
