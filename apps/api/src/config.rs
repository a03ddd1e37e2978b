use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::layout::engine::DEFAULT_MARGIN;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed numbers are startup errors.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub openscad_bin: String,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Fraction of a template's text box the layout engine may fill.
    pub text_margin: f64,
    /// Enables LLM intent routing when present.
    pub openai_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            openscad_bin: env_or("OPENSCAD_BIN", "openscad"),
            templates_dir: PathBuf::from(env_or("TEMPLATES_DIR", "templates")),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "out")),
            text_margin: parse_margin(&env_or("TEXT_MARGIN", &DEFAULT_MARGIN.to_string()))?,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_margin(raw: &str) -> Result<f64> {
    let margin = raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("TEXT_MARGIN must be a number, got '{raw}'"))?;
    if !(margin > 0.0 && margin <= 1.0) {
        anyhow::bail!("TEXT_MARGIN must be in (0, 1], got {margin}");
    }
    Ok(margin)
}
