//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use glossa_core::Config;

use crate::output::{Output, OutputFormat};

/// Keys accepted by `config set`
const KEYS: &str = "data_dir, base_url, redis_url, spam_check_url, star_storage, per_page, \
                    cache_retry.max_attempts, cache_retry.base_delay_ms, cache_retry.max_delay_ms";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => output.json(&config)?,
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:       {}", config.data_dir.display());
            println!("  base_url:       {}", config.base_url);
            println!(
                "  redis_url:      {}",
                config.redis_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  spam_check_url: {}",
                if config.spam_check_url.is_empty() {
                    "(not set)"
                } else {
                    config.spam_check_url.as_str()
                }
            );
            println!("  star_storage:   {}", config.star_storage);
            println!("  per_page:       {}", config.per_page);
            println!(
                "  cache_retry:    {} attempts, {}-{} ms",
                config.cache_retry.max_attempts,
                config.cache_retry.base_delay_ms,
                config.cache_retry.max_delay_ms
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "base_url" => {
            glossa_core::KeywordLinks::new(value)?;
            config.base_url = value.to_string();
        }
        "redis_url" => {
            config.redis_url = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
        "spam_check_url" => {
            config.spam_check_url = if value == "none" {
                String::new()
            } else {
                value.to_string()
            };
        }
        "star_storage" => {
            config.star_storage = value.parse()?;
        }
        "per_page" => {
            config.per_page = parse_number(key, value)?;
            if config.per_page == 0 {
                bail!("per_page must be at least 1");
            }
        }
        "cache_retry.max_attempts" => {
            config.cache_retry.max_attempts = parse_number(key, value)?;
        }
        "cache_retry.base_delay_ms" => {
            config.cache_retry.base_delay_ms = parse_number(key, value)?;
        }
        "cache_retry.max_delay_ms" => {
            config.cache_retry.max_delay_ms = parse_number(key, value)?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                KEYS
            );
        }
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    match value.parse() {
        Ok(n) => Ok(n),
        Err(_) => bail!("Invalid value for {}: expected a non-negative number", key),
    }
}
