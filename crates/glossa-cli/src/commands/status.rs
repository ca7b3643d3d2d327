//! Status command handler

use anyhow::Result;

use glossa_core::{Config, Glossary};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(glossary: &Glossary, config: &Config, output: &Output) -> Result<()> {
    let db_path = config.sqlite_path();
    let db_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    let entries = glossary.entry_count()?;
    let keywords = glossary.vocabulary().len();
    let counter = config.redis_url.as_deref().unwrap_or("in-process");
    let spam_check = if config.spam_check_url.is_empty() {
        "disabled"
    } else {
        config.spam_check_url.as_str()
    };

    match output.format {
        OutputFormat::Json => {
            output.json(&serde_json::json!({
                "base_url": config.base_url,
                "counter": counter,
                "spam_check": spam_check,
                "star_storage": config.star_storage.to_string(),
                "storage": {
                    "path": db_path,
                    "size": db_size
                },
                "counts": {
                    "entries": entries,
                    "keywords": keywords
                }
            }))?;
        }
        OutputFormat::Quiet => {
            println!("{}", entries);
        }
        OutputFormat::Human => {
            println!("Glossa Status");
            println!("=============");
            println!();
            println!("Site:");
            println!("  Base URL: {}", config.base_url);
            println!();
            println!("Services:");
            println!("  Counter:    {}", counter);
            println!("  Spam check: {}", spam_check);
            println!("  Stars:      {}", config.star_storage);
            println!();
            println!("Storage:");
            println!("  Location: {}", db_path.display());
            println!("  Size:     {}", human_size(db_size));
            println!();
            println!("Contents:");
            println!("  Entries:  {}", entries);
            println!("  Keywords: {}", keywords);
        }
    }

    Ok(())
}

/// Format a byte count for humans
fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
