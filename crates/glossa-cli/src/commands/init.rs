//! Init command handler

use anyhow::{Context, Result};

use glossa_core::Glossary;

use crate::output::{Output, OutputFormat};

/// Reinitialize caches and the vocabulary from the store
pub fn run(glossary: &Glossary, output: &Output) -> Result<()> {
    let summary = glossary
        .initialize()
        .context("Failed to initialize glossary")?;

    match output.format {
        OutputFormat::Json => output.json(&summary)?,
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            output.success(&format!(
                "Initialized: {} entries, {} keywords",
                summary.entries, summary.keywords
            ));
        }
    }
    Ok(())
}
