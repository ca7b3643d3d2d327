//! Star command handler

use anyhow::{Context, Result};

use glossa_core::{Glossary, StarStorage};

use crate::output::Output;

/// Star a keyword on behalf of `user`
pub fn add(
    glossary: &Glossary,
    star_storage: StarStorage,
    keyword: String,
    user: String,
    output: &Output,
) -> Result<()> {
    let star = glossary
        .star(&keyword, &user)
        .with_context(|| format!("Failed to star '{}'", keyword))?;
    output.print_star(&star)?;

    if let Some(warning) = storage_warning(star_storage) {
        output.warning(warning);
    }
    Ok(())
}

/// Stars kept in memory die with this process
fn storage_warning(star_storage: StarStorage) -> Option<&'static str> {
    match star_storage {
        StarStorage::Memory => Some(
            "stars are kept in memory and are lost when this command exits; \
             run `glossa config set star_storage store` to keep them",
        ),
        StarStorage::Store => None,
    }
}
