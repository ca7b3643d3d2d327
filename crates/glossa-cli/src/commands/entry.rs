//! Entry command handlers

use std::io::{self, Read};

use anyhow::{bail, Context, Result};

use glossa_core::Glossary;

use crate::output::Output;

/// Create or update an entry
pub fn add(
    glossary: &Glossary,
    keyword: String,
    description: Option<String>,
    author: String,
    output: &Output,
) -> Result<()> {
    let description = text_or_read(description, io::stdin())?;

    let upserted = glossary
        .submit(&keyword, &description, &author)
        .with_context(|| format!("Failed to save entry '{}'", keyword))?;

    if output.is_json() {
        output.json(&serde_json::json!({
            "keyword": upserted.entry.keyword,
            "id": upserted.entry.id,
            "created": upserted.created,
        }))?;
    } else {
        let verb = if upserted.created { "Created" } else { "Updated" };
        output.success(&format!("{} entry: {}", verb, upserted.entry.keyword));
    }
    Ok(())
}

/// Show a single entry, annotated
pub fn show(glossary: &Glossary, keyword: String, output: &Output) -> Result<()> {
    let rendered = glossary
        .entry(&keyword)
        .with_context(|| format!("Failed to show entry '{}'", keyword))?;
    output.print_entry(&rendered)
}

/// List one page of entries, most recently updated first
pub fn list(glossary: &Glossary, page: usize, output: &Output) -> Result<()> {
    let page = glossary.page(page).context("Failed to list entries")?;
    output.print_page(&page)
}

/// Delete an entry
pub fn delete(glossary: &Glossary, keyword: String, output: &Output) -> Result<()> {
    glossary
        .delete(&keyword)
        .with_context(|| format!("Failed to delete entry '{}'", keyword))?;
    output.success(&format!("Deleted entry: {}", keyword));
    Ok(())
}

/// Annotate text from the argument or stdin
pub fn annotate(glossary: &Glossary, text: Option<String>, output: &Output) -> Result<()> {
    let text = text_or_read(text, io::stdin())?;
    let html = glossary.annotate(&text).context("Failed to annotate text")?;
    output.print_html(&html)
}

/// Use `text` if given, otherwise read all of `reader`
///
/// One trailing newline from piped input is dropped.
fn text_or_read(text: Option<String>, mut reader: impl Read) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }

    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .context("Failed to read from stdin")?;
    if buf.ends_with('\n') {
        buf.pop();
        if buf.ends_with('\r') {
            buf.pop();
        }
    }
    if buf.is_empty() {
        bail!("Nothing to read: pass the text as an argument or pipe it in");
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use glossa_core::SqliteStore;
    use std::io::Cursor;
    use std::sync::Arc;

    fn glossary() -> Glossary {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        Glossary::builder(store).build().unwrap()
    }

    #[test]
    fn test_text_or_read_prefers_argument() {
        let text = text_or_read(Some("given".into()), Cursor::new("piped")).unwrap();
        assert_eq!(text, "given");
    }

    #[test]
    fn test_text_or_read_strips_one_newline() {
        let text = text_or_read(None, Cursor::new("line one\nline two\n\n")).unwrap();
        assert_eq!(text, "line one\nline two\n");

        let text = text_or_read(None, Cursor::new("windows\r\n")).unwrap();
        assert_eq!(text, "windows");
    }

    #[test]
    fn test_text_or_read_rejects_empty_input() {
        assert!(text_or_read(None, Cursor::new("")).is_err());
    }

    #[test]
    fn test_add_show_delete() {
        let glossary = glossary();
        let output = Output::new(OutputFormat::Quiet);

        add(
            &glossary,
            "Rust".into(),
            Some("A language".into()),
            "alice".into(),
            &output,
        )
        .unwrap();
        show(&glossary, "Rust".into(), &output).unwrap();
        list(&glossary, 1, &output).unwrap();
        delete(&glossary, "Rust".into(), &output).unwrap();

        let err = show(&glossary, "Rust".into(), &output).unwrap_err();
        assert!(err.to_string().contains("Rust"));
    }

    #[test]
    fn test_add_rejects_empty_keyword() {
        let glossary = glossary();
        let output = Output::new(OutputFormat::Quiet);

        let result = add(
            &glossary,
            String::new(),
            Some("text".into()),
            "alice".into(),
            &output,
        );
        assert!(result.is_err());
    }
}
