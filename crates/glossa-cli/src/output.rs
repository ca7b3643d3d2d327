//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use serde::Serialize;

use glossa_core::{Page, RenderedEntry, Star};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a single entry with its annotated description
    pub fn print_entry(&self, rendered: &RenderedEntry) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                let entry = &rendered.entry;
                println!("Keyword:  {}", entry.keyword);
                println!("Author:   {}", entry.author);
                println!("Created:  {}", entry.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:  {}", entry.updated_at.format("%Y-%m-%d %H:%M"));
                println!("Stars:    {}", star_summary(&rendered.stars));
                println!();
                println!("{}", rendered.html);
            }
            OutputFormat::Json => self.json(rendered)?,
            OutputFormat::Quiet => println!("{}", rendered.html),
        }
        Ok(())
    }

    /// Print one page of the front listing
    pub fn print_page(&self, page: &Page) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if page.entries.is_empty() {
                    println!("No entries found.");
                } else {
                    for rendered in &page.entries {
                        let entry = &rendered.entry;
                        println!(
                            "{} | {} | {} | {}",
                            entry.updated_at.format("%Y-%m-%d %H:%M"),
                            truncate(&entry.keyword, 30),
                            truncate(&entry.author, 15),
                            truncate_line(&entry.description, 40)
                        );
                    }
                }
                if page.last_page > 0 {
                    let pages: Vec<String> = page
                        .pages
                        .iter()
                        .map(|p| {
                            if *p == page.page {
                                format!("[{}]", p)
                            } else {
                                p.to_string()
                            }
                        })
                        .collect();
                    println!();
                    println!("Page {} of {}: {}", page.page, page.last_page, pages.join(" "));
                }
            }
            OutputFormat::Json => self.json(page)?,
            OutputFormat::Quiet => {
                for rendered in &page.entries {
                    println!("{}", rendered.entry.keyword);
                }
            }
        }
        Ok(())
    }

    /// Print a freshly recorded star
    pub fn print_star(&self, star: &Star) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("✓ {} starred {}", star.user_name, star.keyword)
            }
            OutputFormat::Json => self.json(star)?,
            OutputFormat::Quiet => {}
        }
        Ok(())
    }

    /// Print annotated HTML
    pub fn print_html(&self, html: &str) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::json!({ "html": html })),
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", html),
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    /// Print a warning to stderr, keeping stdout clean for JSON
    pub fn warning(&self, msg: &str) {
        if !self.is_quiet() {
            eprintln!("Warning: {}", msg);
        }
    }

    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// "alice, bob (2)" style summary, repeats kept
fn star_summary(stars: &[Star]) -> String {
    if stars.is_empty() {
        return "none".to_string();
    }
    let users: Vec<&str> = stars.iter().map(|s| s.user_name.as_str()).collect();
    format!("{} ({})", users.join(", "), stars.len())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Counts characters, never splits one
        assert_eq!(truncate("日本語のキーワード", 5), "日本...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
        assert_eq!(truncate_line("", 20), "");
    }

    #[test]
    fn test_star_summary() {
        assert_eq!(star_summary(&[]), "none");
        let stars = vec![
            Star::new("Rust", "alice"),
            Star::new("Rust", "alice"),
            Star::new("Rust", "bob"),
        ];
        assert_eq!(star_summary(&stars), "alice, alice, bob (3)");
    }
}
