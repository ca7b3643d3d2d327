//! Glossa CLI
//!
//! Command-line interface for Glossa - a collaborative keyword glossary.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use glossa_core::{Config, Glossary, GlossaryError};

mod commands;
mod output;

use output::{Output, OutputFormat};

/// Log filter used when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "glossa_core=warn,glossa_cli=warn";

/// Exit status when the glossary refused the request (spam, unknown keyword, ...)
const EXIT_REJECTED: u8 = 2;

#[derive(Parser)]
#[command(name = "glossa")]
#[command(about = "Glossa - collaborative glossary with automatic keyword links")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reinitialize the entry counter, stars and vocabulary from the store
    Init,
    /// Create or update an entry
    Add {
        /// Keyword for the entry
        keyword: String,
        /// Description (read from stdin if not provided)
        #[arg(short, long)]
        description: Option<String>,
        /// Author name
        #[arg(short, long)]
        author: String,
    },
    /// Show an entry with its description annotated
    Show {
        keyword: String,
    },
    /// List entries, most recently updated first
    #[command(alias = "ls")]
    List {
        /// Page number (starting at 1)
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Delete an entry
    #[command(alias = "rm")]
    Delete {
        keyword: String,
    },
    /// Star an entry
    Star {
        keyword: String,
        /// Name of the user giving the star
        #[arg(short, long)]
        user: String,
    },
    /// Annotate text against the current keywords
    Annotate {
        /// Text to annotate (read from stdin if not provided)
        text: Option<String>,
    },
    /// Show status (services, storage, counts)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, base_url, redis_url, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(hint) = recovery_hint(&err) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::from(exit_status(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work without opening the glossary
    let command = match cli.command {
        Commands::Config { command } => {
            return handle_config_command(command, config_path, &output);
        }
        command => command,
    };

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    debug!("Using data directory {:?}", config.data_dir);
    let glossary = Glossary::open(&config).context("Failed to open glossary")?;

    match command {
        Commands::Init => commands::init::run(&glossary, &output),
        Commands::Add {
            keyword,
            description,
            author,
        } => commands::entry::add(&glossary, keyword, description, author, &output),
        Commands::Show { keyword } => commands::entry::show(&glossary, keyword, &output),
        Commands::List { page } => commands::entry::list(&glossary, page, &output),
        Commands::Delete { keyword } => commands::entry::delete(&glossary, keyword, &output),
        Commands::Star { keyword, user } => {
            commands::star::add(&glossary, config.star_storage, keyword, user, &output)
        }
        Commands::Annotate { text } => commands::entry::annotate(&glossary, text, &output),
        Commands::Status => commands::status::show(&glossary, &config, &output),
        Commands::Config { .. } => Ok(()),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

fn glossary_error(err: &anyhow::Error) -> Option<&GlossaryError> {
    err.chain().find_map(|e| e.downcast_ref::<GlossaryError>())
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match glossary_error(err) {
        Some(e) if e.is_rejection() => EXIT_REJECTED,
        _ => 1,
    }
}

fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    match glossary_error(err) {
        Some(GlossaryError::Storage(e)) => e.recovery_suggestion(),
        _ => None,
    }
}

/// Initialize logging to stderr
///
/// RUST_LOG overrides the default filter.
fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "glossa", "--json", "add", "Rust", "-d", "A language", "-a", "alice",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Add {
                keyword,
                description,
                author,
            } => {
                assert_eq!(keyword, "Rust");
                assert_eq!(description.as_deref(), Some("A language"));
                assert_eq!(author, "alice");
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_parse_list_defaults_to_first_page() {
        let cli = Cli::try_parse_from(["glossa", "ls"]).unwrap();
        assert!(matches!(cli.command, Commands::List { page: 1 }));
    }

    #[test]
    fn test_parse_global_config_flag() {
        let cli =
            Cli::try_parse_from(["glossa", "status", "--config", "/tmp/glossa.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/glossa.toml")));
    }

    #[test]
    fn test_exit_status_separates_rejections() {
        let rejected = anyhow::Error::new(GlossaryError::NotFound("Rust".into()))
            .context("Failed to delete 'Rust'");
        assert_eq!(exit_status(&rejected), EXIT_REJECTED);

        let failed = anyhow::Error::new(GlossaryError::Cache(
            glossa_core::CacheError::Uninitialized,
        ));
        assert_eq!(exit_status(&failed), 1);
        assert_eq!(exit_status(&anyhow::anyhow!("no glossary")), 1);
    }

    #[test]
    fn test_recovery_hint_for_storage_errors() {
        let err = anyhow::Error::new(GlossaryError::Storage(
            glossa_core::StorageError::SchemaTooNew {
                found: 9,
                supported: 1,
            },
        ))
        .context("Failed to open glossary");
        assert!(recovery_hint(&err).unwrap().contains("data_dir"));

        let err = anyhow::Error::new(GlossaryError::Spam);
        assert!(recovery_hint(&err).is_none());
    }

    #[test]
    fn test_add_requires_author() {
        assert!(Cli::try_parse_from(["glossa", "add", "Rust"]).is_err());
    }
}
