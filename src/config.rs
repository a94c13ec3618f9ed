//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::persistence::{DEFAULT_BOOKS_FILE, DEFAULT_STUDENTS_FILE, FileStore};

/// Log filter used when neither `--log-level` nor `RUST_LOG` is given
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Command-line arguments for the library desk
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// File holding the book catalogue
    #[arg(long, default_value = DEFAULT_BOOKS_FILE)]
    pub books_file: PathBuf,

    /// File holding the student registry
    #[arg(long, default_value = DEFAULT_STUDENTS_FILE)]
    pub students_file: PathBuf,

    /// Log filter, e.g. `info` or `library_lending=debug` (overrides RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,

    /// What to do; the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Things the binary can do
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the interactive admin menu
    Menu,
    /// Print the book listing and exit
    Books {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print students with the books they hold and exit
    Students {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Resolved runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Where records are kept
    pub store: FileStore,
    /// `tracing` filter directive
    pub log_filter: String,
    /// Selected command
    pub command: Command,
}

impl Settings {
    /// Resolve arguments, falling back to `env_filter` (normally `RUST_LOG`)
    /// and then to [`DEFAULT_LOG_FILTER`] for logging
    #[must_use]
    pub fn resolve(args: Args, env_filter: Option<String>) -> Self {
        Self {
            store: FileStore::new(args.books_file, args.students_file),
            log_filter: args
                .log_level
                .or(env_filter)
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            command: args.command.unwrap_or(Command::Menu),
        }
    }
}
