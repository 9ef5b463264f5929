//! `tablekit` - schema tooling for JSON row descriptors.
//!
//! Prints the statements generated for a descriptor and applies them to a
//! SQLite database file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tablekit_logging::{init_logging, LogConfig};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "tablekit", about = "Schema tooling for tablekit row descriptors")]
struct Cli {
    /// Mirror log output to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a generated statement for a descriptor
    Sql {
        /// Row descriptor (JSON)
        #[arg(long)]
        schema: PathBuf,

        /// Which statement to print
        #[arg(value_enum, default_value_t = commands::StatementKind::Create)]
        statement: commands::StatementKind,
    },

    /// Create or recreate the descriptor's table in a database file
    Apply {
        #[arg(long)]
        schema: PathBuf,

        /// SQLite database file
        #[arg(long, env = "TABLEKIT_DB")]
        db: PathBuf,

        /// Schema version; a stored version that differs recreates the table
        #[arg(long = "version", default_value_t = 1)]
        schema_version: i64,
    },

    /// Print the table's rows as JSON lines
    Dump {
        #[arg(long)]
        schema: PathBuf,

        #[arg(long, env = "TABLEKIT_DB")]
        db: PathBuf,

        /// Maximum number of rows
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Delete every row and restart the auto-number sequence
    Empty {
        #[arg(long)]
        schema: PathBuf,

        #[arg(long, env = "TABLEKIT_DB")]
        db: PathBuf,
    },
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sql { schema, statement } => commands::print_sql(&schema, statement),
        Commands::Apply {
            schema,
            db,
            schema_version,
        } => commands::apply(&schema, &db, schema_version),
        Commands::Dump { schema, db, limit } => commands::dump(&schema, &db, limit),
        Commands::Empty { schema, db } => commands::empty(&schema, &db),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(LogConfig {
        app_name: "tablekit",
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: logging disabled: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::from(1)
        }
    }
}
