//! sheetgrade CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "sheetgrade", version, about = "Exam answer sheet grading toolkit")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a submission against an answer key
    #[command(group(clap::ArgGroup::new("input").required(true)))]
    Grade {
        /// Stored answer key id, or path to a key TOML file
        #[arg(long)]
        key: String,

        /// OCR text dump to extract answers from
        #[arg(long, group = "input")]
        text: Option<PathBuf>,

        /// Manually entered answers, e.g. "A,B,,D" or "AB-D"
        #[arg(long, group = "input")]
        answers: Option<String>,

        /// Sheet photo to read through a service backend
        #[arg(long, group = "input")]
        image: Option<PathBuf>,

        /// Backend that reads --image
        #[arg(long, value_enum, default_value_t = ReadVia::Omr)]
        via: ReadVia,

        /// Override the choice letters, e.g. "ABCD"
        #[arg(long)]
        choices: Option<String>,

        /// Store the graded result
        #[arg(long)]
        save: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Stream extraction decisions to stderr
        #[arg(long)]
        trace: bool,
    },

    /// Extract answers from OCR text without grading
    Extract {
        /// OCR text dump
        #[arg(long)]
        text: PathBuf,

        /// Number of questions on the sheet
        #[arg(long)]
        questions: usize,

        /// Override the choice letters, e.g. "ABCD"
        #[arg(long)]
        choices: Option<String>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Stream extraction decisions to stderr
        #[arg(long)]
        trace: bool,
    },

    /// Manage stored answer keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Manage stored exam results
    Results {
        #[command(subcommand)]
        action: ResultsAction,
    },

    /// Validate answer-key TOML files
    Validate {
        /// Key file or directory
        path: PathBuf,
    },

    /// Check configuration and service health
    Check,

    /// Create a starter config and example answer key
    Init,
}

#[derive(Subcommand)]
enum KeysAction {
    /// List stored answer keys
    List,
    /// Validate a key file and store it
    Add {
        /// Answer-key TOML file
        #[arg(long)]
        file: PathBuf,
    },
    /// Show one stored key in full
    Show { id: String },
    /// Delete a stored key
    Delete { id: String },
}

#[derive(Subcommand)]
enum ResultsAction {
    /// List stored results, newest first
    List,
    /// Show one stored result in full (id prefixes accepted)
    Show { id: String },
    /// Delete all stored results
    Clear,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReadVia {
    Omr,
    Vision,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Grade {
            key,
            text,
            answers,
            image,
            via,
            choices,
            save,
            format,
            trace,
        } => {
            commands::grade::execute(
                config, &key, text, answers, image, via, choices, save, &format, trace,
            )
            .await
        }
        Commands::Extract {
            text,
            questions,
            choices,
            format,
            trace,
        } => commands::extract::execute(config, text, questions, choices, &format, trace),
        Commands::Keys { action } => commands::keys::execute(config, action),
        Commands::Results { action } => commands::results::execute(config, action),
        Commands::Validate { path } => commands::validate::execute(path),
        Commands::Check => commands::check::execute(config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
