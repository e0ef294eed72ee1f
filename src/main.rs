use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use omi::applets;
use omi::formats::table::TableFormat;
use omi::serial::DEFAULT_PORT;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "omi", version, about = "Programmer for CRT Micron / AT-778 family transceivers")]
struct Cli {
    /// More verbose output (debug level)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with_all = ["verbose", "debug"])]
    quiet: bool,

    /// Full protocol trace
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the radio memory into an .omi file
    Read {
        /// Output .omi file
        #[arg(short, long)]
        output: PathBuf,

        /// Serial port device
        #[arg(short, long, default_value = DEFAULT_PORT)]
        port: String,
    },

    /// Program an .omi file into the radio
    Write {
        /// Input .omi file
        #[arg(short, long)]
        input: PathBuf,

        /// Reference .omi file; unchanged blocks are skipped
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Serial port device
        #[arg(short, long, default_value = DEFAULT_PORT)]
        port: String,
    },

    /// Export an .omi file as an editable table
    Export {
        /// Input .omi file
        #[arg(short, long)]
        input: PathBuf,

        /// Tab-separated output file
        #[arg(short, long)]
        text: Option<PathBuf>,

        /// CSV output file
        #[arg(short, long, conflicts_with = "text")]
        csv: Option<PathBuf>,
    },

    /// Apply an edited table onto an .omi file
    Import {
        /// Input .omi file
        #[arg(short, long)]
        input: PathBuf,

        /// Tab-separated table to apply
        #[arg(short, long)]
        text: Option<PathBuf>,

        /// CSV table to apply
        #[arg(short, long, conflicts_with = "text")]
        csv: Option<PathBuf>,

        /// Output .omi file (may equal the input)
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.debug {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn table_arg(text: Option<PathBuf>, csv: Option<PathBuf>) -> Result<(PathBuf, TableFormat)> {
    match (text, csv) {
        (Some(path), None) => Ok((path, TableFormat::Text)),
        (None, Some(path)) => Ok((path, TableFormat::Csv)),
        _ => bail!("exactly one of --text and --csv is required"),
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Read { output, port } => applets::read::run(&port, &output),
        Command::Write {
            input,
            reference,
            port,
        } => applets::write::run(&input, reference.as_deref(), &port),
        Command::Export { input, text, csv } => {
            let (table, format) = table_arg(text, csv)?;
            applets::export::run(&input, &table, format)
        }
        Command::Import {
            input,
            text,
            csv,
            output,
        } => {
            let (table, format) = table_arg(text, csv)?;
            applets::import::run(&input, &table, format, &output)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli.command) {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
