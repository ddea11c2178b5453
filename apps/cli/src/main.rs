// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ifc-takeoff` - IFC model summaries and beam/column takeoffs from the
//! command line.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::ExtractFormat;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// trace, debug, info, warn or error
    #[clap(short, long, global = true)]
    log_level: Option<String>,

    /// Directory for saved model summaries
    #[clap(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a model and save the summary as JSON
    Process { file: PathBuf },

    /// List `Pset.Property` names of a model, or of the newest saved summary
    Properties { file: Option<PathBuf> },

    /// Extract the beam and column takeoff
    Extract {
        file: PathBuf,
        #[clap(short, long, value_enum, default_value = "json")]
        format: ExtractFormat,
        /// Write to a file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Serve a directory over HTTP
    Serve {
        #[clap(short, long, default_value = "8000")]
        port: u16,
        #[clap(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

fn setup_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    match cli.command {
        Command::Process { file } => {
            let (summary, _) = commands::process_file(&file, &cli.data_dir)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Properties { file } => {
            let properties = commands::available_properties(file.as_deref(), &cli.data_dir);
            println!("{}", serde_json::to_string_pretty(&properties)?);
        }
        Command::Extract {
            file,
            format,
            output,
        } => commands::extract(&file, format, output.as_deref())?,
        Command::Serve { port, dir } => {
            tokio::runtime::Runtime::new()?.block_on(commands::serve(port, dir))?
        }
    }

    Ok(())
}
