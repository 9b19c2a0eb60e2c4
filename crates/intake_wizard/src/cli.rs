use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "intake-wizard", version, about = "Fill in and submit a service request from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Cmd>,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Run the interactive form (default)
    Run {
        /// Schema file to use instead of the built-in service request
        #[arg(long, value_name = "FILE")]
        schema: Option<PathBuf>,
        /// Dispatch endpoint receiving the submitted snapshot
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
    },
    /// Lint a schema and print its initially visible fields
    Check {
        #[arg(long, value_name = "FILE")]
        schema: Option<PathBuf>,
    },
}
