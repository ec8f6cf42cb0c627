use clap::{Parser, Subcommand};

use crate::common::LogArgs;

mod call;
mod check;
mod start;
mod stop;

/// Command line control for a locally-run Ethereum sandbox
#[derive(Parser, Debug)]
#[command(infer_subcommands = true, version)]
pub struct MainCmd {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Logging configuration
    #[command(flatten)]
    pub log_args: LogArgs,
}

/// Subcommands of the sandbox CLI tool
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a configuration file and print the result
    Check(check::Cmd),
    /// Start and provision a sandbox session
    Start(start::Cmd),
    /// Stop a sandbox session
    Stop(stop::Cmd),
    /// Call a sandbox method on an existing session
    Call(call::Cmd),
}

/// Error types for the main command system
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Sandbox client error
    #[error("{0}")]
    Sandbox(#[from] sandbox_client::Error),
    /// Command line parameters that are not valid JSON-RPC params
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    /// Failed to render output as JSON
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
    /// Failed to open the log file
    #[error("Failed to create log file: {0}")]
    LogFile(#[from] std::io::Error),
}

impl MainCmd {
    /// Execute the main command
    pub async fn run(&self) -> Result<(), Error> {
        self.log_args.init()?;
        match &self.command {
            Command::Check(cmd) => cmd.run().await,
            Command::Start(cmd) => cmd.run().await,
            Command::Stop(cmd) => cmd.run().await,
            Command::Call(cmd) => cmd.run().await,
        }
    }
}
