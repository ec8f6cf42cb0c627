use std::path::PathBuf;

use clap::Parser;
use sandbox_client::config::{self, DEFAULT_CONFIG_FILE};
use tracing::info;

use crate::{common::CompilerArgs, Error};

/// Resolve a configuration file and print the result
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Environment configuration file
    #[arg(long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Compiler configuration
    #[command(flatten)]
    pub compiler_args: CompilerArgs,
}

impl Cmd {
    /// Execute the check command
    pub async fn run(&self) -> Result<(), Error> {
        let config = config::parse(&self.config, &self.compiler_args.options()).await?;
        info!(accounts = config.env.accounts.len(), "Configuration is valid");
        println!("{}", serde_json::to_string_pretty(&config)?);
        Ok(())
    }
}
