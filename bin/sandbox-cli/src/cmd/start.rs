use std::path::PathBuf;

use clap::Parser;
use sandbox_client::config::DEFAULT_CONFIG_FILE;
use tracing::info;

use crate::{
    common::{CompilerArgs, LaunchArgs, SandboxArgs},
    Error,
};

/// Start and provision a sandbox session
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Environment configuration file
    #[arg(long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    // Shared argument groups
    /// Sandbox location
    #[command(flatten)]
    pub sandbox_args: SandboxArgs,

    /// Compiler configuration
    #[command(flatten)]
    pub compiler_args: CompilerArgs,

    /// Launch configuration
    #[command(flatten)]
    pub launch_args: LaunchArgs,
}

impl Cmd {
    /// Execute the start command
    pub async fn run(&self) -> Result<(), Error> {
        let sandbox = self.launch_args.sandbox(&self.sandbox_args.url, &self.compiler_args)?;
        let session = sandbox.start(&self.config).await?;
        if let Some(process) = session.process() {
            info!(port = process.port(), pid = ?process.pid(), "Sandbox runs in the background");
        }

        println!("id: {}", session.id());
        println!("url: {}", session.url());
        if let Some(account) = session.default_account() {
            println!("default account: {account}");
        }
        Ok(())
    }
}
