use clap::Parser;
use sandbox_client::Session;

use crate::{common::SandboxArgs, Error};

/// Stop a sandbox session
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Session id
    #[arg(long = "id")]
    pub id: String,

    /// Sandbox location
    #[command(flatten)]
    pub sandbox_args: SandboxArgs,
}

impl Cmd {
    /// Execute the stop command
    pub async fn run(&self) -> Result<(), Error> {
        Session::attach(&self.sandbox_args.url, &self.id)?.stop().await?;
        println!("stopped {}", self.id);
        Ok(())
    }
}
