use std::{path::PathBuf, time::Duration};

use clap::Args;
use sandbox_client::{
    compiler::CompilerOptions, DetachedLauncher, Sandbox, SandboxOptions, DEFAULT_SANDBOX_PROGRAM,
    DEFAULT_SANDBOX_URL,
};

/// Where the sandbox lives.
#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Sandbox Options")]
pub struct SandboxArgs {
    /// Sandbox root URL
    #[arg(long = "url", default_value = DEFAULT_SANDBOX_URL, env = "SANDBOX_URL")]
    pub url: String,
}

/// Solidity compiler selection.
#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Compiler Options")]
pub struct CompilerArgs {
    /// Solidity compiler executable
    #[arg(long = "solc", default_value = "solc", env = "SOLC")]
    pub solc: PathBuf,
}

impl CompilerArgs {
    /// Compiler options; sources resolve against the configuration file's directory.
    pub fn options(&self) -> CompilerOptions {
        CompilerOptions { solc: self.solc.clone(), working_dir: None }
    }
}

/// How to launch a sandbox when none is listening locally.
#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Launch Options")]
pub struct LaunchArgs {
    /// Sandbox executable, started with `--port <port>`
    #[arg(
        long = "sandbox.bin",
        visible_aliases = ["sandbox-bin"],
        default_value = DEFAULT_SANDBOX_PROGRAM,
        env = "SANDBOX_BIN"
    )]
    pub program: PathBuf,

    /// Seconds to wait for a launched sandbox to accept connections
    #[arg(
        long = "launch.timeout",
        visible_aliases = ["launch-timeout"],
        value_name = "SECS",
        default_value_t = 30
    )]
    pub timeout: u64,
}

impl LaunchArgs {
    /// Builds a sandbox client for `url` that launches with these settings.
    pub fn sandbox(
        &self,
        url: &str,
        compiler: &CompilerArgs,
    ) -> sandbox_client::Result<Sandbox<DetachedLauncher>> {
        let options = SandboxOptions {
            compiler: compiler.options(),
            launch_timeout: Duration::from_secs(self.timeout),
            ..Default::default()
        };
        Ok(Sandbox::new(url)?
            .with_launcher(DetachedLauncher::new(&self.program))
            .with_options(options))
    }
}
