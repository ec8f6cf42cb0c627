//! Launching a local sandbox and waiting for it to come up.

use std::{
    future::Future,
    path::PathBuf,
    process::Stdio,
    time::{Duration, Instant},
};

use tokio::{net::TcpStream, process::Child, process::Command};
use tracing::{debug, info, trace};

use crate::{Error, Result};

/// Default sandbox executable.
pub const DEFAULT_SANDBOX_PROGRAM: &str = "ethereum-sandbox";

/// Starts a sandbox server listening on a port.
pub trait Launch: Send + Sync {
    /// Launches a sandbox on `port`. Returns once the process is spawned, not once it is ready.
    fn launch(&self, port: u16) -> impl Future<Output = Result<SandboxProcess>> + Send;
}

/// A sandbox started by this client.
///
/// Dropping it does not stop the server: the process is detached and outlives the client.
#[derive(Debug)]
pub struct SandboxProcess {
    port: u16,
    child: Option<Child>,
}

impl SandboxProcess {
    /// Wraps a spawned child process.
    pub fn spawned(port: u16, child: Child) -> Self {
        Self { port, child: Some(child) }
    }

    /// A sandbox started by some other means, for example an in-process server.
    pub fn external(port: u16) -> Self {
        Self { port, child: None }
    }

    /// Port the sandbox listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// OS process id, if this client spawned the process.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }
}

/// Spawns `<program> [args..] --port <port>` detached from the current process.
///
/// On unix the child gets its own process group so that terminal signals aimed at the client do
/// not reach it. All standard streams are closed.
#[derive(Debug, Clone)]
pub struct DetachedLauncher {
    /// Sandbox executable
    pub program: PathBuf,
    /// Extra arguments placed before `--port`
    pub args: Vec<String>,
}

impl Default for DetachedLauncher {
    fn default() -> Self {
        Self { program: PathBuf::from(DEFAULT_SANDBOX_PROGRAM), args: Vec::new() }
    }
}

impl DetachedLauncher {
    /// Launcher for the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }
}

impl Launch for DetachedLauncher {
    async fn launch(&self, port: u16) -> Result<SandboxProcess> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--port")
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| Error::Launch {
            program: self.program.display().to_string(),
            source,
        })?;
        info!(program = %self.program.display(), port, pid = ?child.id(), "Launched sandbox");
        Ok(SandboxProcess::spawned(port, child))
    }
}

/// Polls `host:port` until it accepts a TCP connection or `timeout` elapses.
pub async fn wait_until_ready(
    host: &str,
    port: u16,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let started = Instant::now();
    loop {
        match TcpStream::connect((host, port)).await {
            Ok(_) => {
                debug!(host, port, waited_ms = started.elapsed().as_millis(), "Sandbox is ready");
                return Ok(());
            }
            Err(err) => trace!(host, port, %err, "Sandbox not ready yet"),
        }
        if started.elapsed() >= timeout {
            return Err(Error::LaunchTimeout { port, waited_ms: started.elapsed().as_millis() });
        }
        tokio::time::sleep(poll_interval).await;
    }
}
