//! Session lifecycle: probe or launch the sandbox, create a session and provision it.

use std::{path::Path, time::Duration};

use reqwest::{header::ACCEPT, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    is_connection_refused, is_loopback, loopback_host,
    process::{wait_until_ready, DetachedLauncher, Launch, SandboxProcess},
    rpc::SandboxRpc,
};
use crate::{
    compiler::CompilerOptions,
    config::{self, Config},
    Error, Result,
};

/// Default root URL of a locally running sandbox.
pub const DEFAULT_SANDBOX_URL: &str = "http://localhost:8554";

/// Settings for starting sessions.
#[derive(Debug, Clone)]
pub struct SandboxOptions {
    /// Used to compile `deploy` sources while parsing the configuration
    pub compiler: CompilerOptions,
    /// How long a launched sandbox may take to accept connections
    pub launch_timeout: Duration,
    /// Delay between readiness probes
    pub poll_interval: Duration,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            compiler: CompilerOptions::default(),
            launch_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// Builds `<root>/sandbox/` from a sandbox root URL.
pub fn sandbox_base_url(root: &str) -> Result<Url> {
    let invalid = |reason: String| Error::InvalidUrl { url: root.to_string(), reason };
    let mut root = Url::parse(root).map_err(|e| invalid(e.to_string()))?;
    if root.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    root.join("sandbox/").map_err(|e| invalid(e.to_string()))
}

fn session_url(base: &Url, id: &str) -> Result<Url> {
    base.join(id)
        .map_err(|e| Error::InvalidUrl { url: format!("{base}{id}"), reason: e.to_string() })
}

/// Client for a sandbox server. Creates [`Session`]s.
#[derive(Debug, Clone)]
pub struct Sandbox<L = DetachedLauncher> {
    base_url: Url,
    http: reqwest::Client,
    launcher: L,
    options: SandboxOptions,
}

impl Sandbox {
    /// Client for the sandbox rooted at `root_url`, launching `ethereum-sandbox` when needed.
    pub fn new(root_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: sandbox_base_url(root_url)?,
            http: reqwest::Client::new(),
            launcher: DetachedLauncher::default(),
            options: SandboxOptions::default(),
        })
    }
}

impl<L: Launch> Sandbox<L> {
    /// Replaces the launcher used when nothing is listening locally.
    pub fn with_launcher<M: Launch>(self, launcher: M) -> Sandbox<M> {
        Sandbox { base_url: self.base_url, http: self.http, launcher, options: self.options }
    }

    /// Replaces the session options.
    pub fn with_options(mut self, options: SandboxOptions) -> Self {
        self.options = options;
        self
    }

    /// `<root>/sandbox/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Session options.
    pub fn options(&self) -> &SandboxOptions {
        &self.options
    }

    /// Parses the configuration at `config_path`, then creates and provisions a session.
    ///
    /// The configuration is fully resolved before any network traffic.
    pub async fn start(&self, config_path: impl AsRef<Path>) -> Result<Session> {
        let config = config::parse(config_path, &self.options.compiler).await?;
        self.start_with_config(config).await
    }

    /// Creates and provisions a session from an already resolved configuration.
    pub async fn start_with_config(&self, config: Config) -> Result<Session> {
        let process = self.connect_or_run().await?;
        let mut session = self.create_session().await?;
        session.process = process;
        session.provision(config).await?;
        info!(id = %session.id, url = %session.url, "Sandbox session started");
        Ok(session)
    }

    /// Probes the sandbox root. Launches a local sandbox if the connection is refused.
    ///
    /// Returns the launched process, or `None` if a sandbox was already running.
    pub async fn connect_or_run(&self) -> Result<Option<SandboxProcess>> {
        debug!(url = %self.base_url, "Probing sandbox");
        let probe = self.http.get(self.base_url.clone()).header(ACCEPT, "application/json");
        let response = match probe.send().await {
            Ok(response) => response,
            Err(err) if is_connection_refused(&err) && is_loopback(&self.base_url) => {
                return self.run().await.map(Some);
            }
            Err(err) => return Err(err.into()),
        };

        let body = response.text().await?;
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(sessions)) => {
                debug!(sessions = sessions.len(), "Sandbox is running");
                Ok(None)
            }
            _ => {
                warn!(url = %self.base_url, "Probe did not answer with a session list");
                Err(Error::NotASandbox { url: self.base_url.to_string() })
            }
        }
    }

    async fn run(&self) -> Result<SandboxProcess> {
        let port = self.base_url.port_or_known_default().unwrap_or(80);
        info!(port, "Nothing is listening, launching a sandbox");
        let process = self.launcher.launch(port).await?;
        wait_until_ready(
            &loopback_host(&self.base_url),
            port,
            self.options.poll_interval,
            self.options.launch_timeout,
        )
        .await?;
        Ok(process)
    }

    async fn create_session(&self) -> Result<Session> {
        let created: Value = self
            .http
            .post(self.base_url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let id = match created.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(id @ Value::Number(_)) => id.to_string(),
            _ => {
                return Err(Error::NotASandbox { url: self.base_url.to_string() });
            }
        };
        debug!(%id, "Session created");
        Session::new(self.http.clone(), &self.base_url, id)
    }
}

/// A provisioned sandbox session.
#[derive(Debug)]
pub struct Session {
    id: String,
    url: Url,
    http: reqwest::Client,
    rpc: SandboxRpc,
    default_account: Option<String>,
    config: Option<Config>,
    process: Option<SandboxProcess>,
}

impl Session {
    fn new(http: reqwest::Client, base: &Url, id: String) -> Result<Self> {
        let url = session_url(base, &id)?;
        Ok(Self {
            rpc: SandboxRpc::new(http.clone(), url.clone()),
            id,
            url,
            http,
            default_account: None,
            config: None,
            process: None,
        })
    }

    /// Handle for an existing session, without probing or provisioning.
    pub fn attach(root_url: &str, id: &str) -> Result<Self> {
        Self::new(reqwest::Client::new(), &sandbox_base_url(root_url)?, id.to_string())
    }

    /// Session id assigned by the server.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `<root>/sandbox/<id>`, the session's JSON-RPC endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Sandbox JSON-RPC client for this session.
    pub fn rpc(&self) -> &SandboxRpc {
        &self.rpc
    }

    /// Default account reported by the sandbox after provisioning.
    pub fn default_account(&self) -> Option<&str> {
        self.default_account.as_deref()
    }

    /// Configuration the session was provisioned with.
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Sandbox process launched for this session, if any.
    pub fn process(&self) -> Option<&SandboxProcess> {
        self.process.as_ref()
    }

    /// Sends an arbitrary JSON-RPC request to the session endpoint.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        self.rpc.request(method, params).await
    }

    async fn provision(&mut self, config: Config) -> Result<()> {
        self.rpc.set_block(&config.env.block).await?;
        self.rpc.create_accounts(&config.env.accounts).await?;
        self.rpc.add_accounts(&config.signing_accounts()).await?;
        self.default_account = match self.rpc.default_account().await? {
            Value::String(address) => Some(address),
            _ => None,
        };
        debug!(id = %self.id, default_account = ?self.default_account, "Session provisioned");
        self.config = Some(config);
        Ok(())
    }

    /// Deletes the session on the server.
    pub async fn stop(&self) -> Result<()> {
        let response = self.http.delete(self.url.clone()).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!(id = %self.id, %status, "Sandbox refused to stop the session");
            return Err(Error::StopFailed { status: status.as_u16() });
        }
        info!(id = %self.id, "Sandbox session stopped");
        Ok(())
    }
}
