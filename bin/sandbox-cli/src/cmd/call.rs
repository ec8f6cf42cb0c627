use clap::Parser;
use sandbox_client::Session;
use serde_json::Value;
use tracing::debug;

use crate::{common::SandboxArgs, Error};

/// Call a sandbox method on an existing session
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Session id
    #[arg(long = "id")]
    pub id: String,

    /// Method name, e.g. `mine` or `accounts`
    #[arg(value_name = "METHOD")]
    pub method: String,

    /// Positional parameters as a JSON array
    #[arg(value_name = "PARAMS_JSON")]
    pub params: Option<String>,

    /// Sandbox location
    #[command(flatten)]
    pub sandbox_args: SandboxArgs,
}

impl Cmd {
    /// Parses the positional parameters. No parameters means an empty list.
    pub fn params(&self) -> Result<Vec<Value>, Error> {
        let Some(raw) = &self.params else { return Ok(Vec::new()) };
        match serde_json::from_str(raw) {
            Ok(Value::Array(params)) => Ok(params),
            Ok(other) => Err(Error::InvalidParams(format!("expected a JSON array, got {other}"))),
            Err(err) => Err(Error::InvalidParams(err.to_string())),
        }
    }

    /// Execute the call command
    pub async fn run(&self) -> Result<(), Error> {
        let params = self.params()?;
        let session = Session::attach(&self.sandbox_args.url, &self.id)?;
        debug!(method = %self.method, ?params, "Calling sandbox");
        let result = session.rpc().call(&self.method, params).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }
}
