//! Sandbox JSON-RPC extensions, declared as a capability table.
//!
//! Each entry maps a method name to its wire name, its parameter count and the optional
//! encoders applied to each positional parameter. [`SandboxRpc::call`] is the single dispatch
//! function for all of them.

use alloy_rpc_client::RpcClient;
use alloy_transport_http::Http;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::{value::normalize, Error, Result};

/// Encodes one positional parameter before it is sent.
pub type ParamFormatter = fn(Value) -> Result<Value>;

/// A sandbox JSON-RPC method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    /// Client-side name
    pub name: &'static str,
    /// JSON-RPC method name on the wire
    pub call: &'static str,
    /// Number of positional parameters
    pub params: usize,
    /// Per-parameter encoders; missing or `None` entries are sent as-is
    pub input_formatters: &'static [Option<ParamFormatter>],
}

/// A read-only sandbox property backed by a zero-argument call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    /// Client-side name
    pub name: &'static str,
    /// JSON-RPC method name on the wire
    pub getter: &'static str,
}

/// Hex-encodes numbers and decimal strings, passes `0x` strings through.
fn to_hex(value: Value) -> Result<Value> {
    normalize(&value).map(Value::String)
}

const fn method(name: &'static str, call: &'static str, params: usize) -> MethodSpec {
    MethodSpec { name, call, params, input_formatters: &[] }
}

/// Methods installed on every sandbox client.
pub const SANDBOX_METHODS: &[MethodSpec] = &[
    method("createAccounts", "sandbox_createAccounts", 1),
    method("addAccounts", "sandbox_addAccounts", 1),
    method("setBlock", "sandbox_setBlock", 1),
    method("defaultAccount", "sandbox_defaultAccount", 0),
    method("accounts", "sandbox_accounts", 1),
    method("runTx", "sandbox_runTx", 1),
    method("contracts", "sandbox_contracts", 0),
    method("transactions", "sandbox_transactions", 0),
    method("receipt", "sandbox_receipt", 1),
    method("stopMiner", "sandbox_stopMiner", 0),
    method("startMiner", "sandbox_startMiner", 0),
    MethodSpec {
        name: "mine",
        call: "sandbox_mine",
        params: 1,
        input_formatters: &[Some(to_hex as ParamFormatter)],
    },
    MethodSpec {
        name: "setTimestamp",
        call: "sandbox_setTimestamp",
        params: 2,
        input_formatters: &[Some(to_hex as ParamFormatter), None],
    },
];

/// Properties installed on every sandbox client.
pub const SANDBOX_PROPERTIES: &[PropertySpec] =
    &[PropertySpec { name: "id", getter: "sandbox_id" }];

/// Looks up a method by its client-side name.
pub fn method_spec(name: &str) -> Result<&'static MethodSpec> {
    SANDBOX_METHODS
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| Error::UnknownMethod(format!("Unknown sandbox method {name}")))
}

/// Looks up a property by its client-side name.
pub fn property_spec(name: &str) -> Result<&'static PropertySpec> {
    SANDBOX_PROPERTIES
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| Error::UnknownMethod(format!("Unknown sandbox property {name}")))
}

impl MethodSpec {
    /// Checks the parameter count and applies the input formatters.
    pub fn encode(&self, params: Vec<Value>) -> Result<Vec<Value>> {
        if params.len() != self.params {
            return Err(Error::UnknownMethod(format!(
                "{} expects {} parameter(s), got {}",
                self.name,
                self.params,
                params.len()
            )));
        }
        params
            .into_iter()
            .enumerate()
            .map(|(i, param)| match self.input_formatters.get(i).copied().flatten() {
                Some(format) => format(param),
                None => Ok(param),
            })
            .collect()
    }
}

/// JSON-RPC client bound to one sandbox session URL.
#[derive(Debug, Clone)]
pub struct SandboxRpc {
    client: RpcClient,
    url: Url,
}

impl SandboxRpc {
    /// Creates a client that sends requests to `url` over `http`.
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        let is_local = super::is_loopback(&url);
        let transport = Http::with_client(http, url.clone());
        Self { client: RpcClient::new(transport, is_local), url }
    }

    /// The underlying RPC client, for calls outside the sandbox namespace.
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Endpoint this client talks to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Invokes a capability-table method by its client-side name.
    pub async fn call(&self, name: &str, params: Vec<Value>) -> Result<Value> {
        let spec = method_spec(name)?;
        let params = spec.encode(params)?;
        self.request(spec.call, params).await
    }

    /// Reads a capability-table property.
    pub async fn get(&self, name: &str) -> Result<Value> {
        let spec = property_spec(name)?;
        self.request(spec.getter, Vec::new()).await
    }

    /// Sends a raw JSON-RPC request.
    pub async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        debug!(%method, url = %self.url, "Sandbox RPC call");
        trace!(?params, "Sandbox RPC params");
        let result: Value = self
            .client
            .request(method.to_string(), params)
            .await
            .map_err(|source| Error::Provisioning { method: method.to_string(), source })?;
        trace!(%method, ?result, "Sandbox RPC result");
        Ok(result)
    }

    /// `sandbox_createAccounts`
    pub async fn create_accounts(&self, accounts: &impl Serialize) -> Result<Value> {
        self.call("createAccounts", vec![serde_json::to_value(accounts)?]).await
    }

    /// `sandbox_addAccounts`
    pub async fn add_accounts(&self, accounts: &impl Serialize) -> Result<Value> {
        self.call("addAccounts", vec![serde_json::to_value(accounts)?]).await
    }

    /// `sandbox_setBlock`
    pub async fn set_block(&self, block: &impl Serialize) -> Result<Value> {
        self.call("setBlock", vec![serde_json::to_value(block)?]).await
    }

    /// `sandbox_defaultAccount`
    pub async fn default_account(&self) -> Result<Value> {
        self.call("defaultAccount", Vec::new()).await
    }

    /// `sandbox_accounts`
    pub async fn accounts(&self, details: bool) -> Result<Value> {
        self.call("accounts", vec![Value::Bool(details)]).await
    }

    /// `sandbox_runTx`
    pub async fn run_tx(&self, tx: &impl Serialize) -> Result<Value> {
        self.call("runTx", vec![serde_json::to_value(tx)?]).await
    }

    /// `sandbox_contracts`
    pub async fn contracts(&self) -> Result<Value> {
        self.call("contracts", Vec::new()).await
    }

    /// `sandbox_transactions`
    pub async fn transactions(&self) -> Result<Value> {
        self.call("transactions", Vec::new()).await
    }

    /// `sandbox_receipt`
    pub async fn receipt(&self, tx_hash: &str) -> Result<Value> {
        self.call("receipt", vec![Value::String(tx_hash.to_string())]).await
    }

    /// `sandbox_stopMiner`
    pub async fn stop_miner(&self) -> Result<Value> {
        self.call("stopMiner", Vec::new()).await
    }

    /// `sandbox_startMiner`
    pub async fn start_miner(&self) -> Result<Value> {
        self.call("startMiner", Vec::new()).await
    }

    /// `sandbox_mine`
    pub async fn mine(&self, blocks: u64) -> Result<Value> {
        self.call("mine", vec![blocks.into()]).await
    }

    /// `sandbox_setTimestamp`
    pub async fn set_timestamp(&self, timestamp: u64, increment: Value) -> Result<Value> {
        self.call("setTimestamp", vec![timestamp.into(), increment]).await
    }

    /// `sandbox_id`
    pub async fn id(&self) -> Result<Value> {
        self.get("id").await
    }
}
