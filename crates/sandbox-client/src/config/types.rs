//! Resolved environment configuration, as handed to the sandbox.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compiler::CompiledContract;

/// Conventional name of the configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "ethereum.json";

/// Root of the configuration document.
///
/// Unknown fields are kept in `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Plugin name to plugin settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Map<String, Value>>,
    /// Initial chain environment
    pub env: Env,
    /// Source files to deploy after start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<Vec<String>>,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    /// Address of the account marked `default`, if any.
    pub fn default_account(&self) -> Option<&str> {
        self.env
            .accounts
            .iter()
            .find(|(_, account)| account.default == Some(true))
            .map(|(address, _)| address.as_str())
    }

    /// Accounts that carry a signing key, reduced to what `sandbox_addAccounts` expects.
    pub fn signing_accounts(&self) -> BTreeMap<String, SigningAccount> {
        self.env
            .accounts
            .iter()
            .filter_map(|(address, account)| {
                let pkey = account.pkey.clone()?;
                Some((address.clone(), SigningAccount { pkey, default: account.default }))
            })
            .collect()
    }
}

/// Initial chain environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Env {
    /// Block header overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
    /// Accounts keyed by lowercase `0x` address
    pub accounts: BTreeMap<String, Account>,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Block header overrides. Numeric fields are `0x` hex strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Beneficiary address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
    /// Block difficulty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    /// Block gas limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    /// Gas price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An account to create in the sandbox.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Human readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Balance in wei, `0x` hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    /// Nonce, `0x` hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Storage slots, both sides `0x` hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<BTreeMap<String, String>>,
    /// Private key, `0x` + 64 hex digits once resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkey: Option<String>,
    /// Marks the session's default signer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    /// Contract to deploy at this address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployDescriptor>,
    /// Compiled contract resolved from `deploy`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_code: Option<CompiledContract>,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where the code for an account comes from.
///
/// Either a bare source path (the file must define exactly one concrete contract) or an object
/// naming the source and, optionally, the contract to pick from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeployDescriptor {
    /// `"deploy": "path/to/File.sol"`
    Source(String),
    /// `"deploy": { "source": "path/to/File.sol", "contract": "Name" }`
    Contract {
        /// Solidity source file
        source: String,
        /// Contract to select; when absent the file must define exactly one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contract: Option<String>,
    },
}

impl DeployDescriptor {
    /// Solidity source file.
    pub fn source(&self) -> &str {
        match self {
            Self::Source(source) | Self::Contract { source, .. } => source,
        }
    }

    /// Requested contract name, if any.
    pub fn contract(&self) -> Option<&str> {
        match self {
            Self::Source(_) => None,
            Self::Contract { contract, .. } => contract.as_deref(),
        }
    }
}

/// Entry of the `sandbox_addAccounts` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningAccount {
    /// Resolved private key
    pub pkey: String,
    /// Whether this is the default signer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
}
