//! Reads `ethereum.json` and turns it into a fully resolved [`Config`].
//!
//! Stages run in order and the first failure aborts the rest:
//! read, structural checks, block adjustment, per-account adjustment (including contract
//! compilation) and finally private key derivation.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use tokio::task::JoinSet;
use tracing::{debug, info, trace};

use super::{Account, Block, Config, DeployDescriptor, Env};
use crate::{
    address::{resolve_private_key, validate_address, validate_address_value},
    compiler::{CompilerOptions, Solc},
    value::{normalize, normalize_str},
    Error, Result,
};

/// Parses and resolves the configuration at `path`.
///
/// Unless `compiler.working_dir` is set, contract sources are resolved relative to the directory
/// containing the configuration file.
pub async fn parse(path: impl AsRef<Path>, compiler: &CompilerOptions) -> Result<Config> {
    let path = path.as_ref();
    info!(config = %path.display(), "Loading sandbox configuration");

    let raw = read(path).await?;
    let mut options = compiler.clone();
    if options.working_dir.is_none() {
        options.working_dir =
            path.parent().filter(|dir| !dir.as_os_str().is_empty()).map(Path::to_path_buf);
    }
    resolve(raw, &Solc::new(options)).await
}

/// Resolves an already-loaded configuration document.
pub async fn resolve(raw: Value, compiler: &Solc) -> Result<Config> {
    check_structure(&raw)?;
    let mut root = into_object(Some(raw));
    let mut env = into_object(root.remove("env"));

    let block = env.remove("block").map(|block| adjust_block(&block)).transpose()?;
    debug!(?block, "Block adjusted");

    let raw_accounts = into_object(env.remove("accounts"));
    let (mut accounts, raw_keys) = adjust_accounts(raw_accounts, compiler).await?;
    debug!(accounts = accounts.len(), "Accounts adjusted");

    derive_keys(&mut accounts, raw_keys)?;

    Ok(Config {
        plugins: root.remove("plugins").and_then(|plugins| plugins.as_object().cloned()),
        deploy: root.remove("deploy").map(|deploy| {
            deploy
                .as_array()
                .map(|paths| paths.iter().filter_map(Value::as_str).map(String::from).collect())
                .unwrap_or_default()
        }),
        env: Env { block, accounts, extra: env },
        extra: root,
    })
}

fn into_object(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(object)) => object,
        _ => Map::new(),
    }
}

/// Stage 1: load and parse the file.
pub async fn read(path: &Path) -> Result<Value> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|source| Error::ConfigRead { path: path.to_path_buf(), source })?;
    serde_json::from_slice(&content)
        .map_err(|source| Error::ConfigParse { path: path.to_path_buf(), source })
}

/// Stage 2: shape checks that do not depend on individual values.
pub fn check_structure(raw: &Value) -> Result<()> {
    let schema = |msg: &str| Err(Error::ConfigSchema(msg.to_string()));

    let Some(root) = raw.as_object() else {
        return schema("ethereum.json should contain a JSON object");
    };

    if root.get("plugins").is_some_and(|plugins| !plugins.is_object()) {
        return schema("Field plugins has to be a map in ethereum.json");
    }

    let accounts = root.get("env").and_then(Value::as_object).and_then(|env| env.get("accounts"));
    match accounts {
        Some(Value::Object(accounts)) if !accounts.is_empty() => {}
        Some(Value::Object(_)) | None => {
            return schema("Please, add initial account(s) to ethereum.json");
        }
        Some(_) => return schema("Field env.accounts has to be a map in ethereum.json"),
    }

    if let Some(deploy) = root.get("deploy") {
        let Some(paths) = deploy.as_array() else {
            return schema("Field deploy in ethereum.json should be an array");
        };
        if !paths.iter().all(Value::is_string) {
            return schema("Deploy array in ethereum.json should contain only strings");
        }
    }

    Ok(())
}

/// Stage 3: validate the coinbase and normalize numeric block fields.
pub fn adjust_block(raw: &Value) -> Result<Block> {
    let Some(fields) = raw.as_object() else {
        return Err(Error::ConfigSchema("Field env.block has to be a map in ethereum.json".into()));
    };
    let mut fields = fields.clone();

    let coinbase = fields
        .remove("coinbase")
        .map(|coinbase| validate_address_value(&coinbase))
        .transpose()
        .map_err(|e| with_context(e, "Could not parse block.coinbase"))?;

    let mut take_value = |field: &str| {
        fields
            .remove(field)
            .map(|value| normalize(&value))
            .transpose()
            .map_err(|e| with_context(e, &format!("Could not parse block.{field}")))
    };
    let difficulty = take_value("difficulty")?;
    let gas_limit = take_value("gasLimit")?;
    let gas_price = take_value("gasPrice")?;

    Ok(Block { coinbase, difficulty, gas_limit, gas_price, extra: fields })
}

/// Raw `pkey` values waiting for the key derivation stage, by address.
type RawKeys = BTreeMap<String, Value>;

/// Stage 4: adjust every account concurrently.
///
/// All outcomes are collected before deciding; if several accounts fail, the error of the
/// lexicographically smallest address is returned so the report does not depend on scheduling.
pub async fn adjust_accounts(
    raw_accounts: Map<String, Value>,
    compiler: &Solc,
) -> Result<(BTreeMap<String, Account>, RawKeys)> {
    let mut tasks = JoinSet::new();
    for (address, raw) in raw_accounts {
        let compiler = compiler.clone();
        tasks.spawn(async move {
            let outcome = adjust_account(&address, raw, &compiler).await;
            (address, outcome)
        });
    }

    let mut outcomes = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (address, outcome) =
            joined.unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()));
        outcomes.insert(address, outcome);
    }

    let mut accounts = BTreeMap::new();
    let mut raw_keys = RawKeys::new();
    for (address, outcome) in outcomes {
        let (account, pkey) = outcome?;
        if let Some(pkey) = pkey {
            raw_keys.insert(address.clone(), pkey);
        }
        accounts.insert(address, account);
    }
    Ok((accounts, raw_keys))
}

/// Validates and normalizes one account, compiling its contract if it declares one.
///
/// Returns the account together with its raw `pkey`, which is resolved in a later stage.
pub async fn adjust_account(
    address: &str,
    raw: Value,
    compiler: &Solc,
) -> Result<(Account, Option<Value>)> {
    validate_address(address)
        .map_err(|e| with_context(e, &format!("Could not parse address of account {address}")))?;

    let Value::Object(mut fields) = raw else {
        return Err(Error::ConfigSchema(format!("Account {address} has to be a map")));
    };

    let name = match fields.remove("name") {
        None => None,
        Some(Value::String(name)) => Some(name),
        Some(_) => return Err(Error::ConfigSchema("Account name must be a string".into())),
    };

    let default = match fields.remove("default") {
        None => None,
        Some(Value::Bool(default)) => Some(default),
        Some(_) => return Err(Error::ConfigSchema("Account default must be a boolean".into())),
    };

    let mut take_value = |field: &str| {
        fields
            .remove(field)
            .map(|value| normalize(&value))
            .transpose()
            .map_err(|e| with_context(e, &format!("Could not parse account.{field}")))
    };
    let balance = take_value("balance")?;
    let nonce = take_value("nonce")?;

    let storage = fields.remove("storage").map(|storage| adjust_storage(&storage)).transpose()?;
    let pkey = fields.remove("pkey");

    let deploy = fields.remove("deploy").map(parse_deploy).transpose()?;
    let run_code = match &deploy {
        Some(descriptor) => {
            let source = PathBuf::from(descriptor.source());
            debug!(
                %address,
                source = %source.display(),
                contract = ?descriptor.contract(),
                "Compiling account code"
            );
            Some(match descriptor.contract() {
                Some(contract) => compiler.compile_named(&source, contract).await?,
                None => compiler.compile_single(&source).await?,
            })
        }
        None => None,
    };

    trace!(%address, "Account adjusted");
    let account = Account {
        name,
        balance,
        nonce,
        storage,
        pkey: None,
        default,
        deploy,
        run_code,
        extra: fields,
    };
    Ok((account, pkey))
}

fn adjust_storage(raw: &Value) -> Result<BTreeMap<String, String>> {
    let Some(entries) = raw.as_object() else {
        return Err(Error::ConfigSchema("Field storage of an account has to be a map".into()));
    };
    let mut storage = BTreeMap::new();
    for (raw_key, value) in entries {
        let key = normalize_str(raw_key)
            .map_err(|e| with_context(e, "Could not parse key of storage entry"))?;
        let value = normalize(value)
            .map_err(|e| with_context(e, "Could not parse value of storage entry"))?;
        if storage.insert(key.clone(), value).is_some() {
            return Err(Error::InvalidValue(format!(
                "Storage key {raw_key} refers to slot {key} more than once"
            )));
        }
    }
    Ok(storage)
}

fn parse_deploy(raw: Value) -> Result<DeployDescriptor> {
    let invalid = || {
        Error::ConfigSchema(
            "deploy field of an account object should be a source path or an object with fields \
             source and contract"
                .into(),
        )
    };
    match &raw {
        Value::String(_) => {}
        Value::Object(fields) => {
            let source_ok = fields.get("source").is_some_and(Value::is_string);
            let contract_ok = fields.get("contract").is_none_or(Value::is_string);
            if !source_ok || !contract_ok {
                return Err(invalid());
            }
        }
        _ => return Err(invalid()),
    }
    serde_json::from_value(raw).map_err(|_| invalid())
}

/// Stage 5: resolve every declared `pkey` into a hex private key.
pub fn derive_keys(accounts: &mut BTreeMap<String, Account>, raw_keys: RawKeys) -> Result<()> {
    for (address, raw) in raw_keys {
        let key = resolve_private_key(&raw)?;
        if let Some(account) = accounts.get_mut(&address) {
            account.pkey = Some(key);
        }
    }
    Ok(())
}

/// Prefixes the message of a validation error, keeping its kind.
fn with_context(err: Error, context: &str) -> Error {
    match err {
        Error::InvalidAddress(msg) => Error::InvalidAddress(format!("{context}: {msg}")),
        Error::InvalidValue(msg) => Error::InvalidValue(format!("{context}: {msg}")),
        Error::InvalidKey(msg) => Error::InvalidKey(format!("{context}: {msg}")),
        other => other,
    }
}
