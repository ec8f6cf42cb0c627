//! Invocation of the external Solidity compiler.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, trace};

use super::ast::{concrete_contracts, AstNode};
use crate::{Error, Result};

/// Compiler settings.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Compiler executable (name on `PATH` or explicit path)
    pub solc: PathBuf,
    /// Directory the compiler runs in. Relative source paths resolve against it.
    pub working_dir: Option<PathBuf>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self { solc: PathBuf::from("solc"), working_dir: None }
    }
}

/// A compiled, deployable contract: the `runCode` triple attached to accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledContract {
    /// Contract name
    pub name: String,
    /// Hex-encoded creation bytecode
    pub binary: String,
    /// Parsed ABI
    pub abi: Value,
}

/// Runs `solc --combined-json` and turns its output into [`CompiledContract`]s.
#[derive(Debug, Clone, Default)]
pub struct Solc {
    options: CompilerOptions,
}

impl Solc {
    /// Creates a compiler adapter with the given options.
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    /// Returns the compiler options.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compiles `source` and returns every concrete contract it defines.
    pub async fn compile(&self, source: &Path) -> Result<Vec<CompiledContract>> {
        let mut command = Command::new(&self.options.solc);
        command.arg(source).args(["--optimize", "--combined-json", "bin,abi,ast"]);
        if let Some(dir) = &self.options.working_dir {
            command.current_dir(dir);
        }
        debug!(solc = %self.options.solc.display(), source = %source.display(), "Running compiler");

        let output = command.output().await.map_err(|e| Error::Compile {
            source_path: source.to_path_buf(),
            message: format!("could not run {}: {e}", self.options.solc.display()),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() || !stderr.trim().is_empty() {
            let message =
                if stderr.trim().is_empty() { output.status.to_string() } else { stderr.into_owned() };
            return Err(Error::Compile { source_path: source.to_path_buf(), message });
        }

        parse_combined_json(source, &String::from_utf8_lossy(&output.stdout))
    }

    /// Single-contract mode: `source` must define exactly one concrete contract.
    pub async fn compile_single(&self, source: &Path) -> Result<CompiledContract> {
        select_single(source, self.compile(source).await?)
    }

    /// Multi-contract mode: picks `contract` out of the concrete contracts in `source`.
    pub async fn compile_named(&self, source: &Path, contract: &str) -> Result<CompiledContract> {
        select_named(source, self.compile(source).await?, contract)
    }
}

/// Parses `solc --combined-json bin,abi,ast` output, keeping only concrete contracts.
pub fn parse_combined_json(source: &Path, stdout: &str) -> Result<Vec<CompiledContract>> {
    let compile_error =
        |message: String| Error::Compile { source_path: source.to_path_buf(), message };

    let compiled: Value = serde_json::from_str(stdout)
        .map_err(|e| compile_error(format!("Could not parse solc output: {e}")))?;
    let empty = Map::new();
    let sources = compiled.get("sources").and_then(Value::as_object).unwrap_or(&empty);
    let contracts = compiled.get("contracts").and_then(Value::as_object).unwrap_or(&empty);

    let mut result = Vec::new();
    for (source_key, unit) in sources.iter().filter(|(key, _)| key.ends_with(".sol")) {
        let ast = AstNode::from_json(unit.get("AST").unwrap_or(&Value::Null));
        for name in concrete_contracts(&ast) {
            // Older releases key contracts by name, newer ones by `path:name`.
            let entry = contracts
                .get(&name)
                .or_else(|| contracts.get(&format!("{source_key}:{name}")))
                .ok_or_else(|| compile_error(format!("No compiled output for contract {name}")))?;
            trace!(contract = %name, source = %source_key, "Found concrete contract");
            let binary = entry
                .get("bin")
                .and_then(Value::as_str)
                .filter(|bin| !bin.is_empty())
                .ok_or_else(|| compile_error(format!("No bytecode for contract {name}")))?
                .to_string();
            result.push(CompiledContract {
                binary,
                abi: parse_abi(entry.get("abi"))
                    .map_err(|e| compile_error(format!("Could not parse contract abi: {e}")))?,
                name,
            });
        }
    }
    Ok(result)
}

/// ABIs come either as an embedded JSON string or, from newer compilers, inline.
fn parse_abi(abi: Option<&Value>) -> std::result::Result<Value, String> {
    match abi {
        Some(Value::String(s)) => serde_json::from_str(s).map_err(|e| e.to_string()),
        Some(value @ Value::Array(_)) => Ok(value.clone()),
        Some(other) => Err(format!("unexpected abi {other}")),
        None => Err("abi is missing".to_string()),
    }
}

/// Returns the only contract in `contracts`, or fails if there are zero or several.
pub fn select_single(source: &Path, contracts: Vec<CompiledContract>) -> Result<CompiledContract> {
    let found = contracts.len();
    let mut contracts = contracts.into_iter();
    match (contracts.next(), contracts.next()) {
        (Some(contract), None) => Ok(contract),
        _ => Err(Error::AmbiguousOrMissingContract { source_path: source.to_path_buf(), found }),
    }
}

/// Returns the contract called `name`, or [`Error::ContractNotFound`].
pub fn select_named(
    source: &Path,
    contracts: Vec<CompiledContract>,
    name: &str,
) -> Result<CompiledContract> {
    contracts.into_iter().find(|c| c.name == name).ok_or_else(|| Error::ContractNotFound {
        contract: name.to_string(),
        source_path: source.to_path_buf(),
    })
}
