//! Shared helpers for the integration tests.
#![allow(dead_code, unreachable_pub)]

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use sandbox_client::{compiler::CompilerOptions, Sandbox, SandboxOptions};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

/// Compiled output of a file with an abstract and two concrete contracts.
pub const MULTI_OUTPUT: &str = include_str!("../fixtures/multi.sol.json");
/// Compiled output of a file with one concrete contract next to an interface and an abstract one.
pub const SINGLE_OUTPUT: &str = include_str!("../fixtures/single.sol.json");

pub const ALICE: &str = "0x1111111111111111111111111111111111111111";
pub const BOB: &str = "0x2222222222222222222222222222222222222222";

/// keccak256("cow")
pub const COW_KEY: &str = "0xc85ef7d79691fe79573b1a7064c19c1a9819ebdbd1faaab1a8ec92344438aaf4";

const FAKE_SOLC: &str = r#"#!/bin/sh
if [ "$2" != "--optimize" ] || [ "$3" != "--combined-json" ] || [ "$4" != "bin,abi,ast" ]; then
    echo "unexpected arguments: $*" >&2
    exit 2
fi
if [ ! -f "$1.json" ]; then
    echo "$1: No such file or directory" >&2
    exit 1
fi
cat "$1.json"
"#;

/// A stand-in for `solc` that prints `<source>.json` from its working directory.
///
/// Written once per test binary so no test forks while the script is still open for writing.
pub fn fake_solc() -> PathBuf {
    static SOLC: OnceLock<TempDir> = OnceLock::new();
    let dir = SOLC.get_or_init(|| {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("solc");
        std::fs::write(&script, FAKE_SOLC).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        dir
    });
    dir.path().join("solc")
}

/// A project directory holding `ethereum.json` and the compiler output for its sources.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new(config: &Value) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ethereum.json"), config.to_string()).unwrap();
        Self { dir }
    }

    /// Registers compiler output for `source`.
    pub fn with_output(self, source: &str, output: &str) -> Self {
        std::fs::write(self.dir.path().join(format!("{source}.json")), output).unwrap();
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("ethereum.json")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

pub fn compiler_options() -> CompilerOptions {
    CompilerOptions { solc: fake_solc(), working_dir: None }
}

pub fn sandbox(root: &str) -> Sandbox {
    Sandbox::new(root)
        .unwrap()
        .with_options(SandboxOptions { compiler: compiler_options(), ..Default::default() })
}

/// Answers JSON-RPC requests, echoing the request id.
///
/// Methods without a configured answer return `true`.
#[derive(Debug, Clone, Default)]
pub struct RpcResponder {
    results: HashMap<String, Value>,
    errors: HashMap<String, String>,
}

impl RpcResponder {
    pub fn with_result(mut self, method: &str, result: Value) -> Self {
        self.results.insert(method.to_string(), result);
        self
    }

    pub fn with_error(mut self, method: &str, message: &str) -> Self {
        self.errors.insert(method.to_string(), message.to_string());
        self
    }
}

impl Respond for RpcResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let method = body["method"].as_str().unwrap_or_default();
        let payload = match self.errors.get(method) {
            Some(message) => json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": { "code": -32000, "message": message },
            }),
            None => json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": self.results.get(method).cloned().unwrap_or(Value::Bool(true)),
            }),
        };
        ResponseTemplate::new(200).set_body_json(payload)
    }
}

/// Mounts the sandbox root (session list and session creation) on `server`.
pub async fn mount_sandbox(server: &MockServer, id: &str, responder: RpcResponder) {
    Mock::given(method("GET"))
        .and(path("/sandbox/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sandbox/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/sandbox/{id}")))
        .respond_with(responder)
        .mount(server)
        .await;
}

/// JSON-RPC `(method, params)` pairs received on the session endpoint, in order.
pub async fn rpc_calls(server: &MockServer, id: &str) -> Vec<(String, Value)> {
    let session_path = format!("/sandbox/{id}");
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.method.as_str() == "POST" && request.url.path() == session_path)
        .map(|request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            (body["method"].as_str().unwrap().to_string(), body["params"].clone())
        })
        .collect()
}
