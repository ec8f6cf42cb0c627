//! Tests for session discovery, launch, provisioning and teardown against a mock sandbox.
#![cfg(unix)]

mod common;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use common::{mount_sandbox, rpc_calls, sandbox, Project, RpcResponder, ALICE, BOB, COW_KEY};
use sandbox_client::{
    compiler::Solc, config, Error, Launch, Result, Sandbox, SandboxOptions, SandboxProcess, Session,
};
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn project() -> Project {
    Project::new(&json!({
        "env": {
            "block": { "gasLimit": 3141592 },
            "accounts": {
                ALICE: { "balance": 100, "pkey": "cow", "default": true },
                BOB: { "balance": "0x10" }
            }
        }
    }))
}

#[tokio::test]
async fn test_start_provisions_session() {
    let server = MockServer::start().await;
    mount_sandbox(&server, "s1", RpcResponder::default().with_result("sandbox_defaultAccount", json!(ALICE)))
        .await;

    let project = project();
    let session = sandbox(&server.uri()).start(project.config_path()).await.unwrap();

    assert_eq!(session.id(), "s1");
    assert_eq!(session.url().as_str(), format!("{}/sandbox/s1", server.uri()));
    assert_eq!(session.default_account(), Some(ALICE));
    assert!(session.process().is_none());
    assert_eq!(session.config().unwrap().env.accounts.len(), 2);

    let calls = rpc_calls(&server, "s1").await;
    let methods: Vec<_> = calls.iter().map(|(method, _)| method.as_str()).collect();
    assert_eq!(
        methods,
        ["sandbox_setBlock", "sandbox_createAccounts", "sandbox_addAccounts", "sandbox_defaultAccount"]
    );

    assert_eq!(calls[0].1, json!([{ "gasLimit": "0x2fefd8" }]));
    assert_eq!(calls[1].1[0][ALICE]["balance"], "0x64");
    assert_eq!(calls[1].1[0][BOB]["balance"], "0x10");
    assert_eq!(calls[2].1, json!([{ ALICE: { "pkey": COW_KEY, "default": true } }]));
    assert_eq!(calls[3].1, json!([]));
}

#[tokio::test]
async fn test_config_errors_precede_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let project = Project::new(&json!({ "env": { "accounts": {} } }));
    let err = sandbox(&server.uri()).start(project.config_path()).await.unwrap_err();
    assert!(matches!(err, Error::ConfigSchema(_)), "{err}");
}

#[tokio::test]
async fn test_not_a_sandbox() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sandbox/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let project = project();
    let err = sandbox(&server.uri()).start(project.config_path()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("There is a service running on {}/sandbox/ which is not Sandbox.", server.uri())
    );
}

#[tokio::test]
async fn test_json_object_is_not_a_sandbox() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sessions": [] })))
        .mount(&server)
        .await;

    let err = sandbox(&server.uri()).connect_or_run().await.unwrap_err();
    assert!(matches!(err, Error::NotASandbox { .. }), "{err}");
}

#[tokio::test]
async fn test_provisioning_failure() {
    let server = MockServer::start().await;
    mount_sandbox(
        &server,
        "s1",
        RpcResponder::default().with_error("sandbox_createAccounts", "Invalid account data"),
    )
    .await;

    let project = project();
    let err = sandbox(&server.uri()).start(project.config_path()).await.unwrap_err();
    match &err {
        Error::Provisioning { method, .. } => assert_eq!(method, "sandbox_createAccounts"),
        other => panic!("expected a provisioning error, got {other}"),
    }
    assert!(err.to_string().contains("Invalid account data"), "{err}");

    // Nothing after the failed call is sent
    let methods: Vec<_> = rpc_calls(&server, "s1").await.into_iter().map(|(method, _)| method).collect();
    assert_eq!(methods, ["sandbox_setBlock", "sandbox_createAccounts"]);
}

/// Starts a mock sandbox in-process instead of spawning one.
#[derive(Debug, Clone, Default)]
struct MockLauncher {
    server: Arc<Mutex<Option<MockServer>>>,
}

impl Launch for MockLauncher {
    async fn launch(&self, port: u16) -> Result<SandboxProcess> {
        let listener = std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
        let server = MockServer::builder().listener(listener).start().await;
        mount_sandbox(&server, "launched", RpcResponder::default()).await;
        *self.server.lock().unwrap() = Some(server);
        Ok(SandboxProcess::external(port))
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

#[tokio::test]
async fn test_launch_on_refused_connection() {
    let port = free_port();
    let launcher = MockLauncher::default();
    let sandbox = sandbox(&format!("http://127.0.0.1:{port}")).with_launcher(launcher.clone());

    let project = project();
    let session = sandbox.start(project.config_path()).await.unwrap();

    assert_eq!(session.id(), "launched");
    assert_eq!(session.process().map(SandboxProcess::port), Some(port));

    let server = launcher.server.lock().unwrap().take().unwrap();
    assert_eq!(rpc_calls(&server, "launched").await.len(), 4);
}

/// A launcher whose sandbox never comes up.
#[derive(Debug)]
struct SilentLauncher;

impl Launch for SilentLauncher {
    async fn launch(&self, port: u16) -> Result<SandboxProcess> {
        Ok(SandboxProcess::external(port))
    }
}

#[tokio::test]
async fn test_launch_timeout() {
    let port = free_port();
    let sandbox = Sandbox::new(&format!("http://127.0.0.1:{port}"))
        .unwrap()
        .with_launcher(SilentLauncher)
        .with_options(SandboxOptions {
            launch_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
            ..Default::default()
        });

    let err = sandbox.connect_or_run().await.unwrap_err();
    assert!(matches!(err, Error::LaunchTimeout { port: p, .. } if p == port), "{err}");
}

#[tokio::test]
async fn test_start_with_resolved_config() {
    let server = MockServer::start().await;
    mount_sandbox(&server, "s7", RpcResponder::default().with_result("sandbox_defaultAccount", Value::Null))
        .await;

    let config = config::resolve(json!({ "env": { "accounts": { BOB: { "balance": 1 } } } }), &Solc::default())
        .await
        .unwrap();
    let session = sandbox(&server.uri()).start_with_config(config).await.unwrap();

    assert_eq!(session.default_account(), None);
    let calls = rpc_calls(&server, "s7").await;
    assert_eq!(calls[0].1, json!([null]));
    assert_eq!(calls[2].1, json!([{}]));
}

#[tokio::test]
async fn test_stop() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/sandbox/s1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/sandbox/s2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Session::attach(&server.uri(), "s1").unwrap().stop().await.unwrap();

    let err = Session::attach(&server.uri(), "s2").unwrap().stop().await.unwrap_err();
    assert!(matches!(err, Error::StopFailed { status: 404 }), "{err}");
    assert_eq!(err.to_string(), "Could not stop the sandbox: 404");
}

#[tokio::test]
async fn test_rpc_formatters_and_passthrough() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sandbox/s1"))
        .respond_with(RpcResponder::default().with_result("eth_blockNumber", json!("0x5")))
        .mount(&server)
        .await;

    let session = Session::attach(&server.uri(), "s1").unwrap();
    session.rpc().mine(16).await.unwrap();
    session.rpc().call("setTimestamp", vec![json!("1000"), json!(1000)]).await.unwrap();
    session.rpc().id().await.unwrap();
    assert_eq!(session.call("eth_blockNumber", Vec::new()).await.unwrap(), json!("0x5"));

    let calls = rpc_calls(&server, "s1").await;
    assert_eq!(
        calls,
        [
            ("sandbox_mine".to_string(), json!(["0x10"])),
            ("sandbox_setTimestamp".to_string(), json!(["0x3e8", 1000])),
            ("sandbox_id".to_string(), json!([])),
            ("eth_blockNumber".to_string(), json!([])),
        ]
    );
}

#[tokio::test]
async fn test_wrong_arity_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(RpcResponder::default()).expect(0).mount(&server).await;

    let session = Session::attach(&server.uri(), "s1").unwrap();
    let err = session.rpc().call("mine", Vec::new()).await.unwrap_err();
    assert!(matches!(err, Error::UnknownMethod(_)), "{err}");
    let err = session.rpc().call("selfDestruct", Vec::new()).await.unwrap_err();
    assert!(matches!(err, Error::UnknownMethod(_)), "{err}");
}
