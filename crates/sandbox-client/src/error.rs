//! Error types for the sandbox client.

use std::path::PathBuf;

use alloy_transport::TransportError;

/// Error types for configuration parsing, contract compilation and session control.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to read the configuration file
    #[error("Could not read {}: {source}", path.display())]
    ConfigRead {
        /// The file path that failed to load
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON
    #[error("Could not parse {}: {source}", path.display())]
    ConfigParse {
        /// The file path where JSON parsing failed
        path: PathBuf,
        /// The underlying JSON parsing error
        source: serde_json::Error,
    },

    /// The configuration is valid JSON but has the wrong shape
    #[error("{0}")]
    ConfigSchema(String),

    /// Malformed address
    #[error("{0}")]
    InvalidAddress(String),

    /// Malformed private key
    #[error("{0}")]
    InvalidKey(String),

    /// Value is neither a number nor a number-like string
    #[error("{0}")]
    InvalidValue(String),

    /// The compiler failed or produced unusable output
    #[error("Compilation of {} failed: {message}", source_path.display())]
    Compile {
        /// The source file being compiled
        source_path: PathBuf,
        /// Compiler diagnostics or parse failure
        message: String,
    },

    /// Single-contract mode found zero or several concrete contracts
    #[error("Expected exactly one contract in {}, found {found}", source_path.display())]
    AmbiguousOrMissingContract {
        /// The source file being compiled
        source_path: PathBuf,
        /// Number of concrete contracts found
        found: usize,
    },

    /// The requested contract is absent from the compiled output
    #[error("There is no contract {contract} in the file {}", source_path.display())]
    ContractNotFound {
        /// The requested contract name
        contract: String,
        /// The source file being compiled
        source_path: PathBuf,
    },

    /// The probed service answered, but it is not a sandbox
    #[error("There is a service running on {url} which is not Sandbox.")]
    NotASandbox {
        /// The probed URL
        url: String,
    },

    /// HTTP connection or request failure
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// A sandbox RPC call failed while provisioning or serving a session
    #[error("Sandbox call {method} failed: {source}")]
    Provisioning {
        /// The JSON-RPC method name
        method: String,
        /// The underlying transport error
        source: TransportError,
    },

    /// Session teardown answered with a non-200 status
    #[error("Could not stop the sandbox: {status}")]
    StopFailed {
        /// HTTP status returned by the server
        status: u16,
    },

    /// Failed to spawn the sandbox process
    #[error("Could not launch {program}: {source}")]
    Launch {
        /// The program that failed to start
        program: String,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The launched sandbox never started accepting connections
    #[error("Sandbox on port {port} did not accept connections within {waited_ms}ms")]
    LaunchTimeout {
        /// The port the sandbox was launched on
        port: u16,
        /// How long we waited
        waited_ms: u128,
    },

    /// A value could not be serialized into a JSON-RPC parameter
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The method is not part of the sandbox capability table, or was called with the wrong
    /// number of parameters
    #[error("{0}")]
    UnknownMethod(String),

    /// The sandbox URL could not be parsed or joined
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type for the sandbox client
pub type Result<T> = std::result::Result<T, Error>;
