//! Control client for a locally-run Ethereum sandbox.
//!
//! Parses and resolves an `ethereum.json` environment configuration (including compiling the
//! Solidity contracts it deploys), makes sure a sandbox is listening, creates a session on it and
//! provisions the session through the sandbox JSON-RPC extensions.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod address;
pub mod compiler;
pub mod config;
pub mod value;

mod error;
pub use error::*;

mod session;
pub use session::*;
