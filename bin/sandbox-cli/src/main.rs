//! Sandbox CLI tool for checking environment configurations and driving sandbox sessions
//!
//! This tool provides a command-line interface over the `sandbox-client` library: it resolves
//! `ethereum.json`, starts and provisions sessions, and calls sandbox methods on them.

use clap::Parser;

mod cmd;
pub use cmd::*;

/// Shared argument groups and logging setup
pub mod common;

#[tokio::main]
async fn main() -> Result<(), Error> {
    set_thread_panic_hook();
    MainCmd::parse().run().await.inspect_err(|e| eprintln!("{e}"))
}

/// Sets thread panic hook, useful for having tests that panic.
fn set_thread_panic_hook() {
    use std::{
        backtrace::Backtrace,
        panic::{set_hook, take_hook},
        process::exit,
    };
    let orig_hook = take_hook();
    set_hook(Box::new(move |panic_info| {
        println!("Custom backtrace: {}", Backtrace::capture());
        orig_hook(panic_info);
        exit(1);
    }));
}
