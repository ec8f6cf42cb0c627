//! Sandbox sessions: discovery, launch, provisioning and teardown.

mod process;
mod rpc;
mod sandbox;

pub use process::*;
pub use rpc::*;
pub use sandbox::*;

use std::{io, net::IpAddr};

use reqwest::Url;

/// Returns true if any error in the chain is an I/O `ConnectionRefused`.
pub(crate) fn is_connection_refused(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(err) = source {
        let refused = err
            .downcast_ref::<io::Error>()
            .is_some_and(|io| io.kind() == io::ErrorKind::ConnectionRefused);
        if refused {
            return true;
        }
        source = err.source();
    }
    false
}

/// Host part of `url` without IPv6 brackets.
pub(crate) fn loopback_host(url: &Url) -> String {
    url.host_str().unwrap_or("localhost").trim_start_matches('[').trim_end_matches(']').to_string()
}

/// Returns true if `url` points at this machine.
pub(crate) fn is_loopback(url: &Url) -> bool {
    let host = loopback_host(url);
    host.eq_ignore_ascii_case("localhost") ||
        host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
