//! Solidity compilation for accounts that declare a contract to deploy.

mod ast;
mod solc;

pub use ast::*;
pub use solc::*;
