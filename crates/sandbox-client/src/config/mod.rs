//! Environment configuration (`ethereum.json`) model and resolution pipeline.

mod pipeline;
mod types;

pub use pipeline::*;
pub use types::*;
