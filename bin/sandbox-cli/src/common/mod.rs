mod args;
mod logging;

pub use args::*;
pub use logging::*;
