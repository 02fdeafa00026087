//! Command-line interface: clap definitions, the route table and output
//! presentation.

pub mod output;
pub mod parse;
pub mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use route::RunContext;
