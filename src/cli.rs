//! CLI domain: parse, route and output only.
//! Query execution lives behind [`crate::connection::Connection`].

mod output;
mod parse;
mod route;

pub use output::{map_error, render_results_table};
pub use parse::{Cli, Commands};
pub use route::RunContext;
