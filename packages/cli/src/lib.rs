//! The `squeeze` command-line driver.

mod args;
mod error;
mod run;

pub use args::Args;
pub use error::CliError;
pub use run::{Summary, run};
