//! Command dispatch: bridges CLI args -> core downloader -> output.

pub mod download;
pub mod types;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an environment-bound command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Download(args) => download::handle(args, global).await,
        Command::Types(args) => types::handle(args, global).await,
        // Completions never reach the environment
        Command::Completions(_) => Ok(()),
    }
}
