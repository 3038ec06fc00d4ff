//! Library side of the `ragchat` binary: argument definitions, provider
//! wiring, and the command implementations.

pub mod cli;
pub mod commands;
pub mod setup;

pub use cli::{Cli, Command};
