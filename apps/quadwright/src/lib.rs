//! # Quadwright
//!
//! Library half of the `quadwright` binary: argument parsing, command
//! implementations and config-file loading, exposed for integration tests.

pub mod cli;
pub mod config;
