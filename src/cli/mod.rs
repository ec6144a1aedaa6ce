//! Command-line interface for the custody deployment

pub mod commands;

pub use commands::*;
