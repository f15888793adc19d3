//! TOML settings loaded through the `config` crate, with the file path
//! optionally given on the command line.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
