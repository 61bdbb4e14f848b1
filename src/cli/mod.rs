//! # CLI Module
//!
//! Command-line front end of the generator.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! Run the selected phases for one document:
//!
//! ```bash
//! crudgen generate --doc docs/cms.yaml --phases 7
//! ```
//!
//! Options:
//! - `--doc <FILE>` - Path to the YAML (or JSON) document (required)
//! - `--phases <MASK>` - 1 models, 2 stores, 4 web; combine by adding (default: 7)
//! - `--drop` - Remove the fully generated files of the selected phases first
//! - `--config <FILE>` - Explicit `crudgen.toml` (default: next to the document)
//! - `--output <DIR>` - Project root, overrides `output_root`
//! - `--no-fmt` - Skip rustfmt on generated files
//!
//! ### `check`
//!
//! Load and resolve a document without writing anything, then print what it declares:
//!
//! ```bash
//! crudgen check --doc docs/cms.yaml
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use crudgen::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run_cli, Cli, Commands};
