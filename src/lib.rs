//! # crudgen
//!
//! **crudgen** turns one declarative YAML document (entities, enums, stores and a web mapping)
//! into the Rust sources of a CRUD service: entity types with their companions, persistence
//! store traits with default implementations, and HTTP handler functions with their route
//! registration.
//!
//! ## Overview
//!
//! Every run produces two kinds of files:
//!
//! - **fully generated** files (`*_gen.rs`, `handle_*_gen.rs`) that are rewritten on each run
//!   and must not be edited
//! - **long-lived** files (`mod.rs`, `<doc>_x.rs`, `wrap.rs`, `interfaces.rs`) that are created
//!   once from a skeleton, edited by hand, and afterwards only *patched*: missing items are
//!   added, nothing that exists is changed
//!
//! Running the generator twice on the same inputs leaves the tree byte-identical.
//!
//! ## Architecture
//!
//! - **[`document`]** - Document loading, validation and resolution (namespaces, hooks, store
//!   method expansion)
//! - **[`generator`]** - Model, query-spec, store and web emitters plus the phase pipeline
//! - **[`patch`]** - Structural patcher for hand-edited Rust files
//! - **[`config`]** - `crudgen.toml` output layout and emission switches
//! - **[`cli`]** - Command-line front end
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant CLI as CLI<br/>(crudgen)
//!     participant Doc as document
//!     participant Gen as generator
//!     participant Patch as patch
//!     participant FS as File System
//!
//!     CLI->>Doc: load_document("docs/cms.yaml")
//!     Doc->>Doc: Parse + validate
//!     CLI->>Doc: resolve(document)
//!     Doc-->>CLI: Schema
//!     CLI->>Gen: generate(schema, config, phases)
//!     Gen->>FS: models/<pkg>/cms_gen.rs
//!     Gen->>Patch: models/<pkg>/mod.rs
//!     Gen->>FS: stores/cms_gen.rs, cms_iface.json
//!     Gen->>Patch: stores/cms_x.rs, wrap.rs, interfaces.rs
//!     Gen->>FS: web/<pkg>/handle_cms_gen.rs
//!     Patch->>FS: insert missing members only
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crudgen::config::GenConfig;
//! use crudgen::generator::{generate_document, Phases};
//! use std::path::Path;
//!
//! let doc = Path::new("docs/cms.yaml");
//! let config = GenConfig::resolve(None, doc)?;
//! let report = generate_document(doc, &config, Phases::ALL, false)?;
//! println!("{} files written", report.written.len());
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod generator;
pub mod logging;
pub mod patch;

pub use config::GenConfig;
pub use document::{load_document, resolve, Schema};
pub use error::{GenError, Result};
pub use generator::{generate, generate_document, GenerateReport, Phases};
