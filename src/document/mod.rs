//! # Document Module
//!
//! Loads the declarative input document and resolves it into the read-only [`Schema`]
//! every emitter works from.
//!
//! ```text
//! cms.yaml ──load_document──► Document ──resolve──► Schema
//!                  │                         │
//!             SchemaError              ResolutionError
//! ```
//!
//! Resolution expands store shorthand groups into explicit (action, model) methods, builds
//! the hook table of every model and checks that each namespaced field type maps to an
//! import path.

mod action;
mod annotation;
mod fields;
mod hooks;
mod load;
pub mod naming;
mod qualify;
mod resolve;
mod types;

pub use action::Action;
pub use annotation::{MultiKind, QueryAnnotation, SiftKind};
pub use fields::{Column, RelMode, MODEL_DEFAULT, MODEL_DUNCE, MODEL_SERIAL};
pub use hooks::{resolve_hook_name, HookKind, ResolvedHooks, StoreHook};
pub use load::{load_document, parse_document, validate};
pub use qualify::{Qualifier, DEFAULT_QUALS};
pub use resolve::{expand_methods, resolve, ResolvedStore, Schema, StoreMethod};
pub use types::*;
