//! Language-agnostic structural patching.
//!
//! A [`StructuralTree`] knows how to look up a named member inside a container and how to
//! insert one at its anchor. [`find_or_insert`] is the whole algorithm: search, build only
//! when absent, insert, never touch what is already there.

use std::fmt;

/// What kind of declaration a [`Member`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Function,
    Statement,
    Trait,
    Impl,
    Module,
}

/// A named declaration together with the container it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    /// Named field of a struct definition
    StructField { strukt: String, field: String },
    /// Method signature or default method of a trait
    TraitFn { trait_name: String, func: String },
    /// Function inside an `impl` block; the block is created when missing
    ImplFn {
        self_ty: String,
        trait_name: Option<String>,
        func: String,
    },
    /// Top-level function
    FreeFn { func: String },
    /// Top-level trait definition
    Trait { name: String },
    /// `impl Trait for Type` block, with whatever body it is created with
    ImplBlock { self_ty: String, trait_name: String },
    /// `mod name;` declaration
    Module { name: String },
    /// `let binding = ...;` placed before the tail expression of a function
    LetStmt { func: String, binding: String },
    /// Field of the struct literal a function returns
    LiteralField { func: String, field: String },
}

impl Member {
    pub fn kind(&self) -> MemberKind {
        match self {
            Member::StructField { .. } | Member::LiteralField { .. } => MemberKind::Field,
            Member::TraitFn { .. } | Member::ImplFn { .. } | Member::FreeFn { .. } => {
                MemberKind::Function
            }
            Member::Trait { .. } => MemberKind::Trait,
            Member::ImplBlock { .. } => MemberKind::Impl,
            Member::Module { .. } => MemberKind::Module,
            Member::LetStmt { .. } => MemberKind::Statement,
        }
    }

    /// Name searched for inside the container.
    pub fn name(&self) -> &str {
        match self {
            Member::StructField { field, .. } | Member::LiteralField { field, .. } => field,
            Member::TraitFn { func, .. } | Member::ImplFn { func, .. } | Member::FreeFn { func } => {
                func
            }
            Member::Trait { name } | Member::Module { name } => name,
            Member::ImplBlock { trait_name, .. } => trait_name,
            Member::LetStmt { binding, .. } => binding,
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::StructField { strukt, field } => write!(f, "field {strukt}.{field}"),
            Member::TraitFn { trait_name, func } => write!(f, "fn {trait_name}::{func}"),
            Member::ImplFn {
                self_ty,
                trait_name: Some(t),
                func,
            } => write!(f, "fn <{self_ty} as {t}>::{func}"),
            Member::ImplFn { self_ty, func, .. } => write!(f, "fn {self_ty}::{func}"),
            Member::FreeFn { func } => write!(f, "fn {func}"),
            Member::Trait { name } => write!(f, "trait {name}"),
            Member::ImplBlock {
                self_ty,
                trait_name,
            } => write!(f, "impl {trait_name} for {self_ty}"),
            Member::Module { name } => write!(f, "mod {name}"),
            Member::LetStmt { func, binding } => write!(f, "let {binding} in {func}"),
            Member::LiteralField { func, field } => write!(f, "literal field {field} in {func}"),
        }
    }
}

/// A mutable syntax tree that supports additive edits.
pub trait StructuralTree {
    /// True when the member already exists.
    fn find(&self, member: &Member) -> bool;

    /// Inserts `code` for `member` at its anchor. Existing nodes stay byte-for-byte intact.
    fn insert(&mut self, member: &Member, code: &str) -> Result<(), String>;
}

/// Renders a tree back to source text.
pub trait Printer<T: ?Sized> {
    fn print(&self, tree: &T) -> String;
}

/// Inserts `member` unless present; `build` runs only when the member is missing.
///
/// Returns whether an insertion happened.
pub fn find_or_insert<T, F>(tree: &mut T, member: &Member, build: F) -> Result<bool, String>
where
    T: StructuralTree + ?Sized,
    F: FnOnce() -> String,
{
    if tree.find(member) {
        return Ok(false);
    }
    tree.insert(member, &build())?;
    Ok(true)
}
