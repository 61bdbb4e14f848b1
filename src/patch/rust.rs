//! [`StructuralTree`] over Rust source, backed by `syn`.
//!
//! `syn` drops ordinary comments, so the tree is never printed from the AST. Instead the
//! AST is used to locate declarations and anchors (via `span-locations`) and insertions are
//! spliced into the original text. Everything outside the inserted ranges is preserved
//! byte-for-byte, comments and formatting included. The text is re-parsed after every
//! insertion; an insertion that breaks the syntax is rejected.

use super::tree::{Member, Printer, StructuralTree};
use proc_macro2::LineColumn;
use syn::spanned::Spanned;
use syn::{Block, Expr, ExprStruct, Fields, File, ImplItem, Item, ItemImpl, Pat, Stmt, TraitItem, Type};

const INDENT: &str = "    ";
const BOM: &str = "\u{feff}";

/// Rust source text plus its parsed tree.
pub struct RustSource {
    text: String,
    file: File,
    /// Byte offset of every line start, relative to the text after a BOM
    lines: Vec<usize>,
    base: usize,
}

impl std::fmt::Debug for RustSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustSource")
            .field("bytes", &self.text.len())
            .field("items", &self.file.items.len())
            .finish()
    }
}

impl RustSource {
    /// Parses `text`; the error carries the line/column of the first syntax error.
    pub fn parse(text: impl Into<String>) -> Result<Self, String> {
        let text = text.into();
        let file = syn::parse_file(&text).map_err(|e| {
            let at = e.span().start();
            format!("{}:{}: {e}", at.line, at.column + 1)
        })?;
        let base = if text.starts_with(BOM) { BOM.len() } else { 0 };
        let lines = line_starts(&text[base..]);
        Ok(Self {
            text,
            file,
            lines,
            base,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn offset(&self, lc: LineColumn) -> usize {
        let Some(&start) = self.lines.get(lc.line.saturating_sub(1)) else {
            return self.text.len();
        };
        let start = start + self.base;
        self.text[start..]
            .char_indices()
            .nth(lc.column)
            .map_or(self.text.len(), |(i, _)| start + i)
    }

    fn start_of<T: Spanned>(&self, node: &T) -> usize {
        self.offset(node.span().start())
    }

    fn end_of<T: Spanned>(&self, node: &T) -> usize {
        self.offset(node.span().end())
    }

    fn line_start(&self, at: usize) -> usize {
        self.text[..at].rfind('\n').map_or(0, |i| i + 1)
    }

    /// Leading whitespace of the line containing `at`.
    fn indent_at(&self, at: usize) -> String {
        let start = self.line_start(at);
        self.text[start..]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect()
    }

    /// Only whitespace between the line start and `at`.
    fn is_line_head(&self, at: usize) -> bool {
        self.text[self.line_start(at)..at].trim().is_empty()
    }

    fn find_struct(&self, name: &str) -> Option<&syn::ItemStruct> {
        self.file.items.iter().find_map(|item| match item {
            Item::Struct(s) if s.ident == name => Some(s),
            _ => None,
        })
    }

    fn find_trait(&self, name: &str) -> Option<&syn::ItemTrait> {
        self.file.items.iter().find_map(|item| match item {
            Item::Trait(t) if t.ident == name => Some(t),
            _ => None,
        })
    }

    fn impls<'a>(
        &'a self,
        self_ty: &'a str,
        trait_name: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ItemImpl> + 'a {
        self.file.items.iter().filter_map(move |item| match item {
            Item::Impl(imp) if impl_matches(imp, self_ty, trait_name) => Some(imp),
            _ => None,
        })
    }

    /// Body of a free function or of an associated function in any `impl` block.
    fn fn_block(&self, name: &str) -> Option<&Block> {
        self.file.items.iter().find_map(|item| match item {
            Item::Fn(f) if f.sig.ident == name => Some(f.block.as_ref()),
            Item::Impl(imp) => imp.items.iter().find_map(|it| match it {
                ImplItem::Fn(f) if f.sig.ident == name => Some(&f.block),
                _ => None,
            }),
            _ => None,
        })
    }

    fn tail_literal(&self, func: &str) -> Option<&ExprStruct> {
        match self.fn_block(func)?.stmts.last()? {
            Stmt::Expr(expr, None) => struct_literal(expr),
            _ => None,
        }
    }

    /// Insertion that puts `code` on its own lines just before the closing brace at `close`.
    fn before_close(&self, close: usize, code: &str) -> (usize, String) {
        let base = self.indent_at(close);
        let indent = format!("{base}{INDENT}");
        if self.is_line_head(close) {
            (self.line_start(close), indent_block(code, &indent))
        } else {
            (close, format!("\n{}{base}", indent_block(code, &indent)))
        }
    }

    /// Insertion that puts `code` after the item ending at `end`, separated by a blank line.
    fn after_anchor(&self, end: usize, code: &str) -> (usize, String) {
        let indent = self.indent_at(end);
        let block = indent_block(code, &indent);
        (end, format!("\n\n{}", block.trim_end_matches('\n')))
    }

    fn append_item(&self, code: &str) -> (usize, String) {
        let mut s = String::new();
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            s.push('\n');
        }
        if !self.text.trim().is_empty() {
            s.push('\n');
        }
        s.push_str(code.trim_end());
        s.push('\n');
        (self.text.len(), s)
    }

    fn edits_for(&self, member: &Member, code: &str) -> Result<Vec<(usize, String)>, String> {
        let mut edits = Vec::new();
        match member {
            Member::StructField { strukt, .. } => {
                let s = self
                    .find_struct(strukt)
                    .ok_or_else(|| format!("struct {strukt} not found"))?;
                let Fields::Named(named) = &s.fields else {
                    return Err(format!("struct {strukt} has no named fields"));
                };
                if let Some(last) = named.named.last() {
                    if !named.named.trailing_punct() {
                        edits.push((self.end_of(last), ",".to_string()));
                    }
                }
                let close = self.offset(named.brace_token.span.close().start());
                edits.push(self.before_close(close, code));
            }
            Member::TraitFn { trait_name, .. } => {
                let t = self
                    .find_trait(trait_name)
                    .ok_or_else(|| format!("trait {trait_name} not found"))?;
                let close = self.offset(t.brace_token.span.close().start());
                edits.push(self.before_close(close, code));
            }
            Member::ImplFn {
                self_ty,
                trait_name,
                ..
            } => match self.impls(self_ty, trait_name.as_deref()).last() {
                Some(imp) => {
                    let last_fn = imp.items.iter().rev().find_map(|it| match it {
                        ImplItem::Fn(f) => Some(f),
                        _ => None,
                    });
                    match last_fn {
                        Some(f) => edits.push(self.after_anchor(self.end_of(f), code)),
                        None => {
                            let close = self.offset(imp.brace_token.span.close().start());
                            edits.push(self.before_close(close, code));
                        }
                    }
                }
                None => {
                    let head = match trait_name {
                        Some(t) => format!("impl {t} for {self_ty}"),
                        None => format!("impl {self_ty}"),
                    };
                    let block = format!("{head} {{\n{}}}", indent_block(code, INDENT));
                    edits.push(self.append_item(&block));
                }
            },
            Member::FreeFn { .. } | Member::Trait { .. } | Member::ImplBlock { .. } => {
                edits.push(self.append_item(code))
            }
            Member::Module { .. } => {
                let anchor = self
                    .file
                    .items
                    .iter()
                    .filter(|item| matches!(item, Item::Mod(_)))
                    .last()
                    .or_else(|| {
                        self.file
                            .items
                            .iter()
                            .filter(|item| matches!(item, Item::Use(_)))
                            .last()
                    });
                match (anchor, self.file.attrs.last()) {
                    (Some(item), _) => {
                        edits.push((self.end_of(item), format!("\n{}", code.trim_end())));
                    }
                    (None, Some(inner)) => {
                        edits.push((self.end_of(inner), format!("\n\n{}", code.trim_end())));
                    }
                    (None, None) => edits.push((self.base, format!("{}\n", code.trim_end()))),
                }
            }
            Member::LetStmt { func, .. } => {
                let block = self
                    .fn_block(func)
                    .ok_or_else(|| format!("fn {func} not found"))?;
                match block.stmts.last() {
                    Some(tail @ Stmt::Expr(_, None)) => {
                        let at = self.start_of(tail);
                        if self.is_line_head(at) {
                            let indent = self.indent_at(at);
                            edits.push((self.line_start(at), indent_block(code, &indent)));
                        } else {
                            edits.push((at, format!("{} ", code.trim())));
                        }
                    }
                    _ => {
                        let close = self.offset(block.brace_token.span.close().start());
                        edits.push(self.before_close(close, code));
                    }
                }
            }
            Member::LiteralField { func, .. } => {
                let lit = self
                    .tail_literal(func)
                    .ok_or_else(|| format!("fn {func} does not return a struct literal"))?;
                let close = self.offset(lit.brace_token.span.close().start());
                let entry = format!("{},", code.trim().trim_end_matches(','));
                if self.is_line_head(close) {
                    match &lit.dot2_token {
                        Some(dot2) => {
                            let at = self.offset(dot2.spans[0].start());
                            let indent = self.indent_at(at);
                            edits.push((self.line_start(at), indent_block(&entry, &indent)));
                        }
                        None => {
                            if let Some(last) = lit.fields.last() {
                                if !lit.fields.trailing_punct() {
                                    edits.push((self.end_of(last), ",".to_string()));
                                }
                            }
                            edits.push(self.before_close(close, &entry));
                        }
                    }
                } else {
                    match lit.fields.last() {
                        Some(last) if lit.fields.trailing_punct() => {
                            let comma = self.text[self.end_of(last)..]
                                .find(',')
                                .map_or(close, |i| self.end_of(last) + i + 1);
                            edits.push((comma, format!(" {entry}")));
                        }
                        Some(last) => {
                            edits.push((self.end_of(last), format!(", {}", entry.trim_end_matches(','))));
                        }
                        None => edits.push((close, format!("{} ", entry.trim_end_matches(',')))),
                    }
                }
            }
        }
        Ok(edits)
    }
}

impl StructuralTree for RustSource {
    fn find(&self, member: &Member) -> bool {
        match member {
            Member::StructField { strukt, field } => self
                .find_struct(strukt)
                .is_some_and(|s| s.fields.iter().any(|f| f.ident.as_ref().is_some_and(|i| i == field))),
            Member::TraitFn { trait_name, func } => self.find_trait(trait_name).is_some_and(|t| {
                t.items
                    .iter()
                    .any(|it| matches!(it, TraitItem::Fn(f) if f.sig.ident == func))
            }),
            Member::ImplFn {
                self_ty,
                trait_name,
                func,
            } => self.impls(self_ty, trait_name.as_deref()).any(|imp| {
                imp.items
                    .iter()
                    .any(|it| matches!(it, ImplItem::Fn(f) if f.sig.ident == func))
            }),
            Member::FreeFn { func } => self
                .file
                .items
                .iter()
                .any(|item| matches!(item, Item::Fn(f) if f.sig.ident == func)),
            Member::Trait { name } => self.find_trait(name).is_some(),
            Member::ImplBlock {
                self_ty,
                trait_name,
            } => self.impls(self_ty, Some(trait_name)).next().is_some(),
            Member::Module { name } => self
                .file
                .items
                .iter()
                .any(|item| matches!(item, Item::Mod(m) if m.ident == name)),
            Member::LetStmt { func, binding } => self.fn_block(func).is_some_and(|b| {
                b.stmts.iter().any(|stmt| match stmt {
                    Stmt::Local(local) => pat_ident(&local.pat).is_some_and(|i| i == binding),
                    _ => false,
                })
            }),
            Member::LiteralField { func, field } => self.tail_literal(func).is_some_and(|lit| {
                lit.fields
                    .iter()
                    .any(|fv| matches!(&fv.member, syn::Member::Named(i) if i == field))
            }),
        }
    }

    fn insert(&mut self, member: &Member, code: &str) -> Result<(), String> {
        let mut edits: Vec<(usize, usize, String)> = self
            .edits_for(member, code)?
            .into_iter()
            .enumerate()
            .map(|(i, (at, s))| (at, i, s))
            .collect();
        // back to front keeps earlier offsets valid; ties keep their given order
        edits.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        let mut text = self.text.clone();
        for (at, _, s) in edits {
            text.insert_str(at, &s);
        }
        let patched = RustSource::parse(text)
            .map_err(|e| format!("inserting {member} produced invalid source: {e}"))?;
        *self = patched;
        Ok(())
    }
}

/// Prints the spliced text unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerbatimPrinter;

impl Printer<RustSource> for VerbatimPrinter {
    fn print(&self, tree: &RustSource) -> String {
        tree.text.clone()
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

fn indent_block(code: &str, indent: &str) -> String {
    let mut out = String::new();
    for line in code.trim_end().lines() {
        if !line.trim().is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

fn last_ident(ty: &Type) -> Option<&syn::Ident> {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|s| &s.ident),
        _ => None,
    }
}

fn impl_matches(imp: &ItemImpl, self_ty: &str, trait_name: Option<&str>) -> bool {
    if !last_ident(&imp.self_ty).is_some_and(|i| i == self_ty) {
        return false;
    }
    match (trait_name, &imp.trait_) {
        (None, None) => true,
        (Some(t), Some((_, path, _))) => path.segments.last().is_some_and(|s| s.ident == t),
        _ => false,
    }
}

fn pat_ident(pat: &Pat) -> Option<&syn::Ident> {
    match pat {
        Pat::Ident(p) => Some(&p.ident),
        Pat::Type(t) => pat_ident(&t.pat),
        _ => None,
    }
}

fn struct_literal(expr: &Expr) -> Option<&ExprStruct> {
    match expr {
        Expr::Struct(s) => Some(s),
        Expr::Call(call) => call.args.iter().find_map(struct_literal),
        Expr::Paren(p) => struct_literal(&p.expr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::tree::find_or_insert;
    use pretty_assertions::assert_eq;

    fn patch(src: &str, member: Member, code: &str) -> String {
        let mut tree = RustSource::parse(src).unwrap();
        find_or_insert(&mut tree, &member, || code.to_string()).unwrap();
        VerbatimPrinter.print(&tree)
    }

    #[test]
    fn test_struct_field_appends_after_existing_fields() {
        let src = "pub struct Wrap {\n    db: OrmDb,\n    // hand-written\n    cache: Cache, // keep\n}\n";
        let out = patch(
            src,
            Member::StructField {
                strukt: "Wrap".to_string(),
                field: "content_store".to_string(),
            },
            "content_store: ContentStoreImpl, // gened",
        );
        assert_eq!(
            out,
            "pub struct Wrap {\n    db: OrmDb,\n    // hand-written\n    cache: Cache, // keep\n    content_store: ContentStoreImpl, // gened\n}\n"
        );
    }

    #[test]
    fn test_struct_field_adds_missing_comma() {
        let out = patch(
            "// 存储\nstruct A {\n    a: u8 // 标题\n}\n",
            Member::StructField {
                strukt: "A".to_string(),
                field: "b".to_string(),
            },
            "b: u8,",
        );
        assert_eq!(out, "// 存储\nstruct A {\n    a: u8, // 标题\n    b: u8,\n}\n");
    }

    #[test]
    fn test_existing_member_is_left_alone() {
        let src = "struct A {\n    b: String,\n}\n";
        let out = patch(
            src,
            Member::StructField {
                strukt: "A".to_string(),
                field: "b".to_string(),
            },
            "b: u8,",
        );
        assert_eq!(out, src);
    }

    #[test]
    fn test_impl_block_created_when_missing() {
        let out = patch(
            "pub struct Wrap {}\n",
            Member::ImplFn {
                self_ty: "Wrap".to_string(),
                trait_name: Some("Storage".to_string()),
                func: "content".to_string(),
            },
            "fn content(&self) -> &dyn ContentStore {\n    &self.content_store\n}",
        );
        assert_eq!(
            out,
            "pub struct Wrap {}\n\nimpl Storage for Wrap {\n    fn content(&self) -> &dyn ContentStore {\n        &self.content_store\n    }\n}\n"
        );
    }

    #[test]
    fn test_impl_fn_goes_after_last_fn() {
        let src = "impl Storage for Wrap {\n    fn a(&self) -> u8 {\n        1\n    }\n}\n";
        let out = patch(
            src,
            Member::ImplFn {
                self_ty: "Wrap".to_string(),
                trait_name: Some("Storage".to_string()),
                func: "b".to_string(),
            },
            "fn b(&self) -> u8 {\n    2\n}",
        );
        assert_eq!(
            out,
            "impl Storage for Wrap {\n    fn a(&self) -> u8 {\n        1\n    }\n\n    fn b(&self) -> u8 {\n        2\n    }\n}\n"
        );
    }

    #[test]
    fn test_empty_inline_impl_is_expanded() {
        let out = patch(
            "impl Storage for Wrap {}\n",
            Member::ImplFn {
                self_ty: "Wrap".to_string(),
                trait_name: Some("Storage".to_string()),
                func: "a".to_string(),
            },
            "fn a(&self) {}",
        );
        assert_eq!(out, "impl Storage for Wrap {\n    fn a(&self) {}\n}\n");
    }

    #[test]
    fn test_initializer_statement_and_literal_field() {
        let src = "impl Wrap {\n    pub fn new_with_db(db: OrmDb) -> Self {\n        Self {\n            db,\n        }\n    }\n}\n";
        let mut tree = RustSource::parse(src).unwrap();
        let stmt = Member::LetStmt {
            func: "new_with_db".to_string(),
            binding: "content_store".to_string(),
        };
        let field = Member::LiteralField {
            func: "new_with_db".to_string(),
            field: "content_store".to_string(),
        };
        find_or_insert(&mut tree, &stmt, || {
            "let content_store = ContentStoreImpl::new(db.clone());".to_string()
        })
        .unwrap();
        find_or_insert(&mut tree, &field, || "content_store".to_string()).unwrap();
        assert!(tree.find(&stmt));
        assert!(tree.find(&field));
        assert_eq!(
            tree.text(),
            "impl Wrap {\n    pub fn new_with_db(db: OrmDb) -> Self {\n        let content_store = ContentStoreImpl::new(db.clone());\n        Self {\n            db,\n            content_store,\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn test_module_declaration_after_last_mod() {
        let out = patch(
            "mod a;\nmod b;\n\npub fn x() {}\n",
            Member::Module {
                name: "c".to_string(),
            },
            "mod c;",
        );
        assert_eq!(out, "mod a;\nmod b;\nmod c;\n\npub fn x() {}\n");
    }

    #[test]
    fn test_trait_fn_and_free_fn() {
        let src = "pub trait Storage {\n    fn a(&self);\n}\n";
        let mut tree = RustSource::parse(src).unwrap();
        tree.insert(
            &Member::TraitFn {
                trait_name: "Storage".to_string(),
                func: "content".to_string(),
            },
            "fn content(&self) -> &dyn ContentStore;",
        )
        .unwrap();
        tree.insert(
            &Member::FreeFn {
                func: "db_before_save_article".to_string(),
            },
            "pub async fn db_before_save_article() {}",
        )
        .unwrap();
        assert_eq!(
            tree.text(),
            "pub trait Storage {\n    fn a(&self);\n    fn content(&self) -> &dyn ContentStore;\n}\n\npub async fn db_before_save_article() {}\n"
        );
    }

    #[test]
    fn test_module_goes_below_inner_docs() {
        let mut src = RustSource::parse("//! Models of `cms`.\n").unwrap();
        let member = Member::Module {
            name: "cms_gen".to_string(),
        };
        assert!(find_or_insert(&mut src, &member, || "pub mod cms_gen;".to_string()).unwrap());
        assert_eq!(src.text(), "//! Models of `cms`.\n\npub mod cms_gen;\n");
    }

    #[test]
    fn test_impl_block_is_created_once() {
        let src = "pub trait ContentX {}\n\npub struct ContentStoreImpl;\n";
        let member = Member::ImplBlock {
            self_ty: "ContentStoreImpl".to_string(),
            trait_name: "ContentX".to_string(),
        };
        let mut tree = RustSource::parse(src).unwrap();
        assert!(!tree.find(&member));
        tree.insert(&member, "impl ContentX for ContentStoreImpl {}").unwrap();
        assert!(tree.find(&member));
        assert_eq!(
            tree.text(),
            "pub trait ContentX {}\n\npub struct ContentStoreImpl;\n\nimpl ContentX for ContentStoreImpl {}\n"
        );
    }

    #[test]
    fn test_parse_failure_and_invalid_insertion() {
        assert!(RustSource::parse("struct {").is_err());
        let mut tree = RustSource::parse("struct A {\n    a: u8,\n}\n").unwrap();
        let err = tree
            .insert(
                &Member::StructField {
                    strukt: "A".to_string(),
                    field: "b".to_string(),
                },
                "b: ,",
            )
            .unwrap_err();
        assert!(err.contains("invalid source"));
        assert_eq!(tree.text(), "struct A {\n    a: u8,\n}\n");
    }
}
