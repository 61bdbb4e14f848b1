//! Query spec emission: the per-model filter struct and its `sift` implementation.
//!
//! `sift` applies, in this order: the relation gate, the shared spec mixins (model, audit,
//! declared sifters), one predicate per annotated field, and the text-search fallback.

use super::code::CodeWriter;
use crate::document::naming::{lc_first, plural, snake};
use crate::document::{Field, HookKind, Model, QueryAnnotation, Schema, SiftKind};
use crate::error::{GenError, Result};
use std::collections::BTreeSet;

/// Shape of the relation-inclusion gate of a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelGate {
    /// At most one relation and no after-list hook
    Flag,
    /// Comma separated relation names
    Selector,
}

/// Gate of a model, `None` when nothing can be included.
pub fn rel_gate(schema: &Schema, model: &Model) -> Option<RelGate> {
    let rels = model.relations().len();
    let after_list = schema.hooks(&model.name).has(HookKind::AfterList);
    if rels == 0 && !after_list {
        None
    } else if rels <= 1 && !after_list {
        Some(RelGate::Flag)
    } else {
        Some(RelGate::Selector)
    }
}

/// A spec member derived from one annotated field.
#[derive(Debug, Clone)]
pub struct Filter<'a> {
    pub field: &'a Field,
    pub ann: QueryAnnotation,
    /// Column, alias-qualified when the list query joins relations
    pub column: Option<String>,
    pub rust: String,
    /// Rust type of the model field
    pub value: String,
    /// Type of the spec member
    pub ty: String,
    /// Multi-value companion member (`author_ids`)
    pub multi: Option<String>,
}

/// Derives the filters of a model, model fields first, then `specExtras`.
pub fn filters<'a>(
    schema: &Schema,
    model: &'a Model,
    imports: &mut BTreeSet<String>,
) -> Result<Vec<Filter<'a>>> {
    let aliased = !model.rel_has_one().is_empty();
    let mut out = Vec::new();
    for field in model.fields.iter().chain(model.spec_extras.iter()) {
        let ann = QueryAnnotation::parse(&field.query)
            .map_err(|e| GenError::schema(format!("{}.{}: {e}", model.name, field.name)))?;
        let Some(ann) = ann else { continue };
        if ann.kind == SiftKind::TextOnly || field.is_embed() {
            continue;
        }
        let rust_ty = schema.qualifier.rust_type(&field.ty, imports)?;
        let ty = if ann.has_vals {
            rust_ty.clone()
        } else if ann.decode
            || field.is_oid()
            || rust_ty == "String"
            || matches!(
                ann.kind,
                SiftKind::Ice | SiftKind::Match | SiftKind::Date | SiftKind::Oids | SiftKind::Custom
            )
        {
            "String".to_string()
        } else {
            format!("Option<{rust_ty}>")
        };
        let column = field.column().map(|c| {
            if aliased {
                format!("?TableAlias.{}", c.name)
            } else {
                c.name
            }
        });
        let multi = ann.multi.map(|_| snake(&plural(&field.name)));
        out.push(Filter {
            field,
            ann,
            column,
            rust: field.rust_name(),
            value: rust_ty,
            ty,
            multi,
        });
    }
    Ok(out)
}

/// Spec mixins: (member, type) in `sift` order.
fn mixins(model: &Model, schema: &Schema, imports: &mut BTreeSet<String>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    if model.mod_hook().1.is_some() {
        out.push(("model".to_string(), "comm::ModelSpec".to_string()));
    }
    if model.has_audit() {
        out.push(("audit".to_string(), "comm::AuditSpec".to_string()));
    }
    for sifter in &model.sifters {
        let ty = schema.qualifier.rust_type(sifter, imports)?;
        let last = ty.rsplit("::").next().unwrap_or(&ty);
        out.push((snake(last), ty));
    }
    Ok(out)
}

fn sift_call(f: &Filter<'_>, col: &str, value: &str) -> Option<String> {
    let both = f.ann.both;
    let by_ref = if f.ty.starts_with("Option<") {
        value.to_string()
    } else {
        format!("&{value}")
    };
    let call = match f.ann.kind {
        SiftKind::Equal if f.field.ignore_case => format!("q.sift_equal_ci(\"{col}\", {by_ref});"),
        SiftKind::Equal => format!("q.sift_equal(\"{col}\", {by_ref});"),
        SiftKind::Ice => format!("q.sift_ice(\"{col}\", {by_ref}, {both});"),
        SiftKind::Match => format!("q.sift_match(\"{col}\", {by_ref}, {both});"),
        SiftKind::Date => {
            let int_encoded = f.field.is_date_time();
            format!("q.sift_date(\"{col}\", {by_ref}, {int_encoded}, {both});")
        }
        SiftKind::Great => format!("q.sift_great(\"{col}\", {by_ref});"),
        SiftKind::Less => format!("q.sift_less(\"{col}\", {by_ref});"),
        SiftKind::Oids => format!("q.sift_oids(\"{col}\", {by_ref});"),
        SiftKind::Custom | SiftKind::TextOnly => return None,
    };
    Some(call)
}

/// Predicate for the singular member.
fn emit_single(w: &mut CodeWriter, f: &Filter<'_>, col: &str) {
    let member = format!("self.{}", f.rust);
    if f.ann.has_vals {
        w.block(format!("if !{member}.is_empty()"), |w| {
            w.line(format!("q.sift_has_vals(\"{col}\", &{member}.vals());"));
        });
        return;
    }
    if f.ann.decode {
        w.block(format!("if let Ok(v) = {member}.parse::<{}>()", f.value), |w| {
            w.line(format!("q.sift_equal(\"{col}\", &v);"));
        });
        return;
    }
    if f.ty.starts_with("Option<") {
        w.block(format!("if let Some(v) = &{member}"), |w| {
            if let Some(call) = sift_call(f, col, "v") {
                w.line(call);
            }
        });
        return;
    }
    if let Some(call) = sift_call(f, col, &member) {
        w.line(call);
    }
}

fn emit_filter(w: &mut CodeWriter, f: &Filter<'_>, imports: &mut BTreeSet<String>) {
    let Some(col) = &f.column else { return };
    if f.ann.kind == SiftKind::Custom {
        return;
    }
    match (&f.multi, f.ann.multi) {
        (Some(many), Some(kind)) => {
            let parser = kind.parser();
            if let Some((ns, _)) = parser.split_once("::") {
                imports.insert(ns.to_string());
            }
            w.line(format!("let {many} = {parser}(&self.{many});"));
            w.open(format!("if !{many}.is_empty() {{"));
            w.line(format!("q.sift_in(\"{col}\", &{many});"));
            w.reopen("} else {");
            emit_single(w, f, col);
            w.close("}");
        }
        _ => emit_single(w, f, col),
    }
}

/// Writes `<Model>Spec` with its `pgx::ListSpec` impl.
pub fn emit_spec(
    w: &mut CodeWriter,
    schema: &Schema,
    model: &Model,
    imports: &mut BTreeSet<String>,
) -> Result<()> {
    let name = &model.name;
    imports.insert("comm".to_string());
    imports.insert("pgx".to_string());
    let filters = filters(schema, model, imports)?;
    let mixins = mixins(model, schema, imports)?;
    let gate = rel_gate(schema, model);
    let text_search = model.text_search_columns().is_some();
    let owner = model.has_owner().then(|| {
        if model.rel_has_one().is_empty() {
            "owner_id".to_string()
        } else {
            "?TableAlias.owner_id".to_string()
        }
    });

    w.doc(&format!("List filter of {name}."));
    w.line("#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]");
    w.line("#[serde(default)]");
    w.block(format!("pub struct {name}Spec"), |w| {
        w.line("#[serde(flatten)]");
        w.line("pub page: comm::PageSpec,");
        for (member, ty) in &mixins {
            w.line("#[serde(flatten)]");
            w.line(format!("pub {member}: {ty},"));
        }
        if text_search {
            w.line("#[serde(flatten)]");
            w.line("pub text_search: comm::TextSearchSpec,");
        }
        for f in &filters {
            w.doc(&f.field.comment);
            let arg = f.field.arg_tag();
            if arg != f.rust {
                w.line(format!("#[serde(rename = \"{arg}\")]"));
            }
            w.line(format!("pub {}: {},", f.rust, f.ty));
            if let Some(many) = &f.multi {
                let arg = lc_first(&plural(&f.field.name));
                w.doc(&format!("Comma separated values of {}", f.field.name));
                if arg != *many {
                    w.line(format!("#[serde(rename = \"{arg}\")]"));
                }
                w.line(format!("pub {many}: String,"));
            }
        }
        if owner.is_some() {
            w.doc("Owner ids, comma separated");
            w.line("#[serde(rename = \"owner\")]");
            w.line("pub owner_id: String,");
        }
        match gate {
            Some(RelGate::Flag) => {
                w.line("#[serde(rename = \"rel\")]");
                w.line("pub with_rel: bool,");
            }
            Some(RelGate::Selector) => {
                w.line("#[serde(rename = \"rel\")]");
                w.line("pub with_rel: String,");
            }
            None => {}
        }
    });
    w.blank();

    let sortable = model.sortable_columns();
    let joined: Vec<String> = model.rel_has_one().iter().map(|f| f.name.clone()).collect();
    w.block(format!("impl pgx::ListSpec for {name}Spec"), |w| {
        w.block("fn page(&self) -> &comm::PageSpec", |w| {
            w.line("&self.page");
        });
        w.blank();
        w.block("fn can_sort(&self, key: &str) -> bool", |w| {
            if sortable.is_empty() {
                w.line("self.page.can_sort(key)");
            } else {
                let alts: Vec<String> = sortable.iter().map(|c| format!("\"{c}\"")).collect();
                w.line(format!("matches!(key, {}) || self.page.can_sort(key)", alts.join(" | ")));
            }
        });
        w.blank();
        w.block("fn sift(&self, q: &mut pgx::SelectQuery)", |w| {
            match gate {
                Some(RelGate::Flag) if !joined.is_empty() => {
                    w.block("if self.with_rel", |w| {
                        for rel in &joined {
                            w.line(format!("q.relation(\"{rel}\");"));
                        }
                    });
                }
                Some(RelGate::Selector) if !joined.is_empty() => {
                    let alts: Vec<String> = joined.iter().map(|r| format!("\"{r}\"")).collect();
                    w.block("for rel in self.with_rel.split(',').map(str::trim)", |w| {
                        w.block(format!("if matches!(rel, {})", alts.join(" | ")), |w| {
                            w.line("q.relation(rel);");
                        });
                    });
                }
                _ => {}
            }
            for (member, _) in &mixins {
                w.line(format!("self.{member}.sift(q);"));
            }
            for f in &filters {
                emit_filter(w, f, imports);
            }
            if let Some(col) = &owner {
                w.line(format!("q.sift_oids(\"{col}\", &self.owner_id);"));
            }
            if text_search {
                w.line("self.text_search.sift(q);");
            }
        });
    });
    w.blank();
    tracing::debug!(model = %name, filters = filters.len(), "query spec emitted");
    Ok(())
}
