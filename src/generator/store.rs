//! Store emission: one `#[async_trait]` trait per document store, its implementation struct
//! with a synthesized body per (action, model) method, hook stubs for the extension file and
//! the members the aggregator files must carry.
//!
//! Transactions follow one shape for every action:
//!
//! ```text
//! let mut tx = self.db.begin(ctx).await?;
//! <before hook>(ctx, &mut tx, &mut obj).await?;
//! <primitive>(ctx, &mut tx, &mut obj).await?;
//! <after hook>(ctx, &mut tx, &mut obj).await?;
//! tx.commit().await?;
//! ```
//!
//! A `Tx` that is dropped without `commit` rolls back, so every `?` inside the block aborts the
//! whole unit.

use super::code::CodeWriter;
use super::model::{apply_payload, field_path, payload_type, plural_type, text_search_path};
use super::query::emit_spec;
use super::registry::{MethodSig, Param, StoreSig};
use crate::document::naming::{lc_first, shouty, snake};
use crate::document::{Action, HookKind, Model, ResolvedStore, Schema, StoreHook, StoreMethod};
use crate::error::{GenError, Result};
use crate::patch::Member;
use std::collections::BTreeSet;

/// Page size of the search-index migration routine.
pub const MIGRATE_PAGE_SIZE: u32 = 1000;

/// Aggregator struct in `wrap.rs`.
pub const WRAP_STRUCT: &str = "Wrap";
/// Aggregator constructor receiving the database handle.
pub const WRAP_CTOR: &str = "new_with_db";
/// Aggregator trait in `interfaces.rs`.
pub const STORAGE_TRAIT: &str = "Storage";

/// What the extension file already defines for a store implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtProbe {
    /// `new` is hand-written; the generated constructor is skipped
    pub has_new: bool,
    /// `strap` exists and is called by the generated constructor
    pub has_strap: bool,
}

/// Store phase output for one store.
#[derive(Debug, Clone)]
pub struct StoreOutput {
    pub sig: StoreSig,
    /// Members ensured in `<doc>_x.rs`, in insertion order
    pub ext_members: Vec<(Member, String)>,
}

fn model_of<'a>(schema: &'a Schema, method: &StoreMethod) -> Result<&'a Model> {
    let model = schema.model(&method.model).ok_or_else(|| {
        GenError::resolution(format!("method {} targets unknown model {}", method.name, method.model))
    })?;
    if !model.is_table() || super::model::id_path(model).is_none() {
        return Err(GenError::resolution(format!(
            "method {} targets {} which is not table-backed",
            method.name, model.name
        )));
    }
    Ok(model)
}

fn custom_ret(schema: &Schema, method: &StoreMethod, imports: &mut BTreeSet<String>) -> Result<String> {
    let mut rets = Vec::new();
    for v in method.rets.iter().filter(|v| v.ty != "error") {
        rets.push(schema.qualifier.rust_type(&v.ty, imports)?);
    }
    Ok(match rets.len() {
        0 => "()".to_string(),
        1 => rets.remove(0),
        _ => format!("({})", rets.join(", ")),
    })
}

/// Signature of one store method.
pub fn method_sig(
    schema: &Schema,
    method: &StoreMethod,
    imports: &mut BTreeSet<String>,
) -> Result<MethodSig> {
    let model = model_of(schema, method)?;
    let name = &model.name;
    let custom = !method.args.is_empty() || !method.rets.is_empty();
    let (params, ret) = if custom {
        let mut params = Vec::new();
        for v in &method.args {
            params.push(Param::new(&snake(&v.name), schema.qualifier.rust_type(&v.ty, imports)?));
        }
        (params, custom_ret(schema, method, imports)?)
    } else {
        let payload = || {
            payload_type(model).ok_or_else(|| {
                GenError::resolution(format!("method {}: {name} has no update payload", method.name))
            })
        };
        match method.action {
            Action::List => (
                vec![Param::new("spec", format!("{name}Spec"))],
                format!("({}, i64)", plural_type(model)),
            ),
            Action::Get => (vec![Param::new("id", "&str")], name.clone()),
            Action::Create => {
                if !model.has_basic() {
                    return Err(GenError::resolution(format!(
                        "method {}: {name} has no creation payload",
                        method.name
                    )));
                }
                (vec![Param::new("basic", format!("{name}Basic"))], name.clone())
            }
            Action::Update => (
                vec![Param::new("id", "&str"), Param::new("set", payload()?)],
                "()".to_string(),
            ),
            Action::Put => {
                let ret = if method.simple { "String".to_string() } else { name.clone() };
                (vec![Param::new("id", "&str"), Param::new("set", payload()?)], ret)
            }
            Action::Delete => (vec![Param::new("id", "&str")], "()".to_string()),
        }
    };
    Ok(MethodSig {
        name: method.name.clone(),
        func: method.fn_name(),
        action: method.action,
        model: name.clone(),
        params,
        ret,
        simple: method.simple,
        custom,
    })
}

/// Resolved signature of a store.
pub fn store_sig(
    schema: &Schema,
    store: &ResolvedStore,
    imports: &mut BTreeSet<String>,
) -> Result<StoreSig> {
    let methods = store
        .methods
        .iter()
        .map(|m| method_sig(schema, m, imports))
        .collect::<Result<Vec<_>>>()?;
    Ok(StoreSig {
        name: store.name.clone(),
        iname: store.iname.clone(),
        short_name: store.short_name.clone(),
        accessor: store.accessor_name(),
        impl_name: store.impl_name(),
        methods,
    })
}

/// Call of a hook, `?`-propagated. `rest` are the arguments after `ctx` (and after the
/// database handle for free functions that run outside a transaction).
fn hook_call(hook: &StoreHook, rest: &str) -> String {
    let f = hook.fn_name();
    match (hook.is_free_fn(), hook.kind.is_transactional()) {
        (true, true) => format!("{f}(ctx, {rest}).await?;"),
        (true, false) => format!("{f}(ctx, &self.db, {rest}).await?;"),
        (false, _) => format!("self.{f}(ctx, {rest}).await?;"),
    }
}

/// Parameters of a hook after `ctx`: (declaration, names).
fn hook_params(hook: &StoreHook, model: &Model) -> (String, Vec<&'static str>) {
    let name = &model.name;
    let (decl, names) = match hook.kind {
        k if k.is_transactional() => (format!("tx: &mut Tx, obj: &mut {name}"), vec!["tx", "obj"]),
        HookKind::BeforeList => (
            format!("spec: &{name}Spec, q: &mut pgx::SelectQuery"),
            vec!["spec", "q"],
        ),
        HookKind::AfterList => (
            format!("spec: &{name}Spec, data: &mut {}", plural_type(model)),
            vec!["spec", "data"],
        ),
        HookKind::ErrorLoad => (
            format!("id: &str, err: Error, obj: &mut {name}"),
            vec!["id", "err", "obj"],
        ),
        HookKind::AfterLoad => (format!("obj: &mut {name}"), vec!["obj"]),
        _ => (format!("obj: &{name}"), vec!["obj"]),
    };
    if hook.is_free_fn() && !hook.kind.is_transactional() {
        let mut all = vec!["db"];
        all.extend(names);
        (format!("db: &OrmDb, {decl}"), all)
    } else {
        (decl, names)
    }
}

fn emit_hook_body(w: &mut CodeWriter, hook: &StoreHook, model: &Model, names: &[&str]) {
    let table = format!("{}_TABLE", shouty(&model.name));
    match hook.kind {
        HookKind::UpsertEs => {
            w.block(format!("if let Err(err) = es_upsert(ctx, {table}, obj).await"), |w| {
                w.line(format!(
                    "tracing::info!(table = {table}, error = %err, \"upsert search doc failed\");"
                ));
            });
            w.line("Ok(())");
        }
        HookKind::DeleteEs => {
            w.block(
                format!("if let Err(err) = es_delete(ctx, {table}, &obj.id_string()).await"),
                |w| {
                    w.line(format!(
                        "tracing::info!(table = {table}, error = %err, \"delete search doc failed\");"
                    ));
                },
            );
            w.line("Ok(())");
        }
        HookKind::ErrorLoad => {
            w.line("let _ = (ctx, id, obj);");
            w.line("Err(err)");
        }
        _ => {
            let mut unused = vec!["ctx"];
            unused.extend(names.iter().copied());
            w.line(format!("let _ = ({});", unused.join(", ")));
            w.line("Ok(())");
        }
    }
}

/// Stub of one hook for the extension file.
pub fn hook_stub(hook: &StoreHook, model: &Model, impl_name: &str) -> (Member, String) {
    let f = hook.fn_name();
    let (params, names) = hook_params(hook, model);
    let mut w = CodeWriter::new();
    if hook.is_free_fn() {
        w.block(
            format!("pub async fn {f}(ctx: &Context, {params}) -> Result<()>"),
            |w| emit_hook_body(w, hook, model, &names),
        );
        (Member::FreeFn { func: f }, w.finish())
    } else {
        w.block(
            format!("pub async fn {f}(&self, ctx: &Context, {params}) -> Result<()>"),
            |w| emit_hook_body(w, hook, model, &names),
        );
        (
            Member::ImplFn {
                self_ty: impl_name.to_string(),
                trait_name: None,
                func: f,
            },
            w.finish(),
        )
    }
}

/// Emits one store: specs of its listed models, the trait, the implementation struct and the
/// trait implementation. Specs already in `specs_done` are skipped.
pub fn emit_store(
    w: &mut CodeWriter,
    schema: &Schema,
    store: &ResolvedStore,
    probe: ExtProbe,
    specs_done: &mut BTreeSet<String>,
    imports: &mut BTreeSet<String>,
) -> Result<StoreOutput> {
    let sig = store_sig(schema, store, imports)?;
    let iname = &store.iname;
    let impl_name = store.impl_name();

    for method in store.methods.iter().filter(|m| m.action == Action::List) {
        let model = model_of(schema, method)?;
        if specs_done.insert(model.name.clone()) {
            emit_spec(w, schema, model, imports)?;
        }
    }

    // trait
    w.line("#[async_trait]");
    let bounds = match &store.embed {
        Some(embed) => format!("Send + Sync + {embed}"),
        None => "Send + Sync".to_string(),
    };
    w.block(format!("pub trait {iname}: {bounds}"), |w| {
        let mut last_model: Option<&str> = None;
        for m in &sig.methods {
            if last_model.is_some_and(|l| l != m.model) {
                w.blank();
            }
            last_model = Some(&m.model);
            w.line(format!("{};", m.declaration()));
        }
    });
    w.blank();

    // implementation struct
    w.block(format!("pub struct {impl_name}"), |w| {
        w.line("pub db: OrmDb,");
    });
    w.blank();

    let es_models: Vec<&Model> = store
        .models()
        .into_iter()
        .filter_map(|n| schema.model(n))
        .filter(|m| schema.hooks(&m.name).has(HookKind::UpsertEs))
        .filter(|m| store.has(Action::List, &m.name))
        .collect();
    if !probe.has_new || !es_models.is_empty() {
        w.block(format!("impl {impl_name}"), |w| {
            let mut first = true;
            if !probe.has_new {
                first = false;
                w.block("pub fn new(db: OrmDb) -> Self", |w| {
                    if probe.has_strap {
                        w.line("let mut s = Self { db };");
                        w.line("s.strap();");
                        w.line("s");
                    } else {
                        w.line("Self { db }");
                    }
                });
            }
            for model in &es_models {
                if !first {
                    w.blank();
                }
                first = false;
                emit_migrate(w, schema, model);
            }
        });
        w.blank();
    }

    // trait implementation
    let models = store
        .methods
        .iter()
        .map(|m| model_of(schema, m))
        .collect::<Result<Vec<_>>>()?;
    w.line("#[async_trait]");
    w.block(format!("impl {iname} for {impl_name}"), |w| {
        for (i, (model, msig)) in models.iter().zip(&sig.methods).enumerate() {
            if i > 0 {
                w.blank();
            }
            w.block(msig.declaration(), |w| {
                emit_method(w, schema, model, msig, imports);
            });
        }
    });
    w.blank();

    let ext_members = ext_members(schema, store, &sig)?;
    tracing::debug!(store = %store.name, methods = sig.methods.len(), "store emitted");
    Ok(StoreOutput { sig, ext_members })
}

/// `migrate_es_<model>`: re-indexes every row, newest first.
fn emit_migrate(w: &mut CodeWriter, schema: &Schema, model: &Model) {
    let name = &model.name;
    let Some(upsert) = schema.hooks(name).get(HookKind::UpsertEs) else {
        return;
    };
    w.doc(&format!(
        "Re-indexes every {name} in pages of {MIGRATE_PAGE_SIZE}, stopping at the first failure."
    ));
    w.block(
        format!("pub async fn migrate_es_{}(&self, ctx: &Context) -> Result<()>", snake(name)),
        |w| {
            w.line(format!("let mut spec = {name}Spec::default();"));
            w.line(format!("spec.page.limit = {MIGRATE_PAGE_SIZE};"));
            w.line("spec.page.page = 1;");
            w.line("spec.page.sort = \"created desc\".to_string();");
            w.block("loop", |w| {
                w.open(format!(
                    "let data = match query_list::<{name}, _>(ctx, &self.db, &spec).await {{"
                ));
                w.line("Ok((data, _)) => data,");
                w.line("Err(err) if err.is_no_rows() => break,");
                w.line("Err(err) => return Err(err),");
                w.close("};");
                w.block("if data.is_empty()", |w| {
                    w.line("break;");
                });
                w.block("for obj in &data", |w| {
                    w.line(hook_call(upsert, "obj"));
                });
                w.line("spec.page.page += 1;");
            });
            w.line("Ok(())");
        },
    );
}

/// `let mut tx = ...` ... `tx.commit()` around `inner` when `wrap` is set; `inner` receives the
/// executor expression to pass to persistence primitives.
fn in_tx(w: &mut CodeWriter, wrap: bool, inner: impl FnOnce(&mut CodeWriter, &str)) {
    if wrap {
        w.line("let mut tx = self.db.begin(ctx).await?;");
        inner(w, "&mut tx");
        w.line("tx.commit().await?;");
    } else {
        inner(w, "&self.db");
    }
}

fn ts_columns_literal(cols: &[String]) -> String {
    let quoted: Vec<String> = cols.iter().map(|c| format!("\"{c}\"")).collect();
    format!("&[{}]", quoted.join(", "))
}

/// Sets the text-search configuration and columns on `obj` when a configuration is present.
fn emit_ts_columns(w: &mut CodeWriter, model: &Model, obj: &str, mark_change: bool) {
    let (Some(cols), Some(ts)) = (model.text_search_columns(), text_search_path(model)) else {
        return;
    };
    w.open("if let Some(cfg) = self.db.ts_config() {");
    w.line(format!("{obj}.{ts}.ts_cfg_name = cfg;"));
    w.line(format!("{obj}.{ts}.set_ts_columns({});", ts_columns_literal(&cols)));
    if mark_change {
        w.reopen("} else {");
        w.line(format!("{obj}.{ts}.ts_cfg_name.clear();"));
    }
    w.close("}");
    if mark_change && model.has_set() {
        w.line(format!("{obj}.changes.mark(\"ts_cfg\");"));
    }
}

fn emit_method(
    w: &mut CodeWriter,
    schema: &Schema,
    model: &Model,
    sig: &MethodSig,
    imports: &mut BTreeSet<String>,
) {
    if sig.custom {
        let args: Vec<&str> = sig.params.iter().map(|p| p.name.as_str()).collect();
        let mut call = String::from("ctx");
        for a in args {
            call.push_str(", ");
            call.push_str(a);
        }
        w.line(format!("self.{}_x({call}).await", sig.func));
        return;
    }
    match sig.action {
        Action::List => emit_list(w, schema, model),
        Action::Get => emit_get(w, schema, model, imports),
        Action::Create => emit_create(w, schema, model),
        Action::Update => emit_update(w, schema, model),
        Action::Put => emit_put(w, schema, model, sig.simple),
        Action::Delete => emit_delete(w, schema, model),
    }
}

fn emit_list(w: &mut CodeWriter, schema: &Schema, model: &Model) {
    let name = &model.name;
    let hooks = schema.hooks(name);
    if let Some(cols) = model.text_search_columns() {
        w.line("let mut spec = spec;");
        w.line("spec.text_search.set_ts_config(self.db.ts_config());");
        w.line(format!(
            "spec.text_search.set_ts_fallback({});",
            ts_columns_literal(&cols)
        ));
    }
    let after = hooks.get(HookKind::AfterList);
    let data = if after.is_some() { "mut data" } else { "data" };
    match hooks.get(HookKind::BeforeList) {
        Some(before) => {
            w.line(format!("let mut q = new_query::<{name}>(&self.db);"));
            w.line(hook_call(before, "&spec, &mut q"));
            w.line(format!(
                "let ({data}, total) = query_pager::<{name}, _>(ctx, &self.db, &spec, q).await?;"
            ));
        }
        None => {
            w.line(format!(
                "let ({data}, total) = query_list::<{name}, _>(ctx, &self.db, &spec).await?;"
            ));
        }
    }
    if let Some(after) = after {
        w.block("if !data.is_empty()", |w| {
            w.line(hook_call(after, "&spec, &mut data"));
        });
    }
    w.line("Ok((data, total))");
}

fn emit_get(w: &mut CodeWriter, schema: &Schema, model: &Model, imports: &mut BTreeSet<String>) {
    let name = &model.name;
    let hooks = schema.hooks(name);
    let after_load = hooks.get(HookKind::AfterLoad);
    let rels = if after_load.is_some() { Vec::new() } else { model.rel_has_one() };
    let binding = if after_load.is_some() || !rels.is_empty() {
        "let mut obj"
    } else {
        "let obj"
    };

    let load = format!("db_get::<{name}>(ctx, &self.db, id).await");
    let res = match model.unique_one() {
        Some((_, column)) => {
            w.open(format!(
                "let res = match db_get_by::<{name}>(ctx, &self.db, \"{column}\", id).await {{"
            ));
            w.line("Ok(obj) => Ok(obj),");
            w.line(format!("Err(_) => {load},"));
            w.close("};");
            "res".to_string()
        }
        None => load,
    };

    match hooks.get(HookKind::ErrorLoad) {
        Some(on_error) => {
            w.open(format!("{binding} = match {res} {{"));
            w.line("Ok(obj) => obj,");
            w.open("Err(err) => {");
            w.line(format!("let mut obj = {name}::default();"));
            w.line(hook_call(on_error, "id, err, &mut obj"));
            w.line("obj");
            w.close("}");
            w.close("};");
        }
        None => {
            w.line(format!("{binding} = {res}?;"));
        }
    }

    if let Some(after_load) = after_load {
        w.line(hook_call(after_load, "&mut obj"));
    } else if !rels.is_empty() {
        w.block("for rel in rels_from_context(ctx)", |w| {
            for rel in &rels {
                let Some(fk) = model.fields.iter().find(|f| f.name == format!("{}ID", rel.name)) else {
                    continue;
                };
                let fk_path = field_path(model, fk);
                let present = if fk.is_oid() {
                    format!("!obj.{fk_path}.is_zero()")
                } else {
                    imports.insert("utils".to_string());
                    format!("!utils::is_zero(&obj.{fk_path})")
                };
                let target = rel.ty.trim_start_matches('*').replace('.', "::");
                let rel_path = field_path(model, rel);
                w.block(format!("if rel == \"{}\" && {present}", rel.name), |w| {
                    w.block(
                        format!(
                            "if let Ok(ro) = db_get::<{target}>(ctx, &self.db, &obj.{fk_path}.to_string()).await"
                        ),
                        |w| {
                            w.line(format!("obj.{rel_path} = Some(ro);"));
                        },
                    );
                });
            }
        });
    }
    w.line("Ok(obj)");
}

/// Fills the meta mixin of `obj` from the request context before it is written.
fn emit_meta_op(w: &mut CodeWriter, model: &Model, exec: &str, obj: &str) {
    if model.has_meta() {
        w.line(format!("db_op_model_meta(ctx, {exec}, &mut {obj}).await?;"));
    }
}

fn emit_create(w: &mut CodeWriter, schema: &Schema, model: &Model) {
    let name = &model.name;
    let hooks = schema.hooks(name);
    let before = hooks.first_of(HookKind::BeforeCreating, HookKind::BeforeSaving);
    let after = hooks.first_of(HookKind::AfterCreating, HookKind::AfterSaving);
    let unique = model.unique_one();

    w.line(format!("let mut obj = {name}::with_basic(basic);"));
    if let Some((field, _)) = &unique {
        w.block(format!("if obj.{}.is_empty()", field_path(model, field)), |w| {
            w.line("return Err(Error::EmptyKey);");
        });
    }
    if model.mod_hook().0 {
        w.line("obj.creating()?;");
    }
    emit_ts_columns(w, model, "obj", false);
    in_tx(w, before.is_some() || after.is_some(), |w, exec| {
        if let Some(before) = before {
            w.line(hook_call(before, &format!("{exec}, &mut obj")));
        }
        emit_meta_op(w, model, exec, "obj");
        match (&unique, model.force_create) {
            (Some((_, column)), _) => w.line(format!(
                "db_insert_unique(ctx, {exec}, &mut obj, \"{column}\").await?;"
            )),
            (None, true) => w.line(format!("db_insert_force(ctx, {exec}, &mut obj).await?;")),
            (None, false) => w.line(format!("db_insert(ctx, {exec}, &mut obj).await?;")),
        };
        if let Some(after) = after {
            w.line(hook_call(after, &format!("{exec}, &mut obj")));
        }
    });
    if let Some(created) = hooks.get(HookKind::AfterCreated) {
        w.line(hook_call(created, "&obj"));
    }
    if let Some(upsert) = hooks.get(HookKind::UpsertEs) {
        w.line(hook_call(upsert, "&obj"));
    }
    w.line("Ok(obj)");
}

fn emit_update(w: &mut CodeWriter, schema: &Schema, model: &Model) {
    let name = &model.name;
    let hooks = schema.hooks(name);
    let before = hooks.first_of(HookKind::BeforeUpdating, HookKind::BeforeSaving);
    let after = hooks.first_of(HookKind::AfterUpdating, HookKind::AfterSaving);

    w.line(format!("let mut exist = db_get::<{name}>(ctx, &self.db, id).await?;"));
    w.line(apply_payload(model, "exist", "set"));
    emit_ts_columns(w, model, "exist", true);
    in_tx(w, before.is_some() || after.is_some(), |w, exec| {
        if let Some(before) = before {
            w.line(hook_call(before, &format!("{exec}, &mut exist")));
        }
        emit_meta_op(w, model, exec, "exist");
        w.line(format!("db_update(ctx, {exec}, &mut exist).await?;"));
        if let Some(after) = after {
            w.line(hook_call(after, &format!("{exec}, &mut exist")));
        }
    });
    if let Some(updated) = hooks.get(HookKind::AfterUpdated) {
        w.line(hook_call(updated, "&exist"));
    }
    if let Some(upsert) = hooks.get(HookKind::UpsertEs) {
        w.line(hook_call(upsert, "&exist"));
    }
    w.line("Ok(())");
}

fn emit_put(w: &mut CodeWriter, schema: &Schema, model: &Model, simple: bool) {
    let name = &model.name;
    let hooks = schema.hooks(name);
    let before = hooks.get(HookKind::BeforeSaving);
    let after = hooks.get(HookKind::AfterSaving);
    let wrap = before.is_some() || after.is_some();

    if simple {
        w.line(format!("let mut obj = {name}::default();"));
        w.block("if !id.is_empty()", |w| {
            w.line("obj.set_id_str(id)?;");
        });
        w.line(apply_payload(model, "obj", "set"));
        in_tx(w, wrap, |w, exec| {
            if let Some(before) = before {
                w.line(hook_call(before, &format!("{exec}, &mut obj")));
            }
            emit_meta_op(w, model, exec, "obj");
            w.line(format!("db_upsert(ctx, {exec}, &mut obj).await?;"));
            if let Some(after) = after {
                w.line(hook_call(after, &format!("{exec}, &mut obj")));
            }
        });
        if let Some(upsert) = hooks.get(HookKind::UpsertEs) {
            w.line(hook_call(upsert, "&obj"));
        }
        w.line("Ok(obj.id_string())");
        return;
    }

    // keyed by the unique column when the payload carries it
    let unique = model
        .unique_one()
        .filter(|(f, _)| model.has_set() && f.is_set && !f.is_embed());
    match &unique {
        Some((field, column)) => {
            let member = field.rust_name();
            w.line(format!("let key = set.{member}.clone().unwrap_or_default();"));
            w.block("if key.is_empty()", |w| {
                w.line(format!(
                    "return Err(Error::invalid(\"need {}\"));",
                    lc_first(&field.name)
                ));
            });
            w.line(format!(
                "let (key, column) = if id.is_empty() {{ (key.as_str(), \"{column}\") }} else {{ (id, \"id\") }};"
            ));
        }
        None => {
            w.line("let (key, column) = (id, \"id\");");
        }
    }
    let apply = apply_payload(model, "obj", "set.clone()");
    let binding = if after.is_some() { "let mut obj" } else { "let obj" };
    in_tx(w, wrap, |w, exec| {
        if let Some(before) = before {
            w.line(format!("let mut pre = {name}::default();"));
            w.block("if !id.is_empty()", |w| {
                w.line("pre.set_id_str(id)?;");
            });
            w.line(apply_payload(model, "pre", "set.clone()"));
            w.line(hook_call(before, &format!("{exec}, &mut pre")));
        }
        w.line(format!(
            "{binding} = db_store_with(ctx, {exec}, key, column, |obj: &mut {name}| {{ {apply} }}).await?;"
        ));
        if let Some(after) = after {
            w.line(hook_call(after, &format!("{exec}, &mut obj")));
        }
    });
    if let Some(upsert) = hooks.get(HookKind::UpsertEs) {
        w.line(hook_call(upsert, "&obj"));
    }
    w.line("Ok(obj)");
}

fn emit_delete(w: &mut CodeWriter, schema: &Schema, model: &Model) {
    let name = &model.name;
    let hooks = schema.hooks(name);
    let before = hooks.get(HookKind::BeforeDeleting);
    let after = hooks.get(HookKind::AfterDeleting);
    let deleted = hooks.get(HookKind::AfterDeleted);
    let delete_es = hooks.get(HookKind::DeleteEs);
    let table = format!("{}_TABLE", shouty(name));

    if before.is_none() && after.is_none() && deleted.is_none() && delete_es.is_none() {
        w.line(format!("db_delete::<{name}>(ctx, &self.db, id).await?;"));
        w.line("Ok(())");
        return;
    }

    let binding = if before.is_some() || after.is_some() { "let mut obj" } else { "let obj" };
    w.line(format!("{binding} = db_get::<{name}>(ctx, &self.db, id).await?;"));
    in_tx(w, before.is_some() || after.is_some(), |w, exec| {
        if let Some(before) = before {
            w.line(hook_call(before, &format!("{exec}, &mut obj")));
        }
        w.line(format!(
            "db_delete_t(ctx, {exec}, {table}, &obj.id_string()).await?;"
        ));
        if let Some(after) = after {
            w.line(hook_call(after, &format!("{exec}, &mut obj")));
        }
    });
    if let Some(deleted) = deleted {
        w.line(hook_call(deleted, "&obj"));
    }
    if let Some(delete_es) = delete_es {
        w.line(hook_call(delete_es, "&obj"));
    }
    w.line("Ok(())");
}

/// Members the extension file must define for `store`: the embedded trait and its impl,
/// hand-written bodies of custom methods, then one stub per hook of every model the store
/// touches.
fn ext_members(schema: &Schema, store: &ResolvedStore, sig: &StoreSig) -> Result<Vec<(Member, String)>> {
    let impl_name = store.impl_name();
    let mut out = Vec::new();
    if let Some(embed) = &store.embed {
        out.push((
            Member::Trait { name: embed.clone() },
            format!("#[async_trait]\npub trait {embed}: Send + Sync {{}}\n"),
        ));
        out.push((
            Member::ImplBlock {
                self_ty: impl_name.clone(),
                trait_name: embed.clone(),
            },
            format!("#[async_trait]\nimpl {embed} for {impl_name} {{}}\n"),
        ));
    }
    for m in sig.methods.iter().filter(|m| m.custom) {
        let func = format!("{}_x", m.func);
        let mut params = String::from("&self, ctx: &Context");
        let mut names = vec!["ctx".to_string()];
        for p in &m.params {
            params.push_str(&format!(", {}: {}", p.name, p.ty));
            names.push(p.name.clone());
        }
        let mut w = CodeWriter::new();
        w.block(format!("pub async fn {func}({params}) -> Result<{}>", m.ret), |w| {
            w.line(format!("let _ = ({});", names.join(", ")));
            w.line(format!("todo!(\"{}\")", m.func));
        });
        out.push((
            Member::ImplFn {
                self_ty: impl_name.clone(),
                trait_name: None,
                func,
            },
            w.finish(),
        ));
    }
    let mut seen = BTreeSet::new();
    for model_name in store.models() {
        let model = schema
            .model(model_name)
            .ok_or_else(|| GenError::resolution(format!("unknown model {model_name}")))?;
        for hook in schema.hooks(model_name).iter() {
            let lists = store.has(Action::List, model_name);
            if matches!(hook.kind, HookKind::BeforeList | HookKind::AfterList) && !lists {
                continue;
            }
            if seen.insert(hook.fn_name()) {
                out.push(hook_stub(hook, model, &impl_name));
            }
        }
    }
    Ok(out)
}

/// Members ensured in `wrap.rs` for `store`, whose generated code lives in module `gen_mod`.
pub fn wrap_members(store: &ResolvedStore, gen_mod: &str) -> Vec<(Member, String)> {
    let field = store.field_name();
    let accessor = store.accessor_name();
    let impl_name = store.impl_name();
    let iname = &store.iname;
    vec![
        (
            Member::StructField {
                strukt: WRAP_STRUCT.to_string(),
                field: field.clone(),
            },
            format!("{field}: {gen_mod}::{impl_name},"),
        ),
        (
            Member::LetStmt {
                func: WRAP_CTOR.to_string(),
                binding: field.clone(),
            },
            format!("let {field} = {gen_mod}::{impl_name}::new(db.clone());"),
        ),
        (
            Member::LiteralField {
                func: WRAP_CTOR.to_string(),
                field: field.clone(),
            },
            field.clone(),
        ),
        (
            Member::ImplFn {
                self_ty: WRAP_STRUCT.to_string(),
                trait_name: Some(STORAGE_TRAIT.to_string()),
                func: accessor.clone(),
            },
            format!("fn {accessor}(&self) -> &dyn {gen_mod}::{iname} {{\n    &self.{field}\n}}\n"),
        ),
    ]
}

/// Members ensured in `interfaces.rs` for `store`.
pub fn interface_members(store: &ResolvedStore, gen_mod: &str) -> Vec<(Member, String)> {
    let accessor = store.accessor_name();
    vec![(
        Member::TraitFn {
            trait_name: STORAGE_TRAIT.to_string(),
            func: accessor.clone(),
        },
        format!("fn {accessor}(&self) -> &dyn {gen_mod}::{};", store.iname),
    )]
}
