//! Model emission: table constants, the entity struct, its `Basic` (creation) and `Set`
//! (partial update) companions, the `creating` hook and the update applier.

use super::code::CodeWriter;
use crate::document::naming::{lc_first, shouty, snake};
use crate::document::{Field, Model, Schema, MODEL_DEFAULT};
use crate::error::Result;
use std::collections::BTreeSet;

/// `comm.DefaultModel` → `default_model`
pub fn embed_name(field: &Field) -> String {
    let ty = field.type_name().trim_start_matches('*');
    let last = ty
        .rsplit(['.', ':'])
        .next()
        .unwrap_or(ty);
    snake(last)
}

/// Rust member name of a field or mixin.
pub fn member_name(field: &Field) -> String {
    if field.is_embed() {
        embed_name(field)
    } else {
        field.rust_name()
    }
}

/// Fields carried by the `Basic` companion.
pub fn in_basic(field: &Field) -> bool {
    field.is_basic || (field.is_set && !field.is_embed())
}

/// Access path of a field from `self`/`obj`: `basic.title`, `default_model`.
pub fn field_path(model: &Model, field: &Field) -> String {
    if model.has_basic() && in_basic(field) {
        format!("basic.{}", member_name(field))
    } else {
        member_name(field)
    }
}

/// Mixin carrying the primary key, with its path.
pub fn id_path(model: &Model) -> Option<String> {
    let (_, id, _) = model.mod_hook();
    let id = id?;
    model
        .fields
        .iter()
        .find(|f| f.is_embed() && f.type_name().ends_with(id))
        .map(|f| field_path(model, f))
}

/// Mixin carrying the created/updated timestamps, with its path.
pub fn date_path(model: &Model) -> Option<String> {
    let (_, _, date) = model.mod_hook();
    let date = date?;
    model
        .fields
        .iter()
        .find(|f| f.is_embed() && f.type_name().ends_with(date))
        .map(|f| field_path(model, f))
}

fn mixin_path(model: &Model, pred: fn(&Field) -> bool) -> Option<String> {
    model
        .fields
        .iter()
        .find(|f| pred(f))
        .map(|f| field_path(model, f))
}

pub fn meta_path(model: &Model) -> Option<String> {
    mixin_path(model, Field::is_meta)
}

pub fn owner_path(model: &Model) -> Option<String> {
    mixin_path(model, Field::is_owner)
}

pub fn text_search_path(model: &Model) -> Option<String> {
    mixin_path(model, Field::is_text_search)
}

/// `Articles`, or `ArticleList` when the plural equals the name.
pub fn plural_type(model: &Model) -> String {
    let plural = model.plural_name();
    if plural == model.name {
        format!("{}List", model.name)
    } else {
        plural
    }
}

/// Id category used by `oid::new_id`; only models with an `oidcat` or an `oidKey` carry one.
pub fn oid_cat(model: &Model) -> Option<String> {
    if !model.oid_cat.is_empty() {
        Some(model.oid_cat.clone())
    } else if model.oid_key.len() >= 2 {
        Some("default".to_string())
    } else {
        None
    }
}

/// Category for id minting: set, and backed by a `DefaultModel` or `IDField` mixin.
fn mint_cat(model: &Model) -> Option<String> {
    let (_, idf, _) = model.mod_hook();
    if matches!(idf, Some(MODEL_DEFAULT) | Some("IDField")) {
        oid_cat(model)
    } else {
        None
    }
}

/// Payload type accepted by Update/Put: the `Set` companion, or `Basic` without one.
pub fn payload_type(model: &Model) -> Option<String> {
    if model.has_set() {
        Some(format!("{}Set", model.name))
    } else if model.has_basic() {
        Some(format!("{}Basic", model.name))
    } else {
        None
    }
}

/// Statement applying `payload` to `obj`.
pub fn apply_payload(model: &Model, obj: &str, payload: &str) -> String {
    if model.has_set() {
        format!("{obj}.set_with({payload});")
    } else {
        format!("{obj}.basic = {payload};")
    }
}

fn field_type(schema: &Schema, field: &Field, imports: &mut BTreeSet<String>) -> Result<String> {
    if !field.qual.is_empty() {
        let last = field.type_name().rsplit(['.', ':']).next().unwrap_or_default();
        return Ok(format!("{}::{last}", field.qual.replace(['/', '.'], "::")));
    }
    schema.qualifier.rust_type(field.type_name(), imports)
}

fn serde_attr(field: &Field, imports: &mut BTreeSet<String>) -> Option<String> {
    if field.is_embed() {
        return Some("#[serde(flatten)]".to_string());
    }
    if field.json_skipped() {
        return Some("#[serde(skip)]".to_string());
    }
    let mut opts = Vec::new();
    let json = field.json_name();
    if !json.is_empty() && json != field.rust_name() {
        opts.push(format!("rename = \"{json}\""));
    }
    if field.tags.get("json").is_some_and(|j| j.contains("omitempty")) {
        imports.insert("utils".to_string());
        opts.push("default".to_string());
        opts.push("skip_serializing_if = \"utils::is_zero\"".to_string());
    }
    (!opts.is_empty()).then(|| format!("#[serde({})]", opts.join(", ")))
}

fn emit_field(
    w: &mut CodeWriter,
    schema: &Schema,
    field: &Field,
    imports: &mut BTreeSet<String>,
) -> Result<()> {
    let ty = field_type(schema, field, imports)?;
    let comment = if field.comment.is_empty() {
        &field.descr
    } else {
        &field.comment
    };
    w.doc(comment);
    if let Some(attr) = serde_attr(field, imports) {
        w.line(attr);
    }
    if !field.is_embed() {
        if let Some(tag) = ["db", "pg", "bun"].iter().find_map(|k| field.tags.get(*k)) {
            w.line(format!("#[pgx(\"{tag}\")]"));
        }
    }
    w.line(format!("pub {}: {ty},", member_name(field)));
    Ok(())
}

/// Writes everything of one model except its query spec.
pub fn emit_model(
    w: &mut CodeWriter,
    schema: &Schema,
    model: &Model,
    imports: &mut BTreeSet<String>,
) -> Result<()> {
    let name = &model.name;
    let up = shouty(name);
    let table = model.is_table();
    let (has_hook, _, _) = model.mod_hook();

    if table {
        w.line(format!("pub const {up}_TABLE: &str = \"{}\";", model.table_name()));
        w.line(format!("pub const {up}_ALIAS: &str = \"{}\";", model.table_alias()));
        w.line(format!("pub const {up}_LABEL: &str = \"{}\";", model.label_name()));
        if let Some(cat) = mint_cat(model).filter(|_| has_hook) {
            w.line(format!("pub const {up}_OID_CAT: &str = \"{cat}\";"));
        }
        w.blank();
    }

    // main struct
    if model.comment.is_empty() {
        w.doc(&format!("{name} model"));
    } else {
        w.doc(&model.comment);
    }
    if table {
        imports.insert("pgx".to_string());
        w.line("#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, pgx::Table)]");
        let mut opts = vec![
            format!("table = \"{}\"", model.table_name()),
            format!("alias = \"{}\"", model.table_alias()),
        ];
        if model.discard_unknown {
            opts.push("discard_unknown".to_string());
        }
        w.line(format!("#[pgx({})]", opts.join(", ")));
    } else {
        w.line("#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]");
    }
    let leading = model.fields.iter().take_while(|f| f.is_embed() && !in_basic(f)).count();
    let has_basic = model.has_basic();
    let mut err = Ok(());
    w.block(format!("pub struct {name}"), |w| {
        for (i, field) in model.fields.iter().enumerate() {
            if i == leading && has_basic {
                w.line("#[serde(flatten)]");
                w.line(format!("pub basic: {name}Basic,"));
            }
            if has_basic && in_basic(field) {
                continue;
            }
            if let Err(e) = emit_field(w, schema, field, imports) {
                err = Err(e);
            }
        }
        if leading == model.fields.len() && has_basic {
            w.line("#[serde(flatten)]");
            w.line(format!("pub basic: {name}Basic,"));
        }
        if model.has_set() {
            imports.insert("comm".to_string());
            w.line("#[serde(skip)]");
            w.line("pub changes: comm::Changes,");
        }
    });
    err?;
    w.blank();
    w.line(format!("pub type {} = Vec<{name}>;", plural_type(model)));
    w.blank();

    if has_basic {
        w.doc(&format!("Creation payload of {name}."));
        w.line("#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]");
        let mut err = Ok(());
        w.block(format!("pub struct {name}Basic"), |w| {
            for field in model.fields.iter().filter(|f| in_basic(f)) {
                if let Err(e) = emit_field(w, schema, field, imports) {
                    err = Err(e);
                }
            }
        });
        err?;
        w.blank();
    }

    emit_impl(w, model, imports);

    if table {
        imports.insert("comm".to_string());
        w.block(format!("impl comm::ModelIdentity for {name}"), |w| {
            w.block("fn identity_table(&self) -> &'static str", |w| {
                w.line(format!("{up}_TABLE"));
            });
            w.blank();
            w.block("fn identity_alias(&self) -> &'static str", |w| {
                w.line(format!("{up}_ALIAS"));
            });
            w.blank();
            w.block("fn identity_label(&self) -> &'static str", |w| {
                w.line(format!("{up}_LABEL"));
            });
        });
        w.blank();
    }

    if model.has_set() {
        emit_set(w, schema, model, imports)?;
    }
    tracing::debug!(model = %name, table, "model emitted");
    Ok(())
}

fn emit_impl(w: &mut CodeWriter, model: &Model, imports: &mut BTreeSet<String>) {
    let name = &model.name;
    let up = shouty(name);
    let (has_hook, _, _) = model.mod_hook();
    let id = id_path(model);
    let date = date_path(model);
    let meta = meta_path(model);
    if !model.has_basic() && !(model.is_table() && id.is_some()) && meta.is_none() {
        return;
    }

    w.block(format!("impl {name}"), |w| {
        let mut first = true;
        let mut sep = |w: &mut CodeWriter| {
            if !first {
                w.blank();
            }
            first = false;
        };
        if model.has_basic() {
            sep(w);
            w.block(format!("pub fn with_basic(basic: {name}Basic) -> Self"), |w| {
                w.block("Self", |w| {
                    w.line("basic,");
                    w.line("..Default::default()");
                });
            });
        }
        if let (true, Some(id)) = (model.is_table(), &id) {
            imports.insert("oid".to_string());
            imports.insert("comm".to_string());
            sep(w);
            w.block("pub fn with_id(id: oid::OID) -> Self", |w| {
                w.line("let mut obj = Self::default();");
                w.line(format!("obj.{id}.id = id;"));
                w.line("obj");
            });
            sep(w);
            w.block("pub fn id_string(&self) -> String", |w| {
                w.line(format!("self.{id}.id.to_string()"));
            });
            sep(w);
            w.doc("Sets the primary key from its string form.");
            w.block("pub fn set_id_str(&mut self, id: &str) -> Result<(), comm::Error>", |w| {
                w.line(format!("self.{id}.id = oid::check_id(id)?;"));
                w.line("Ok(())");
            });
        }
        if has_hook && model.is_table() {
            if let Some(id) = &id {
                imports.insert("comm".to_string());
                sep(w);
                let cat = mint_cat(model);
                if cat.is_some() {
                    w.doc("Assigns a new identifier of the model's category when the key is zero.");
                } else {
                    w.doc("Rejects a zero key: the model has no id category to mint from.");
                }
                w.block("pub fn creating(&mut self) -> Result<(), comm::Error>", |w| {
                    w.block(format!("if self.{id}.id.is_zero()"), |w| {
                        if cat.is_none() {
                            w.line("return Err(comm::Error::EmptyId);");
                        } else if model.oid_key.is_empty() {
                            w.line(format!(
                                "self.{id}.id = oid::new_id({up}_OID_CAT).ok_or(comm::Error::EmptyId)?;"
                            ));
                        } else {
                            w.line(format!("self.{id}.id = oid::new_with_code({up}_LABEL)"));
                            w.line(format!("    .or_else(|| oid::new_id({up}_OID_CAT))"));
                            w.line("    .ok_or(comm::Error::EmptyId)?;");
                        }
                    });
                    match &date {
                        Some(date) => w.line(format!("self.{date}.creating()")),
                        None => w.line("Ok(())"),
                    };
                });
            }
        }
        if let Some(meta) = &meta {
            sep(w);
            w.block(
                "pub fn meta_add_kvs(&mut self, args: &[(&str, serde_json::Value)]) -> &mut Self",
                |w| {
                    w.line(format!("self.{meta}.meta.add_kvs(args);"));
                    w.line("self");
                },
            );
        }
    });
    w.blank();
}

/// Members of the `Set` companion: (field, set member, set type, column).
struct SetMember<'a> {
    field: Option<&'a Field>,
    member: String,
    ty: String,
    column: String,
    kind: SetKind,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SetKind {
    Plain,
    Oid,
    Enum,
    Merge,
    Meta,
    Owner,
    Created,
}

fn set_members<'a>(
    schema: &Schema,
    model: &'a Model,
    imports: &mut BTreeSet<String>,
) -> Result<Vec<SetMember<'a>>> {
    let mut out = Vec::new();
    for field in &model.fields {
        if field.is_meta() {
            imports.insert("comm".to_string());
            out.push(SetMember {
                field: None,
                member: "meta".to_string(),
                ty: "comm::Meta".to_string(),
                column: "meta".to_string(),
                kind: SetKind::Meta,
            });
            continue;
        }
        if field.is_owner() {
            imports.insert("oid".to_string());
            out.push(SetMember {
                field: None,
                member: "owner_id".to_string(),
                ty: "String".to_string(),
                column: "owner_id".to_string(),
                kind: SetKind::Owner,
            });
            continue;
        }
        if !field.is_set || field.is_embed() {
            continue;
        }
        let column = field
            .column()
            .map(|c| c.name)
            .unwrap_or_else(|| field.rust_name());
        let (ty, kind) = if field.is_oid() {
            imports.insert("oid".to_string());
            ("String".to_string(), SetKind::Oid)
        } else if let Some(e) = schema.enum_def(&field.ty) {
            (super::enums::repr_type(e, &schema.qualifier)?, SetKind::Enum)
        } else if field.change_with {
            (field_type(schema, field, imports)?, SetKind::Merge)
        } else {
            (field_type(schema, field, imports)?, SetKind::Plain)
        };
        out.push(SetMember {
            field: Some(field),
            member: field.rust_name(),
            ty,
            column,
            kind,
        });
    }
    if model.with_created_set {
        imports.insert("comm".to_string());
        out.push(SetMember {
            field: None,
            member: "created".to_string(),
            ty: "comm::DateTime".to_string(),
            column: "created".to_string(),
            kind: SetKind::Created,
        });
    }
    Ok(out)
}

fn emit_set(
    w: &mut CodeWriter,
    schema: &Schema,
    model: &Model,
    imports: &mut BTreeSet<String>,
) -> Result<()> {
    let name = &model.name;
    let members = set_members(schema, model, imports)?;

    w.doc(&format!("Partial update of {name}; unset members stay untouched."));
    w.line("#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]");
    w.block(format!("pub struct {name}Set"), |w| {
        for m in &members {
            if let Some(f) = m.field {
                w.doc(&f.comment);
            }
            let json = m
                .field
                .map(|f| f.json_name())
                .unwrap_or_else(|| lc_first(&m.member));
            let mut opts = vec!["default".to_string()];
            if json != m.member {
                opts.insert(0, format!("rename = \"{json}\""));
            }
            opts.push("skip_serializing_if = \"Option::is_none\"".to_string());
            w.line(format!("#[serde({})]", opts.join(", ")));
            w.line(format!("pub {}: Option<{}>,", m.member, m.ty));
        }
    });
    w.blank();

    let log = !model.disable_log;
    w.block(format!("impl {name}"), |w| {
        w.doc("Applies every member set in `o` and marks its column dirty.");
        w.block(format!("pub fn set_with(&mut self, o: {name}Set)"), |w| {
            for m in &members {
                let col = &m.column;
                let target = match (m.kind, m.field) {
                    (SetKind::Meta, _) => meta_path(model).map(|p| format!("{p}.meta")),
                    (SetKind::Owner, _) => owner_path(model).map(|p| format!("{p}.owner_id")),
                    (SetKind::Created, _) => date_path(model).map(|p| format!("{p}.created")),
                    (_, Some(f)) => Some(field_path(model, f)),
                    (_, None) => None,
                };
                let Some(target) = target else { continue };
                let assign = |w: &mut CodeWriter, value: &str| {
                    w.block(format!("if self.{target} != {value}"), |w| {
                        if log {
                            w.line(format!(
                                "tracing::debug!(model = \"{name}\", column = \"{col}\", old = ?self.{target}, new = ?{value}, \"changed\");"
                            ));
                        }
                        w.line(format!("self.{target} = {value};"));
                        w.line(format!("self.changes.mark(\"{col}\");"));
                    });
                };
                w.block(format!("if let Some(v) = o.{}", m.member), |w| match m.kind {
                    SetKind::Plain => assign(w, "v"),
                    SetKind::Oid | SetKind::Owner => {
                        w.block("if let Ok(id) = oid::check_id(&v)", |w| assign(w, "id"));
                    }
                    SetKind::Enum => {
                        let ty = m.field.map(|f| f.ty.as_str()).unwrap_or_default();
                        w.block(format!("if let Ok(v) = {ty}::try_from(v)"), |w| assign(w, "v"));
                    }
                    SetKind::Merge => {
                        w.block(format!("if self.{target}.change_with(v)"), |w| {
                            w.line(format!("self.changes.mark(\"{col}\");"));
                        });
                    }
                    SetKind::Meta => {
                        let meta = target.trim_end_matches(".meta");
                        w.block(format!("if self.{meta}.meta_diff(v)"), |w| {
                            w.line(format!("self.changes.mark(\"{col}\");"));
                        });
                    }
                    SetKind::Created => {
                        w.block("if !v.is_zero()", |w| {
                            w.line(format!("self.{target} = v;"));
                            w.line(format!("self.changes.mark(\"{col}\");"));
                        });
                    }
                });
            }
            w.block("if !self.changes.is_empty()", |w| {
                w.line("self.changes.mark(\"updated\");");
            });
        });
    });
    w.blank();
    Ok(())
}

/// `register_oid_codes` for every model with an id key.
pub fn emit_oid_codes(w: &mut CodeWriter, schema: &Schema, imports: &mut BTreeSet<String>) {
    let models: Vec<(String, &Model)> = schema
        .doc
        .models
        .iter()
        .filter(|m| !m.oid_key.is_empty())
        .filter_map(|m| oid_cat(m).map(|cat| (cat, m)))
        .collect();
    if models.is_empty() {
        return;
    }
    imports.insert("oid".to_string());
    w.doc("Registers the id category codes of this document's models.");
    w.block("pub fn register_oid_codes()", |w| {
        for (cat, m) in models {
            w.line(format!("oid::register_code(\"{cat}\", \"{}\");", m.oid_key));
        }
    });
    w.blank();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{parse_document, resolve};

    const DOC: &str = r#"
modelpkg: cms
models:
  - name: Article
    comment: 文章
    tableTag: cms_article,alias:a
    fields:
      - name: comm.DefaultModel
      - name: Author
        type: string
        tags: {json: author, db: author}
        basic: true
      - name: Title
        type: string
        tags: {json: title, db: "title,notnull"}
        basic: true
        isset: true
      - name: AuthorID
        type: oid.OID
        tags: {json: authorID, db: author_id}
        isset: true
      - name: comm.MetaField
"#;

    fn render() -> (String, BTreeSet<String>) {
        render_doc(DOC)
    }

    fn render_doc(doc: &str) -> (String, BTreeSet<String>) {
        let schema = resolve(parse_document("cms", doc, false).unwrap()).unwrap();
        let mut w = CodeWriter::new();
        let mut imports = BTreeSet::new();
        emit_model(&mut w, &schema, &schema.doc.models[0], &mut imports).unwrap();
        (w.finish(), imports)
    }

    #[test]
    fn test_struct_layout() {
        let (out, imports) = render();
        assert!(out.contains("pub const ARTICLE_TABLE: &str = \"cms_article\";"));
        assert!(out.contains("pub const ARTICLE_ALIAS: &str = \"a\";"));
        assert!(out.contains(
            "pub struct Article {\n    #[serde(flatten)]\n    pub default_model: comm::DefaultModel,\n    #[serde(flatten)]\n    pub basic: ArticleBasic,\n"
        ));
        assert!(out.contains("pub type Articles = Vec<Article>;"));
        assert!(out.contains("pub struct ArticleBasic {"));
        assert!(out.contains("#[pgx(\"title,notnull\")]\n    pub title: String,"));
        assert!(imports.contains("comm") && imports.contains("oid") && imports.contains("pgx"));
    }

    fn with_line(line: &str) -> String {
        DOC.replace("    comment: 文章", &format!("    comment: 文章\n    {line}"))
    }

    #[test]
    fn test_creating_hook_and_set_applier() {
        let (out, _) = render_doc(&with_line("oidcat: article"));
        assert!(out.contains("pub const ARTICLE_OID_CAT: &str = \"article\";"));
        assert!(out.contains("oid::new_id(ARTICLE_OID_CAT).ok_or(comm::Error::EmptyId)?;"));
        assert!(out.contains("self.default_model.creating()"));
        assert!(out.contains("pub author_id: Option<String>,"));
        assert!(out.contains("if let Ok(id) = oid::check_id(&v) {"));
        assert!(out.contains("self.changes.mark(\"author_id\");"));
        assert!(out.contains("if self.meta_field.meta_diff(v) {"));
        assert!(out.contains("tracing::debug!(model = \"Article\", column = \"title\""));
    }

    #[test]
    fn test_creating_without_category_rejects_zero_id() {
        let (out, _) = render();
        assert!(!out.contains("_OID_CAT"));
        assert!(!out.contains("oid::new_id("));
        assert!(out.contains(
            "if self.default_model.id.is_zero() {\n            return Err(comm::Error::EmptyId);\n        }"
        ));
        assert!(out.contains("self.default_model.creating()"));
    }

    #[test]
    fn test_oid_key_mints_with_label_code_first() {
        let (out, _) = render_doc(&with_line("oidKey: ar"));
        assert!(out.contains("pub const ARTICLE_OID_CAT: &str = \"default\";"));
        assert!(out.contains("self.default_model.id = oid::new_with_code(ARTICLE_LABEL)"));
        assert!(out.contains(".or_else(|| oid::new_id(ARTICLE_OID_CAT))"));

        let schema = resolve(parse_document("cms", &with_line("oidKey: ar"), false).unwrap()).unwrap();
        let mut w = CodeWriter::new();
        emit_oid_codes(&mut w, &schema, &mut BTreeSet::new());
        assert!(w.finish().contains("oid::register_code(\"default\", \"ar\");"));
    }

    #[test]
    fn test_disable_log_drops_change_logging() {
        let doc = DOC.replace("    comment: 文章", "    comment: 文章\n    disableLog: true");
        let schema = resolve(parse_document("cms", &doc, false).unwrap()).unwrap();
        let mut w = CodeWriter::new();
        emit_model(&mut w, &schema, &schema.doc.models[0], &mut BTreeSet::new()).unwrap();
        assert!(!w.finish().contains("tracing::debug!"));
    }
}
