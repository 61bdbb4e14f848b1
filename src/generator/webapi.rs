//! Web API emission: HTTP handles bound to store methods, their documentation annotations
//! and the registration function.
//!
//! Handles come from two sources, in this order: explicit `handles` entries, then every
//! `uris` spot crossed with the store methods targeting the spot's model.

use super::code::CodeWriter;
use super::registry::{Handle, MethodSig, RegistryBuilder, Route, StoreSig};
use crate::document::naming::{route_id, snake};
use crate::document::{Action, HandleDef, Model, Schema, UriSpot};
use crate::error::{GenError, Result};

const DEFAULT_TAGS: &str = "default generated";
const PARAM_AUTH: &str = "token    header   string  true \"login token\"";

fn failure_line(code: u16) -> Option<&'static str> {
    match code {
        400 => Some("400 {object} Failure \"bad request or parameters\""),
        401 => Some("401 {object} Failure \"not logged in\""),
        403 => Some("403 {object} Failure \"permission denied\""),
        404 => Some("404 {object} Failure \"target not found\""),
        503 => Some("503 {object} Failure \"server error\""),
        _ => None,
    }
}

fn action_label(action: Action) -> &'static str {
    match action {
        Action::List => "List",
        Action::Get => "Get",
        Action::Create => "Create",
        Action::Update => "Update",
        Action::Put => "Create or update",
        Action::Delete => "Delete",
    }
}

/// First line of the model comment, or its name.
fn short_comment(model: &Model) -> &str {
    model
        .comment
        .lines()
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&model.name)
}

/// Splits `"/cms/articles/{id} [put]"` into (uri, upper-case verb).
fn split_route(route: &str) -> Option<(&str, String)> {
    let (uri, verb) = route.split_once(' ')?;
    let verb = verb.trim().trim_matches(['[', ']']).to_uppercase();
    (!verb.is_empty()).then_some((uri.trim(), verb))
}

fn register_path<'a>(schema: &Schema, uri: &'a str) -> &'a str {
    let prefix = schema.doc.webapi.uri_prefix.as_str();
    if prefix.is_empty() {
        return uri;
    }
    match uri.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('/') => rest,
        _ => uri,
    }
}

fn spot_ignores(spot: &UriSpot, action: Action) -> bool {
    spot.ignore
        .chars()
        .filter_map(Action::from_letter)
        .any(|a| a == action)
}

/// Handle of a uri spot for one store method, or `None` when the spot ignores the action.
fn spot_handle(
    schema: &Schema,
    spot: &UriSpot,
    store: &StoreSig,
    method: &MethodSig,
) -> Result<Option<Handle>> {
    if spot.model != method.model || spot_ignores(spot, method.action) {
        return Ok(None);
    }
    let model = schema.model(&spot.model).ok_or_else(|| {
        GenError::resolution(format!("web spot names unknown model {}", spot.model))
    })?;
    let plural = model.plural_name();
    let webapi = &schema.doc.webapi;
    let mut uri = if spot.uri.is_empty() {
        let prefix = if spot.prefix.is_empty() {
            &webapi.uri_prefix
        } else {
            &spot.prefix
        };
        format!("{prefix}/{}", plural.to_lowercase())
    } else {
        spot.uri.clone()
    };

    let verb = method.action.http_verb();
    let fct = verb.to_lowercase();
    let cat = if store.short_name != model.name {
        store.short_name.as_str()
    } else {
        ""
    };
    let name = match method.action {
        Action::List => format!("{fct}{cat}{plural}"),
        _ => format!("{fct}{cat}{}", model.name),
    };
    if method.action.is_id_scoped() {
        uri.push_str("/{id}");
    }
    let route = format!("{uri} [{fct}]");
    let need_perm = method.action.is_mutating() || webapi.need_perm || spot.need_perm;
    let need_auth = need_perm || webapi.need_auth || spot.need_auth;
    let id = route_id(&route);
    Ok(Some(Handle {
        perm_id: if need_perm { id.clone() } else { String::new() },
        id,
        func: snake(&name),
        verb: verb.to_string(),
        path: register_path(schema, &uri).to_string(),
        route,
        action: method.action,
        model: model.name.clone(),
        accessor: store.accessor.clone(),
        method: method.clone(),
        need_auth,
        need_perm,
        hand_reg: spot.hand_reg,
        no_post: spot.no_post,
        batch: spot.batch.contains('C'),
        summary: format!("{} {}", action_label(method.action), short_comment(model)),
        tags: webapi.tag_label.clone(),
    }))
}

fn explicit_handle(schema: &Schema, registry: &RegistryBuilder, def: &HandleDef) -> Result<Handle> {
    let (store, method) = registry.find_method(&def.store, &def.method).ok_or_else(|| {
        GenError::resolution(format!(
            "handle {}: unknown store method {}.{}",
            def.name, def.store, def.method
        ))
    })?;
    let (uri, verb) = split_route(&def.route).ok_or_else(|| {
        GenError::schema(format!("handle {}: invalid route {:?}", def.name, def.route))
    })?;
    let webapi = &schema.doc.webapi;
    let need_perm = webapi.need_perm || def.spot.need_perm;
    let need_auth = need_perm || webapi.need_auth || def.spot.need_auth;
    let id = route_id(&def.route);
    let perm_id = if !def.id.is_empty() {
        def.id.clone()
    } else if need_perm {
        id.clone()
    } else {
        String::new()
    };
    let summary = if def.summary.is_empty() {
        let label = action_label(method.action);
        match schema.model(&method.model) {
            Some(model) => format!("{label} {}", short_comment(model)),
            None => format!("{label} {}", method.model),
        }
    } else {
        def.summary.clone()
    };
    let tags = if def.tags.is_empty() {
        webapi.tag_label.clone()
    } else {
        def.tags.clone()
    };
    Ok(Handle {
        id,
        perm_id,
        func: snake(&def.name),
        verb,
        path: register_path(schema, uri).to_string(),
        route: def.route.clone(),
        action: method.action,
        model: method.model.clone(),
        accessor: store.accessor.clone(),
        method: method.clone(),
        need_auth,
        need_perm,
        hand_reg: def.spot.hand_reg,
        no_post: def.spot.no_post,
        batch: def.spot.batch.contains('C'),
        summary,
        tags,
    })
}

/// Every handle of the document, explicit handles first.
///
/// # Errors
///
/// `Resolution` when an explicit handle names a store method the registry does not know.
pub fn collect_handles(schema: &Schema, registry: &RegistryBuilder) -> Result<Vec<Handle>> {
    let webapi = &schema.doc.webapi;
    let mut handles = Vec::new();
    for def in &webapi.handles {
        handles.push(explicit_handle(schema, registry, def)?);
    }
    for spot in &webapi.uris {
        for store in registry.stores() {
            for method in &store.methods {
                if let Some(h) = spot_handle(schema, spot, store, method)? {
                    handles.push(h);
                }
            }
        }
    }
    let mut seen = std::collections::HashSet::new();
    for h in &handles {
        if !seen.insert(h.func.as_str()) {
            return Err(GenError::resolution(format!(
                "handler {} generated twice ({})",
                h.func, h.route
            )));
        }
    }
    Ok(handles)
}

/// Registration entries of `handles`; PUT on `/{id}` adds a POST alias on the parent path.
pub fn routes(schema: &Schema, handles: &[Handle]) -> Vec<Route> {
    if schema.doc.webapi.hand_reg {
        return Vec::new();
    }
    let mut out = Vec::new();
    for h in handles.iter().filter(|h| !h.hand_reg) {
        let route = Route {
            need_auth: h.need_auth,
            verb: h.verb.clone(),
            path: h.path.clone(),
            perm_id: h.perm_id.clone(),
            handler: h.func.clone(),
        };
        let alias = (!h.no_post && h.action == Action::Put)
            .then(|| h.path.strip_suffix("/{id}"))
            .flatten()
            .map(|parent| Route {
                verb: "POST".to_string(),
                path: parent.to_string(),
                ..route.clone()
            });
        out.push(route);
        out.extend(alias);
    }
    out
}

fn success_line(h: &Handle) -> String {
    let m = &h.method;
    match h.action {
        Action::List => {
            let data = m
                .ret
                .trim_start_matches('(')
                .split(',')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            format!("200 {{object}} Done{{result=ResultData{{data={data}}}}}")
        }
        Action::Create => "200 {object} Done{result=ResultID}".to_string(),
        _ if m.ret != "()" => format!("200 {{object}} Done{{result={}}}", m.ret),
        Action::Update | Action::Put => "200 {object} Done{result=string}".to_string(),
        _ => "200 {object} Done".to_string(),
    }
}

fn emit_annotations(w: &mut CodeWriter, h: &Handle) {
    let tags = if h.tags.is_empty() { DEFAULT_TAGS } else { &h.tags };
    let mut lines = vec![format!("@Tags {tags}")];
    if !h.perm_id.is_empty() {
        lines.push(format!("@ID {}", h.perm_id));
    }
    lines.push(format!("@Summary {}", h.summary));
    let accept = if matches!(h.verb.as_str(), "POST" | "PUT") {
        "json,mpfd"
    } else {
        "json"
    };
    lines.push(format!("@Accept {accept}"));
    lines.push("@Produce json".to_string());
    if h.need_auth || h.need_perm {
        lines.push(format!("@Param {PARAM_AUTH}"));
    }
    for p in &h.method.params {
        if p.name == "id" {
            lines.push("@Param   id    path   string  true   \"id\"".to_string());
        } else if h.route.contains(&format!("{{{}}}", p.name)) {
            lines.push(format!("@Param   {}  path  string  true  \"\"", p.name));
        } else {
            let at = match h.action {
                Action::List => "query",
                Action::Create | Action::Update | Action::Put => "body",
                _ => "formData",
            };
            lines.push(format!("@Param   query  {at}   {}  true   \"Object\"", p.ty));
        }
    }
    lines.push(format!("@Success {}", success_line(h)));
    let fails: &[u16] = match h.action {
        Action::List | Action::Get => &[400, 401, 404, 503],
        _ => &[400, 401, 403, 503],
    };
    lines.extend(
        fails
            .iter()
            .filter_map(|c| failure_line(*c))
            .map(|f| format!("@Failure {f}")),
    );
    lines.push(format!("@Router {}", h.route));
    for line in lines {
        w.line(format!("/// {line}"));
    }
}

/// Arguments of a handle's store call, `ctx` first.
fn call_args(h: &Handle, values: &[&str]) -> Result<String> {
    let params = &h.method.params;
    if params.len() != values.len() {
        return Err(GenError::resolution(format!(
            "handle {}: method {} takes {} arguments, {} action needs {}",
            h.func,
            h.method.name,
            params.len(),
            h.action,
            values.len()
        )));
    }
    let mut out = String::from("&ctx");
    for (p, v) in params.iter().zip(values) {
        out.push_str(", ");
        if *v == "id" && p.ty.starts_with('&') {
            out.push_str("&id");
        } else {
            out.push_str(v);
        }
    }
    Ok(out)
}

/// Binds a `Result<Extractor<T>, Rejection>` argument or answers 400.
fn bind(w: &mut CodeWriter, binding: &str, arg: &str, extractor: &str) {
    w.open(format!("let {binding} = match {arg} {{"));
    w.line(format!("Ok({extractor}(v)) => v,"));
    w.line("Err(err) => return fail(400, err),");
    w.close("};");
}

fn emit_handler(w: &mut CodeWriter, schema: &Schema, h: &Handle) -> Result<()> {
    let m = &h.method;
    let model = schema.model(&h.model);
    let store_call = format!("api.sto.{}().{}", h.accessor, m.func);
    let mut params = vec!["State(api): State<Api>".to_string(), "ctx: Context".to_string()];
    let id_scoped = h.route.contains("{id}");
    if id_scoped {
        params.push("Path(id): Path<String>".to_string());
    }
    let rels = model.map(|md| md.rel_has_one()).unwrap_or_default();
    let with_rels = id_scoped && h.action == Action::Get && !rels.is_empty();
    if with_rels {
        params.push("rels: Rels".to_string());
    }
    let payload_ty = |i: usize| m.params.get(i).map(|p| p.ty.clone()).unwrap_or_default();
    match h.action {
        Action::List => params.push(format!(
            "spec: Result<Query<{}>, QueryRejection>",
            payload_ty(0)
        )),
        Action::Create if h.batch => params.push(format!(
            "payload: Result<Json<OneOrMany<{}>>, JsonRejection>",
            payload_ty(0)
        )),
        Action::Create => params.push(format!(
            "payload: Result<Json<{}>, JsonRejection>",
            payload_ty(0)
        )),
        Action::Update | Action::Put => params.push(format!(
            "payload: Result<Json<{}>, JsonRejection>",
            payload_ty(1)
        )),
        _ => {}
    }

    emit_annotations(w, h);
    w.open(format!("pub async fn {}(", h.func));
    for p in &params {
        w.line(format!("{p},"));
    }
    w.reopen(") -> Reply {");

    let returns_model = m.ret == h.model;
    match h.action {
        Action::List => {
            let spec_up = model.map(|md| md.spec_up.as_str()).unwrap_or_default();
            let binding = if spec_up.is_empty() { "spec" } else { "mut spec" };
            bind(w, binding, "spec", "Query");
            if !spec_up.is_empty() {
                w.line(format!("spec.{}(&ctx, \"{}\");", snake(spec_up), h.model));
            }
            w.open(format!("match {store_call}({}).await {{", call_args(h, &["spec"])?));
            if m.custom {
                w.line("Ok(ret) => success(ret),");
            } else {
                w.line("Ok((data, total)) => success(dt_result(data, total)),");
            }
            w.line("Err(err) => fail(503, err),");
            w.close("}");
        }
        Action::Get if id_scoped => {
            if with_rels {
                w.line("let ctx = with_relations(ctx, &rels);");
            }
            w.open(format!("match {store_call}({}).await {{", call_args(h, &["id"])?));
            w.line("Ok(obj) => success(obj),");
            w.line("Err(err) => fail(404, err),");
            w.close("}");
        }
        Action::Create if h.batch => {
            let created = if returns_model {
                "id_result(obj.id_string())"
            } else {
                "obj"
            };
            bind(w, "payload", "payload", "Json");
            w.open("match payload {");
            w.open(format!(
                "OneOrMany::One(basic) => match {store_call}({}).await {{",
                call_args(h, &["basic"])?
            ));
            w.line(format!("Ok(obj) => success({created}),"));
            w.line("Err(err) => fail(503, err),");
            w.close("},");
            w.open("OneOrMany::Many(all) => {");
            w.line("let mut ret = Vec::with_capacity(all.len());");
            w.block("for basic in all", |w| {
                w.open(format!("match {store_call}(&ctx, basic).await {{"));
                w.line(format!("Ok(obj) => ret.push(BatchItem::done({created})),"));
                w.line("Err(err) => ret.push(BatchItem::failed(err)),");
                w.close("}");
            });
            w.line("let total = ret.len() as i64;");
            w.line("success(dt_result(ret, total))");
            w.close("}");
            w.close("}");
        }
        Action::Create => {
            let created = if returns_model {
                "id_result(obj.id_string())"
            } else {
                "obj"
            };
            bind(w, "basic", "payload", "Json");
            w.open(format!("match {store_call}({}).await {{", call_args(h, &["basic"])?));
            w.line(format!("Ok(obj) => success({created}),"));
            w.line("Err(err) => fail(503, err),");
            w.close("}");
        }
        Action::Update | Action::Put if id_scoped => {
            bind(w, "set", "payload", "Json");
            w.open(format!("match {store_call}({}).await {{", call_args(h, &["id", "set"])?));
            if m.ret == "()" {
                w.line("Ok(()) => success(\"ok\"),");
            } else {
                w.line("Ok(ret) => success(ret),");
            }
            w.line("Err(err) => fail(503, err),");
            w.close("}");
        }
        Action::Delete if id_scoped => {
            w.open(format!("match {store_call}({}).await {{", call_args(h, &["id"])?));
            w.line("Ok(_) => success(\"ok\"),");
            w.line("Err(err) => fail(503, err),");
            w.close("}");
        }
        _ => {
            return Err(GenError::resolution(format!(
                "handle {}: {} needs an {{id}} segment in route {}",
                h.func, h.action, h.route
            )));
        }
    }
    w.close("}");
    Ok(())
}

/// Emits `register_<doc>_handles` and every handler, and records handles and routes in
/// `registry`.
///
/// # Errors
///
/// `Resolution` when a handle cannot be bound to its store method.
pub fn emit_web(w: &mut CodeWriter, schema: &Schema, registry: &mut RegistryBuilder) -> Result<()> {
    let handles = collect_handles(schema, registry)?;
    let routes = routes(schema, &handles);

    if !schema.doc.webapi.hand_reg {
        w.doc(&format!("Registers the handlers generated from `{}`.", schema.name()));
        w.block(
            format!(
                "pub fn register_{}_handles(reg: &mut HandleRegistry)",
                snake(schema.name())
            ),
            |w| {
                for r in &routes {
                    w.line(format!(
                        "reg.add({}, \"{}\", \"{}\", \"{}\", {});",
                        r.need_auth, r.verb, r.path, r.perm_id, r.handler
                    ));
                }
            },
        );
    }
    for h in &handles {
        w.blank();
        emit_handler(w, schema, h)?;
    }

    tracing::debug!(handles = handles.len(), routes = routes.len(), "web handles emitted");
    for h in handles {
        registry.add_handle(h);
    }
    for r in routes {
        registry.add_route(r);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{parse_document, resolve};
    use crate::generator::store::store_sig;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    const DOC: &str = r#"
modelpkg: cms
models:
  - name: Article
    comment: article of the site
    tableTag: cms_article
    fields:
      - name: comm.DefaultModel
      - name: Author
        type: string
        tags: {json: author}
        basic: true
      - name: Title
        type: string
        tags: {json: title}
        basic: true
        isset: true
        query: match
stores:
  - name: contentStore
    iname: ContentStore
    hodBread: [Article]
webapi:
  pkg: api
  uris:
    - model: Article
      prefix: /cms
"#;

    fn setup(doc: &str) -> (Schema, RegistryBuilder) {
        let schema = resolve(parse_document("cms", doc, false).unwrap()).unwrap();
        let mut reg = RegistryBuilder::new();
        for store in &schema.stores {
            reg.add_store(store_sig(&schema, store, &mut BTreeSet::new()).unwrap());
        }
        (schema, reg)
    }

    #[test]
    fn test_routes_of_full_crud_spot() {
        let (schema, reg) = setup(DOC);
        let handles = collect_handles(&schema, &reg).unwrap();
        let got: Vec<(String, String)> = routes(&schema, &handles)
            .into_iter()
            .map(|r| (r.verb, r.path))
            .collect();
        let want = [
            ("GET", "/cms/articles"),
            ("GET", "/cms/articles/{id}"),
            ("POST", "/cms/articles"),
            ("PUT", "/cms/articles/{id}"),
            ("DELETE", "/cms/articles/{id}"),
        ];
        let want: Vec<(String, String)> = want
            .iter()
            .map(|(v, p)| (v.to_string(), p.to_string()))
            .collect();
        assert_eq!(got, want);

        let funcs: Vec<&str> = handles.iter().map(|h| h.func.as_str()).collect();
        assert_eq!(
            funcs,
            [
                "get_content_articles",
                "get_content_article",
                "post_content_article",
                "put_content_article",
                "delete_content_article"
            ]
        );
        assert!(!handles[0].need_auth);
        assert_eq!(handles[3].perm_id, "cms-articles-id-put");
        assert!(handles[3].need_auth && handles[3].need_perm);
    }

    #[test]
    fn test_put_alias_and_ignore_letters() {
        let doc = DOC
            .replace("hodBread: [Article]", "hodPrdb: [Article]")
            .replace("prefix: /cms", "prefix: /cms\n      ignore: D");
        let (schema, reg) = setup(&doc);
        let handles = collect_handles(&schema, &reg).unwrap();
        assert!(handles.iter().all(|h| h.action != Action::Delete));
        let got = routes(&schema, &handles);
        let alias = got
            .iter()
            .find(|r| r.verb == "POST")
            .expect("post alias");
        assert_eq!(alias.path, "/cms/articles");
        assert_eq!(alias.handler, "put_content_article");
        assert_eq!(alias.perm_id, "cms-articles-id-put");

        let doc = doc.replace("ignore: D", "ignore: D\n      noPost: true");
        let (schema, reg) = setup(&doc);
        let handles = collect_handles(&schema, &reg).unwrap();
        assert!(routes(&schema, &handles).iter().all(|r| r.verb != "POST"));
    }

    #[test]
    fn test_handler_bodies_and_annotations() {
        let (schema, mut reg) = setup(DOC);
        let mut w = CodeWriter::new();
        emit_web(&mut w, &schema, &mut reg).unwrap();
        let out = w.finish();
        assert!(out.contains("pub fn register_cms_handles(reg: &mut HandleRegistry) {\n"));
        assert!(out.contains(
            "    reg.add(true, \"PUT\", \"/cms/articles/{id}\", \"cms-articles-id-put\", put_content_article);\n"
        ));
        assert!(out.contains("/// @Summary Create article of the site\n"));
        assert!(out.contains("/// @Success 200 {object} Done{result=ResultData{data=Articles}}\n"));
        assert!(out.contains("/// @Router /cms/articles/{id} [delete]\n"));
        assert!(out.contains(
            "    match api.sto.content().list_article(&ctx, spec).await {\n        Ok((data, total)) => success(dt_result(data, total)),\n"
        ));
        assert!(out.contains("        Ok(obj) => success(id_result(obj.id_string())),\n"));
        assert!(out.contains("    match api.sto.content().get_article(&ctx, &id).await {\n"));
        assert!(out.contains("        Err(err) => fail(404, err),\n"));
        assert!(out.contains("        Ok(()) => success(\"ok\"),\n"));
        assert_eq!(reg.handles().len(), 5);
        assert_eq!(reg.routes().len(), 5);
    }

    #[test]
    fn test_explicit_handle_needs_known_method() {
        let doc = DOC.replace(
            "  uris:\n",
            "  handles:\n    - name: getArticleBySlug\n      store: Content\n      method: GetBySlug\n      route: /cms/slugs/{id} [get]\n  uris:\n",
        );
        let (schema, reg) = setup(&doc);
        let err = collect_handles(&schema, &reg).unwrap_err();
        assert!(matches!(err, GenError::Resolution(_)));

        let doc = doc.replace("method: GetBySlug", "method: GetArticle");
        let (schema, reg) = setup(&doc);
        let handles = collect_handles(&schema, &reg).unwrap();
        assert_eq!(handles[0].func, "get_article_by_slug");
        assert_eq!(handles[0].path, "/cms/slugs/{id}");
        assert_eq!(handles[0].perm_id, "");
    }
}
