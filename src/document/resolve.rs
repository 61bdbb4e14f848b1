//! Resolution: shorthand expansion, method splitting, hook tables and qualification checks.
//!
//! The output, [`Schema`], is frozen after [`resolve`]; emitters only read it.

use super::action::Action;
use super::hooks::ResolvedHooks;
use super::naming::{camel, cut_method};
use super::qualify::Qualifier;
use super::types::{Document, Enum, Method, Model, Store, Var};
use crate::error::{GenError, Result};
use std::collections::{BTreeMap, HashSet};

/// Default letters of a customized `hods` group.
const DEFAULT_HOD_LETTERS: &str = "GLCUD";

/// A store method split into its action and target model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMethod {
    /// Document-style name (`ListArticle`)
    pub name: String,
    pub action: Action,
    pub model: String,
    /// Put in "simple" mode: write-through upsert returning the id
    pub simple: bool,
    pub args: Vec<Var>,
    pub rets: Vec<Var>,
}

impl StoreMethod {
    pub fn fn_name(&self) -> String {
        super::naming::snake(&self.name)
    }
}

/// A store with its derived names and expanded method list.
#[derive(Debug, Clone)]
pub struct ResolvedStore {
    pub name: String,
    /// Trait name (`ContentStore`)
    pub iname: String,
    /// Short name used by handles and the aggregator accessor (`Content`)
    pub short_name: String,
    pub embed: Option<String>,
    pub methods: Vec<StoreMethod>,
}

impl ResolvedStore {
    /// Implementation struct (`ContentStoreImpl`)
    pub fn impl_name(&self) -> String {
        format!("{}Impl", self.iname)
    }

    /// Field and accessor name on the aggregator (`content_store` / `content`)
    pub fn field_name(&self) -> String {
        super::naming::snake(&self.iname)
    }

    pub fn accessor_name(&self) -> String {
        super::naming::snake(&self.short_name)
    }

    /// Models touched by this store, in first-use order.
    pub fn models(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.methods
            .iter()
            .filter(|m| seen.insert(m.model.as_str()))
            .map(|m| m.model.as_str())
            .collect()
    }

    pub fn has(&self, action: Action, model: &str) -> bool {
        self.methods
            .iter()
            .any(|m| m.action == action && m.model == model)
    }
}

/// The resolved, read-only view of a document.
#[derive(Debug)]
pub struct Schema {
    pub doc: Document,
    pub qualifier: Qualifier,
    pub stores: Vec<ResolvedStore>,
    hooks: BTreeMap<String, ResolvedHooks>,
    no_hooks: ResolvedHooks,
}

impl Schema {
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.doc.models.iter().find(|m| m.name == name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&Enum> {
        self.doc.enums.iter().find(|e| e.name == name)
    }

    pub fn hooks(&self, model: &str) -> &ResolvedHooks {
        self.hooks.get(model).unwrap_or(&self.no_hooks)
    }

    pub fn store(&self, name: &str) -> Option<&ResolvedStore> {
        self.stores
            .iter()
            .find(|s| s.name == name || s.iname == name || s.short_name == name)
    }

    /// Output base name (`cms` for `cms.yaml`).
    pub fn name(&self) -> &str {
        &self.doc.name
    }
}

/// Expands `hodBread` / `hodPrdb` / `hodGL` / `hods` into explicit methods, explicit methods
/// first, deduplicated by (action, model).
pub fn expand_methods(store: &Store) -> Result<Vec<StoreMethod>> {
    let mut out: Vec<StoreMethod> = Vec::new();
    let mut seen: HashSet<(Action, String)> = HashSet::new();
    let mut push = |out: &mut Vec<StoreMethod>, method: StoreMethod| {
        if seen.insert((method.action, method.model.clone())) {
            out.push(method);
        }
    };

    for method in &store.methods {
        push(&mut out, split_method(&store.name, method)?);
    }

    let groups: [(&Vec<String>, &[Action]); 3] = [
        (
            &store.hod_bread,
            &[
                Action::List,
                Action::Get,
                Action::Create,
                Action::Update,
                Action::Delete,
            ],
        ),
        (
            &store.hod_prdb,
            &[Action::List, Action::Get, Action::Put, Action::Delete],
        ),
        (&store.hod_gl, &[Action::List, Action::Get]),
    ];
    for (models, actions) in groups {
        for model in models {
            for action in actions {
                push(&mut out, shorthand(*action, model));
            }
        }
    }

    for hod in &store.hods {
        let letters = if hod.letters.is_empty() {
            DEFAULT_HOD_LETTERS
        } else {
            hod.letters.as_str()
        };
        for c in letters.chars() {
            let action = Action::from_letter(c).ok_or_else(|| {
                GenError::schema(format!(
                    "store {}: unknown action letter {c:?} for {}",
                    store.name, hod.name
                ))
            })?;
            push(&mut out, shorthand(action, &hod.name));
        }
    }
    Ok(out)
}

fn shorthand(action: Action, model: &str) -> StoreMethod {
    StoreMethod {
        name: format!("{action}{model}"),
        action,
        model: model.to_string(),
        simple: false,
        args: Vec::new(),
        rets: Vec::new(),
    }
}

fn split_method(store: &str, method: &Method) -> Result<StoreMethod> {
    let (act, model) = cut_method(&method.name).ok_or_else(|| {
        GenError::schema(format!(
            "store {store}: cannot split method name {:?}",
            method.name
        ))
    })?;
    let action: Action = act
        .parse()
        .map_err(|e| GenError::schema(format!("store {store}: method {}: {e}", method.name)))?;
    Ok(StoreMethod {
        name: method.name.clone(),
        action,
        model: model.to_string(),
        simple: method.simple,
        args: method.args.clone(),
        rets: method.rets.clone(),
    })
}

fn resolve_store(store: &Store) -> Result<ResolvedStore> {
    let iname = if store.iname.is_empty() {
        camel(&store.name)
    } else {
        store.iname.clone()
    };
    let short_name = if store.siname.is_empty() {
        iname.strip_suffix("Store").unwrap_or(&iname).to_string()
    } else {
        store.siname.clone()
    };
    Ok(ResolvedStore {
        name: store.name.clone(),
        short_name,
        embed: (!store.embed.is_empty()).then(|| store.embed.clone()),
        methods: expand_methods(store)?,
        iname,
    })
}

/// Resolves a loaded document.
///
/// # Errors
///
/// `Resolution` when a field type names an unknown namespace, a store method targets an
/// unknown model, or a web mapping names an unknown model; `Schema` for malformed methods.
pub fn resolve(doc: Document) -> Result<Schema> {
    let qualifier = Qualifier::new(&doc.qualified);

    for model in &doc.models {
        for field in model.fields.iter().chain(model.spec_extras.iter()) {
            if field.is_embed() {
                continue;
            }
            qualifier.check(&field.ty).map_err(|e| {
                GenError::resolution(format!("{}.{}: {e}", model.name, field.name))
            })?;
        }
    }

    let mut stores = Vec::with_capacity(doc.stores.len());
    for store in &doc.stores {
        let resolved = resolve_store(store)?;
        for method in &resolved.methods {
            if !doc.models.iter().any(|m| m.name == method.model) {
                return Err(GenError::resolution(format!(
                    "store {}: method {} targets unknown model {}",
                    store.name, method.name, method.model
                )));
            }
        }
        stores.push(resolved);
    }

    for spot in &doc.webapi.uris {
        if !doc.models.iter().any(|m| m.name == spot.model) {
            return Err(GenError::resolution(format!(
                "webapi: uri mapping names unknown model {}",
                spot.model
            )));
        }
    }

    let hooks = doc
        .models
        .iter()
        .map(|m| (m.name.clone(), ResolvedHooks::from_model(m)))
        .collect();

    tracing::debug!(
        models = doc.models.len(),
        stores = stores.len(),
        "document resolved"
    );

    Ok(Schema {
        doc,
        qualifier,
        stores,
        hooks,
        no_hooks: ResolvedHooks::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::types::Hod;

    fn store() -> Store {
        Store {
            name: "content".to_string(),
            methods: vec![Method {
                name: "GetArticle".to_string(),
                ..Default::default()
            }],
            hod_bread: vec!["Article".to_string()],
            hod_gl: vec!["Attachment".to_string()],
            hods: vec![Hod {
                name: "Clause".to_string(),
                letters: "GLP".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_shorthand_expansion_dedups_by_action_and_model() {
        let methods = expand_methods(&store()).unwrap();
        let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "GetArticle",
                "ListArticle",
                "CreateArticle",
                "UpdateArticle",
                "DeleteArticle",
                "ListAttachment",
                "GetAttachment",
                "GetClause",
                "ListClause",
                "PutClause",
            ]
        );
    }

    #[test]
    fn test_store_names() {
        let resolved = resolve_store(&store()).unwrap();
        assert_eq!(resolved.iname, "Content");
        assert_eq!(resolved.short_name, "Content");

        let named = Store {
            name: "content".to_string(),
            iname: "ContentStore".to_string(),
            ..Default::default()
        };
        let resolved = resolve_store(&named).unwrap();
        assert_eq!(resolved.short_name, "Content");
        assert_eq!(resolved.impl_name(), "ContentStoreImpl");
        assert_eq!(resolved.field_name(), "content_store");
        assert_eq!(resolved.accessor_name(), "content");
    }

    #[test]
    fn test_unknown_letter_is_schema_error() {
        let bad = Store {
            name: "s".to_string(),
            hods: vec![Hod {
                name: "Article".to_string(),
                letters: "GX".to_string(),
            }],
            ..Default::default()
        };
        assert!(matches!(expand_methods(&bad), Err(GenError::Schema(_))));
    }
}
