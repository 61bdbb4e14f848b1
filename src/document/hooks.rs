//! Lifecycle hooks: kinds, deterministic name resolution and per-model hook tables.

use super::naming::uc_first;
use super::types::Model;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A lifecycle point the generated store code can call out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookKind {
    BeforeSaving,
    AfterSaving,
    BeforeCreating,
    AfterCreating,
    BeforeUpdating,
    AfterUpdating,
    BeforeDeleting,
    AfterDeleting,
    AfterCreated,
    AfterUpdated,
    AfterDeleted,
    AfterLoad,
    AfterList,
    BeforeList,
    UpsertEs,
    DeleteEs,
    ErrorLoad,
}

impl HookKind {
    pub const ALL: [HookKind; 17] = [
        HookKind::BeforeSaving,
        HookKind::AfterSaving,
        HookKind::BeforeCreating,
        HookKind::AfterCreating,
        HookKind::BeforeUpdating,
        HookKind::AfterUpdating,
        HookKind::BeforeDeleting,
        HookKind::AfterDeleting,
        HookKind::AfterCreated,
        HookKind::AfterUpdated,
        HookKind::AfterDeleted,
        HookKind::AfterLoad,
        HookKind::AfterList,
        HookKind::BeforeList,
        HookKind::UpsertEs,
        HookKind::DeleteEs,
        HookKind::ErrorLoad,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::BeforeSaving => "beforeSaving",
            HookKind::AfterSaving => "afterSaving",
            HookKind::BeforeCreating => "beforeCreating",
            HookKind::AfterCreating => "afterCreating",
            HookKind::BeforeUpdating => "beforeUpdating",
            HookKind::AfterUpdating => "afterUpdating",
            HookKind::BeforeDeleting => "beforeDeleting",
            HookKind::AfterDeleting => "afterDeleting",
            HookKind::AfterCreated => "afterCreated",
            HookKind::AfterUpdated => "afterUpdated",
            HookKind::AfterDeleted => "afterDeleted",
            HookKind::AfterLoad => "afterLoad",
            HookKind::AfterList => "afterList",
            HookKind::BeforeList => "beforeList",
            HookKind::UpsertEs => "upsertES",
            HookKind::DeleteEs => "deleteES",
            HookKind::ErrorLoad => "errorLoad",
        }
    }

    /// Kinds that run inside the persistence transaction and receive the tx handle.
    pub fn is_transactional(self) -> bool {
        self.as_str().ends_with("ing")
    }

    /// Kinds whose explicit names must start with `kind + Model`.
    fn needs_model_prefix(self) -> bool {
        matches!(
            self,
            HookKind::AfterLoad
                | HookKind::BeforeList
                | HookKind::AfterList
                | HookKind::AfterCreated
                | HookKind::AfterUpdated
                | HookKind::AfterDeleted
                | HookKind::UpsertEs
                | HookKind::DeleteEs
        )
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown hook kind {s:?}"))
    }
}

/// Resolves the handler name of a hook.
///
/// * names starting with `db` (a persistence primitive) pass through;
/// * `true`/`yes` on an `-ing` kind becomes `db` + kind with `ing` recast to `e` + model
///   (`beforeCreating` → `dbBeforeCreateArticle`);
/// * `true`/`yes` on the other kinds becomes `kind + Model`;
/// * prefix-checked kinds reject explicit names that do not start with `kind + Model`;
/// * `errorLoad` always resolves to `onErrorLoad<Model>`.
///
/// Returns `None` for a name that is not acceptable for the kind.
pub fn resolve_hook_name(model: &str, kind: HookKind, value: &str) -> Option<String> {
    if value.starts_with("db") {
        return Some(value.to_string());
    }
    let k = kind.as_str();
    let name = if value == "true" || value == "yes" {
        if let Some(stem) = k.strip_suffix("ing") {
            return Some(format!("db{}e{model}", uc_first(stem)));
        }
        format!("{k}{model}")
    } else {
        value.to_string()
    };
    if kind == HookKind::ErrorLoad {
        return Some(format!("on{}{model}", uc_first(k)));
    }
    if kind.needs_model_prefix() && name.starts_with(&format!("{k}{model}")) {
        return Some(name);
    }
    None
}

/// One resolved hook: the lifecycle point and the function implementing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHook {
    pub kind: HookKind,
    /// Resolved name in document style (`dbBeforeCreateArticle`)
    pub name: String,
    pub model: String,
}

impl StoreHook {
    /// Hooks named after a persistence primitive are free functions; the rest are store methods.
    pub fn is_free_fn(&self) -> bool {
        self.name.starts_with("db")
    }

    pub fn fn_name(&self) -> String {
        super::naming::snake(&self.name)
    }
}

/// All hooks of one model, by kind.
#[derive(Debug, Clone, Default)]
pub struct ResolvedHooks {
    by_kind: BTreeMap<HookKind, StoreHook>,
}

impl ResolvedHooks {
    /// Builds the table from a model's hook map. Unknown kinds and unacceptable names are
    /// dropped with a warning.
    pub fn from_model(model: &Model) -> Self {
        let mut by_kind = BTreeMap::new();
        for (k, v) in &model.hooks {
            let Some(value) = v.as_text() else { continue };
            let kind = match k.parse::<HookKind>() {
                Ok(kind) => kind,
                Err(err) => {
                    tracing::warn!(model = %model.name, "{err}, ignored");
                    continue;
                }
            };
            match resolve_hook_name(&model.name, kind, value) {
                Some(name) => {
                    by_kind.insert(
                        kind,
                        StoreHook {
                            kind,
                            name,
                            model: model.name.clone(),
                        },
                    );
                }
                None => {
                    tracing::warn!(model = %model.name, hook = %kind, value, "hook name rejected");
                }
            }
        }
        Self { by_kind }
    }

    pub fn get(&self, kind: HookKind) -> Option<&StoreHook> {
        self.by_kind.get(&kind)
    }

    pub fn has(&self, kind: HookKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    /// The first configured of `specific` and `generic`; the two are never both invoked.
    pub fn first_of(&self, specific: HookKind, generic: HookKind) -> Option<&StoreHook> {
        self.get(specific).or_else(|| self.get(generic))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoreHook> {
        self.by_kind.values()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::types::HookValue;

    #[test]
    fn test_shorthand_ing_kinds_become_db_functions() {
        assert_eq!(
            resolve_hook_name("Article", HookKind::BeforeCreating, "true").as_deref(),
            Some("dbBeforeCreateArticle")
        );
        assert_eq!(
            resolve_hook_name("Article", HookKind::AfterSaving, "yes").as_deref(),
            Some("dbAfterSaveArticle")
        );
        assert_eq!(
            resolve_hook_name("Clause", HookKind::BeforeDeleting, "true").as_deref(),
            Some("dbBeforeDeleteClause")
        );
    }

    #[test]
    fn test_explicit_db_names_pass_through() {
        assert_eq!(
            resolve_hook_name("Article", HookKind::BeforeSaving, "dbArticleCheck").as_deref(),
            Some("dbArticleCheck")
        );
    }

    #[test]
    fn test_lifecycle_kinds_use_kind_and_model() {
        assert_eq!(
            resolve_hook_name("Article", HookKind::AfterLoad, "true").as_deref(),
            Some("afterLoadArticle")
        );
        assert_eq!(
            resolve_hook_name("Article", HookKind::AfterList, "afterListArticleWithTags").as_deref(),
            Some("afterListArticleWithTags")
        );
        assert_eq!(resolve_hook_name("Article", HookKind::AfterList, "loadTags"), None);
        assert_eq!(
            resolve_hook_name("Article", HookKind::ErrorLoad, "true").as_deref(),
            Some("onErrorLoadArticle")
        );
        assert_eq!(resolve_hook_name("Article", HookKind::BeforeSaving, "check"), None);
    }

    #[test]
    fn test_specific_hook_wins_over_generic() {
        let mut model = Model {
            name: "Article".to_string(),
            ..Default::default()
        };
        model
            .hooks
            .insert("beforeSaving".to_string(), HookValue::Flag(true));
        model
            .hooks
            .insert("beforeCreating".to_string(), HookValue::Flag(true));
        model
            .hooks
            .insert("afterLoad".to_string(), HookValue::Flag(false));
        let hooks = ResolvedHooks::from_model(&model);
        let hook = hooks
            .first_of(HookKind::BeforeCreating, HookKind::BeforeSaving)
            .unwrap();
        assert_eq!(hook.name, "dbBeforeCreateArticle");
        assert!(!hooks.has(HookKind::AfterLoad));
        assert_eq!(hook.fn_name(), "db_before_create_article");
    }
}
