use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire-format name → tag string (`json: "title"`, `db: "title,notnull"`), or any other
/// string map in the document. Ordered so every emitted artifact is deterministic.
pub type Tags = BTreeMap<String, String>;

/// Root of an input document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Base name of the document file (`cms` for `docs/cms.yaml`); drives output file names.
    #[serde(skip)]
    pub name: String,
    #[serde(default, rename = "modelpkg")]
    pub model_pkg: String,
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub enums: Vec<Enum>,
    #[serde(default)]
    pub stores: Vec<Store>,
    #[serde(default)]
    pub webapi: WebApi,
    /// Namespace → import path (`oid: crate::models::oid`)
    #[serde(default, rename = "depends")]
    pub qualified: Tags,
}

/// Value of a hook map entry: either a handler name or the boolean shorthand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookValue {
    Flag(bool),
    Name(String),
}

impl HookValue {
    /// The textual form used by name resolution; `None` when the hook is switched off.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HookValue::Flag(true) => Some("true"),
            HookValue::Flag(false) => None,
            HookValue::Name(s) if s.is_empty() => None,
            HookValue::Name(s) => Some(s.as_str()),
        }
    }
}

/// A persisted entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub table_tag: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub plural: String,
    #[serde(default, rename = "oidcat")]
    pub oid_cat: String,
    #[serde(default, rename = "oidKey")]
    pub oid_key: String,
    #[serde(default)]
    pub hooks: BTreeMap<String, HookValue>,
    #[serde(default)]
    pub spec_extras: Vec<Field>,
    #[serde(default)]
    pub sifters: Vec<String>,
    #[serde(default)]
    pub spec_up: String,

    #[serde(default)]
    pub discard_unknown: bool,
    #[serde(default)]
    pub with_column_get: bool,
    #[serde(default)]
    pub with_column_list: bool,
    #[serde(default)]
    pub db_trigger_save: bool,
    #[serde(default)]
    pub with_created_set: bool,
    #[serde(default)]
    pub force_create: bool,
    #[serde(default)]
    pub post_new: bool,
    #[serde(default)]
    pub disable_log: bool,
}

/// One field of a model (or an embedded mixin when name or type is empty).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub tags: Tags,
    /// Explicit import path, overrides the namespace table
    #[serde(default)]
    pub qual: String,
    #[serde(default, rename = "basic")]
    pub is_basic: bool,
    #[serde(default, rename = "isset")]
    pub is_set: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub descr: String,
    /// Query annotation, `kind[,ext]`
    #[serde(default)]
    pub query: String,
    #[serde(default, rename = "changeWith")]
    pub change_with: bool,
    #[serde(default, rename = "icse")]
    pub ignore_case: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enum {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    /// Underlying numeric type, `i16` by default
    #[serde(default, rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub values: Vec<EnumValue>,
    #[serde(default)]
    pub decodable: bool,
    #[serde(default)]
    pub stringer: bool,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub shorted: bool,
    #[serde(default, rename = "valstr")]
    pub val_str: bool,
    #[serde(default)]
    pub labeled: bool,
    #[serde(default)]
    pub func_all: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub suffix: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: Option<i64>,
    #[serde(default)]
    pub lower: bool,
    #[serde(default)]
    pub descr: String,
}

/// A persistence-facing group of methods over related models.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub name: String,
    #[serde(default, rename = "iname")]
    pub iname: String,
    #[serde(default, rename = "siname")]
    pub siname: String,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub embed: String,
    #[serde(default)]
    pub hod_bread: Vec<String>,
    #[serde(default)]
    pub hod_prdb: Vec<String>,
    #[serde(default, rename = "hodGL")]
    pub hod_gl: Vec<String>,
    #[serde(default)]
    pub hods: Vec<Hod>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub simple: bool,
    #[serde(default)]
    pub args: Vec<Var>,
    #[serde(default)]
    pub rets: Vec<Var>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Var {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Customized shorthand group: a model and its action letters (`GLCUD`, `GLPD`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hod {
    pub name: String,
    #[serde(default, rename = "type")]
    pub letters: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebApi {
    #[serde(default)]
    pub pkg: String,
    #[serde(default)]
    pub handles: Vec<HandleDef>,
    #[serde(default)]
    pub uris: Vec<UriSpot>,
    #[serde(default)]
    pub hand_reg: bool,
    #[serde(default)]
    pub need_auth: bool,
    #[serde(default)]
    pub need_perm: bool,
    #[serde(default)]
    pub tag_label: String,
    #[serde(default)]
    pub uri_prefix: String,
}

/// Maps a model to a URI prefix; every matching store method becomes a handle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UriSpot {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub uri: String,
    /// Action letters to skip (`D` drops Delete)
    #[serde(default)]
    pub ignore: String,
    #[serde(default)]
    pub batch: String,
    #[serde(default)]
    pub hand_reg: bool,
    #[serde(default)]
    pub need_auth: bool,
    #[serde(default)]
    pub need_perm: bool,
    #[serde(default)]
    pub no_post: bool,
}

/// Explicitly declared handle, bound to `store.method`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleDef {
    #[serde(flatten)]
    pub spot: UriSpot,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub store: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub route: String,
}
