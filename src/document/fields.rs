//! Read-only inspection helpers over document fields and models.

use super::naming::{matches_mixin, plural, snake};
use super::types::{Field, Model, Tags};

pub const MODEL_DEFAULT: &str = "DefaultModel";
pub const MODEL_DUNCE: &str = "DunceModel";
pub const MODEL_SERIAL: &str = "SerialModel";

const META_FIELD: &str = ".MetaField";
const OWNER_FIELD: &str = ".OwnerField";
const AUDIT_FIELD: &str = ".AuditFields";
const TEXT_SEARCH_FIELD: &str = ".TextSearchField";

/// Tag keys that carry the persistence column definition, by priority.
const DB_TAGS: [&str; 3] = ["db", "pg", "bun"];

/// Relation modes declared in a db tag (`rel:has-one,join:author_id=id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelMode {
    BelongsTo,
    HasOne,
    HasMany,
}

/// A resolved column: name, uniqueness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub unique: bool,
}

fn tag_any<'a>(tags: &'a Tags, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| tags.get(*k))
        .map(String::as_str)
}

impl Field {
    /// Type name, or the name itself for a type-only mixin line.
    pub fn type_name(&self) -> &str {
        if self.ty.is_empty() {
            &self.name
        } else {
            &self.ty
        }
    }

    pub fn is_embed(&self) -> bool {
        self.name.is_empty() || self.ty.is_empty()
    }

    /// `*oid.OID` → (`Some("oid")`, `OID`, `true`)
    pub fn cut_type(&self) -> (Option<&str>, &str, bool) {
        let mut ty = self.type_name();
        let is_ptr = ty.starts_with('*') || ty.starts_with("Option<");
        ty = ty.trim_start_matches('*');
        match ty.split_once('.') {
            Some((ns, rest)) => (Some(ns), rest, is_ptr),
            None => match ty.rsplit_once("::") {
                Some((ns, rest)) => (Some(ns), rest, is_ptr),
                None => (None, ty, is_ptr),
            },
        }
    }

    pub fn is_oid(&self) -> bool {
        matches!(self.cut_type(), (Some("oid"), "OID", _))
    }

    pub fn is_meta(&self) -> bool {
        matches_mixin(META_FIELD, &[&self.name, &self.ty])
    }

    pub fn is_owner(&self) -> bool {
        matches_mixin(OWNER_FIELD, &[&self.name, &self.ty])
    }

    pub fn is_audit(&self) -> bool {
        matches_mixin(AUDIT_FIELD, &[&self.name, &self.ty])
    }

    pub fn is_text_search(&self) -> bool {
        matches_mixin(TEXT_SEARCH_FIELD, &[&self.name, &self.ty])
    }

    pub fn is_date_time(&self) -> bool {
        self.ty.ends_with("DateTime")
    }

    /// Column of this field when it is persisted.
    pub fn column(&self) -> Option<Column> {
        let tag = tag_any(&self.tags, &DB_TAGS)?;
        if tag.is_empty() || tag == "-" || tag.starts_with("rel:") {
            return None;
        }
        let (first, rest) = tag.split_once(',').unwrap_or((tag, ""));
        let name = if first.is_empty() {
            snake(&self.name)
        } else {
            first.to_string()
        };
        Some(Column {
            name,
            unique: rest.split(',').any(|o| o == "unique"),
        })
    }

    pub fn rel_mode(&self) -> Option<RelMode> {
        let tag = tag_any(&self.tags, &DB_TAGS)?;
        if tag.starts_with("rel:belongs-to") {
            Some(RelMode::BelongsTo)
        } else if tag.starts_with("rel:has-one") {
            Some(RelMode::HasOne)
        } else if tag.starts_with("rel:has-many") {
            Some(RelMode::HasMany)
        } else {
            None
        }
    }

    /// Wire name from the json tag, or the field name.
    pub fn json_name(&self) -> String {
        match self.tags.get("json") {
            Some(j) => j.split(',').next().unwrap_or_default().to_string(),
            None => super::naming::lc_first(&self.name),
        }
    }

    /// Whether the json tag suppresses the field on the wire.
    pub fn json_skipped(&self) -> bool {
        self.tags.get("json").is_some_and(|j| j == "-")
    }

    /// Name of the request argument (form tag, json tag or field name).
    pub fn arg_tag(&self) -> String {
        if let Some(f) = self.tags.get("form") {
            return super::naming::lc_first(f);
        }
        if self.tags.contains_key("json") {
            return super::naming::lc_first(&self.json_name());
        }
        super::naming::lc_first(&self.name)
    }

    pub fn rust_name(&self) -> String {
        snake(&self.name)
    }
}

impl Model {
    pub fn plural_name(&self) -> String {
        if self.plural.is_empty() {
            plural(&self.name)
        } else {
            self.plural.clone()
        }
    }

    /// Id and date mixins backing the `Creating` hook: (has hook, id mixin, date mixin).
    pub fn mod_hook(&self) -> (bool, Option<&'static str>, Option<&'static str>) {
        let mut idf = None;
        let mut dtf = None;
        for field in &self.fields {
            let ty = field.type_name();
            if ty.ends_with(MODEL_DEFAULT) {
                return (true, Some(MODEL_DEFAULT), Some(MODEL_DEFAULT));
            }
            if ty.ends_with(MODEL_DUNCE) {
                return (true, Some(MODEL_DUNCE), Some(MODEL_DUNCE));
            }
            if ty.ends_with(MODEL_SERIAL) {
                return (false, Some(MODEL_SERIAL), Some(MODEL_SERIAL));
            }
            if ty.contains("IDField") {
                idf = Some("IDField");
            } else if ty.ends_with("SerialField") {
                idf = Some("SerialField");
            } else if ty.ends_with("DateFields") {
                dtf = Some("DateFields");
            }
        }
        let ok = idf == Some("IDField") && dtf.is_some();
        (ok, idf, dtf)
    }

    /// Table-backed: carries an identity mixin and a table tag.
    pub fn is_table(&self) -> bool {
        self.mod_hook().1.is_some() && !self.table_tag.is_empty()
    }

    /// Table name from the table tag (`cms_article,alias:a`).
    pub fn table_name(&self) -> String {
        let first = self.table_tag.split(',').next().unwrap_or_default();
        first.trim_start_matches("table:").to_string()
    }

    pub fn table_alias(&self) -> String {
        self.table_tag
            .split(',')
            .find_map(|p| p.strip_prefix("alias:"))
            .map(str::to_string)
            .unwrap_or_else(|| snake(&self.name).chars().take(1).collect())
    }

    pub fn label_name(&self) -> String {
        if self.label.is_empty() {
            snake(&self.name)
        } else {
            self.label.clone()
        }
    }

    /// The sole unique column: (field name, column) when exactly one persisted field is unique.
    pub fn unique_one(&self) -> Option<(&Field, String)> {
        let mut unique = self
            .fields
            .iter()
            .filter_map(|f| f.column().filter(|c| c.unique).map(|c| (f, c.name)));
        let first = unique.next()?;
        unique.next().is_none().then_some(first)
    }

    pub fn has_basic(&self) -> bool {
        self.fields.iter().any(|f| f.is_basic || f.is_set)
    }

    pub fn has_meta(&self) -> bool {
        self.fields.iter().any(Field::is_meta)
    }

    pub fn has_owner(&self) -> bool {
        self.fields.iter().any(Field::is_owner)
    }

    pub fn has_audit(&self) -> bool {
        self.fields.iter().any(Field::is_audit)
    }

    /// Any field eligible for the update payload.
    pub fn has_set(&self) -> bool {
        self.with_created_set
            || self
                .fields
                .iter()
                .any(|f| (f.is_set && !f.is_embed()) || f.is_meta() || f.is_owner())
    }

    /// Names of every eager-loadable relation field.
    pub fn relations(&self) -> Vec<&Field> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(i, f)| *i > 0 && f.rel_mode().is_some())
            .map(|(_, f)| f)
            .collect()
    }

    /// Belongs-to / has-one relations whose previous field is the foreign key (`Author` after
    /// `AuthorID`); these are joined in the list query.
    pub fn rel_has_one(&self) -> Vec<&Field> {
        self.fields
            .windows(2)
            .filter(|w| {
                matches!(w[1].rel_mode(), Some(RelMode::BelongsTo | RelMode::HasOne))
                    && w[0].name == format!("{}ID", w[1].name)
            })
            .map(|w| &w[1])
            .collect()
    }

    /// Columns for the text-search fallback (`query: "...,fts"`), with the mixin present.
    pub fn text_search_columns(&self) -> Option<Vec<String>> {
        let has_mixin = self.fields.iter().any(Field::is_text_search);
        let cols: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.query.ends_with("fts"))
            .filter_map(|f| f.column().map(|c| c.name))
            .collect();
        (has_mixin && !cols.is_empty()).then_some(cols)
    }

    /// Columns of fields marked sortable.
    pub fn sortable_columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.sortable)
            .filter_map(|f| {
                if f.is_owner() {
                    Some("owner_id".to_string())
                } else {
                    f.column().map(|c| c.name)
                }
            })
            .collect()
    }
}
