//! Namespace qualification: maps the `ns.Type` notation of the document onto Rust paths.

use super::types::Tags;
use crate::error::{GenError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Namespaces every generated project can use without declaring them.
pub const DEFAULT_QUALS: [(&str, &str); 4] = [
    ("comm", "crate::models::comm"),
    ("oid", "crate::models::oid"),
    ("pgx", "crate::pgx"),
    ("utils", "crate::utils"),
];

/// Resolves namespaces through the document's `depends` table on top of [`DEFAULT_QUALS`].
///
/// Resolutions are memoized; the cache sits behind a mutex so one qualifier can be shared by
/// reference between emitters.
#[derive(Debug)]
pub struct Qualifier {
    table: BTreeMap<String, String>,
    cache: Mutex<BTreeMap<String, String>>,
}

impl Qualifier {
    pub fn new(depends: &Tags) -> Self {
        let mut table: BTreeMap<String, String> = DEFAULT_QUALS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in depends {
            table.insert(k.clone(), v.replace('/', "::").replace('.', "::"));
        }
        if depends.contains_key("oid") && !depends.contains_key("utils") {
            table.remove("utils");
        }
        Self {
            table,
            cache: Mutex::new(BTreeMap::new()),
        }
    }

    /// Import path of a namespace.
    ///
    /// `utils` falls back to the sibling of the `oid` path when it is not mapped directly
    /// (`app::models::oid` → `app::models::utils`).
    pub fn resolve(&self, ns: &str) -> Option<String> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(hit) = cache.get(ns) {
                return Some(hit.clone());
            }
        }
        let found = self.table.get(ns).cloned().or_else(|| {
            if ns != "utils" {
                return None;
            }
            let oid = self.table.get("oid")?;
            let (parent, _) = oid.rsplit_once("::")?;
            Some(format!("{parent}::utils"))
        })?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(ns.to_string(), found.clone());
        }
        Some(found)
    }

    /// `use` line for a namespace, aliased when the path ends in a different segment.
    pub fn use_line(&self, ns: &str) -> Result<String> {
        let path = self
            .resolve(ns)
            .ok_or_else(|| GenError::resolution(format!("unresolvable namespace {ns:?}")))?;
        let last = path.rsplit("::").next().unwrap_or_default();
        if last == ns {
            Ok(format!("use {path};"))
        } else {
            Ok(format!("use {path} as {ns};"))
        }
    }

    /// Renders a document type as Rust, recording the namespaces it needs in `imports`.
    pub fn rust_type(&self, ty: &str, imports: &mut BTreeSet<String>) -> Result<String> {
        let ty = ty.trim();
        if let Some(inner) = ty.strip_prefix('*') {
            return Ok(format!("Option<{}>", self.rust_type(inner, imports)?));
        }
        if let Some(inner) = ty.strip_prefix("[]") {
            return Ok(format!("Vec<{}>", self.rust_type(inner, imports)?));
        }
        if let Some(rest) = ty.strip_prefix("map[") {
            let (key, value) = rest
                .split_once(']')
                .ok_or_else(|| GenError::resolution(format!("malformed map type {ty:?}")))?;
            return Ok(format!(
                "std::collections::BTreeMap<{}, {}>",
                self.rust_type(key, imports)?,
                self.rust_type(value, imports)?
            ));
        }
        if let Some(prim) = primitive(ty) {
            return Ok(prim.to_string());
        }
        if ty.contains('<') || ty.contains("::") {
            if let Some((ns, _)) = ty.split_once("::") {
                if self.resolve(ns).is_some() {
                    imports.insert(ns.to_string());
                }
            }
            return Ok(ty.to_string());
        }
        match ty.split_once('.') {
            Some((ns, name)) => {
                if self.resolve(ns).is_none() {
                    return Err(GenError::resolution(format!(
                        "unresolvable namespace {ns:?} in type {ty:?}"
                    )));
                }
                imports.insert(ns.to_string());
                Ok(format!("{ns}::{name}"))
            }
            None => Ok(ty.to_string()),
        }
    }

    /// Checks that a type only uses resolvable namespaces.
    pub fn check(&self, ty: &str) -> Result<()> {
        self.rust_type(ty, &mut BTreeSet::new()).map(|_| ())
    }
}

fn primitive(ty: &str) -> Option<&'static str> {
    Some(match ty {
        "string" | "String" => "String",
        "bool" => "bool",
        "int" | "int32" | "i32" => "i32",
        "int8" | "i8" => "i8",
        "int16" | "i16" => "i16",
        "int64" | "i64" => "i64",
        "uint" | "uint32" | "u32" => "u32",
        "uint8" | "byte" | "u8" => "u8",
        "uint16" | "u16" => "u16",
        "uint64" | "u64" => "u64",
        "float32" | "f32" => "f32",
        "float64" | "f64" => "f64",
        "any" | "interface{}" => "serde_json::Value",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_override() {
        let mut depends = Tags::new();
        depends.insert("oid".to_string(), "app/models/oid".to_string());
        let q = Qualifier::new(&depends);
        assert_eq!(q.resolve("oid").as_deref(), Some("app::models::oid"));
        assert_eq!(q.resolve("comm").as_deref(), Some("crate::models::comm"));
        assert_eq!(q.resolve("nope"), None);
    }

    #[test]
    fn test_utils_sibling_fallback() {
        let mut depends = Tags::new();
        depends.insert("oid".to_string(), "app::ids::oid".to_string());
        let q = Qualifier::new(&depends);
        assert_eq!(q.resolve("utils").as_deref(), Some("app::ids::utils"));
        // cached on the second lookup
        assert_eq!(q.resolve("utils").as_deref(), Some("app::ids::utils"));
    }

    #[test]
    fn test_rust_type_rendering() {
        let q = Qualifier::new(&Tags::new());
        let mut imports = BTreeSet::new();
        assert_eq!(q.rust_type("oid.OID", &mut imports).unwrap(), "oid::OID");
        assert_eq!(q.rust_type("[]string", &mut imports).unwrap(), "Vec<String>");
        assert_eq!(q.rust_type("*Author", &mut imports).unwrap(), "Option<Author>");
        assert_eq!(
            q.rust_type("map[string]int64", &mut imports).unwrap(),
            "std::collections::BTreeMap<String, i64>"
        );
        assert!(imports.contains("oid"));
        assert!(matches!(
            q.rust_type("geo.Point", &mut imports),
            Err(GenError::Resolution(_))
        ));
    }

    #[test]
    fn test_use_line_aliases_foreign_segment() {
        let mut depends = Tags::new();
        depends.insert("oid".to_string(), "app::ids".to_string());
        let q = Qualifier::new(&depends);
        assert_eq!(q.use_line("oid").unwrap(), "use app::ids as oid;");
        assert_eq!(q.use_line("comm").unwrap(), "use crate::models::comm;");
    }
}
