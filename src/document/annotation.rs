//! Field-level query annotations: `kind[,ext]`.
//!
//! | kind                  | predicate                               |
//! |-----------------------|-----------------------------------------|
//! | `equal`               | equality                                |
//! | `ice`, `ilike`, `ice2`| case-insensitive contains               |
//! | `match`, `match2`     | substring match                         |
//! | `date`                | date range (int-encoded for DateTime)   |
//! | `great` / `less`      | comparison                              |
//! | `oids`                | opaque-id membership                    |
//! | `custom`              | spec field only, predicate hand-written |
//! | `fts`                 | text-search column only                 |
//!
//! Extensions: `ints`/`strs`/`oids` add a plural multi-value companion field, `decode` parses
//! a typed value from a string, `hasVals` tests aggregate bitmask membership, `fts` adds the
//! column to the text-search fallback.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiftKind {
    Equal,
    Ice,
    Match,
    Date,
    Great,
    Less,
    Oids,
    Custom,
    TextOnly,
}

/// Element type of a multi-value companion field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiKind {
    Ints,
    Strs,
    Oids,
}

impl MultiKind {
    /// Runtime parser that turns the comma-separated string into a list.
    pub fn parser(self) -> &'static str {
        match self {
            MultiKind::Ints => "utils::parse_ints",
            MultiKind::Strs => "utils::parse_strs",
            MultiKind::Oids => "oid::parse_oids",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAnnotation {
    pub kind: SiftKind,
    /// Applies to both sides (`ice2`, `match2`)
    pub both: bool,
    pub ext: String,
    pub multi: Option<MultiKind>,
    pub decode: bool,
    pub has_vals: bool,
}

impl QueryAnnotation {
    /// Parses an annotation; `Ok(None)` for an empty one.
    pub fn parse(s: &str) -> Result<Option<Self>, String> {
        if s.is_empty() {
            return Ok(None);
        }
        let (kind, ext) = s.split_once(',').unwrap_or((s, ""));
        let (kind, both) = match kind {
            "equal" => (SiftKind::Equal, false),
            "ice" | "ilike" => (SiftKind::Ice, false),
            "ice2" => (SiftKind::Ice, true),
            "match" => (SiftKind::Match, false),
            "match2" => (SiftKind::Match, true),
            "date" => (SiftKind::Date, false),
            "great" => (SiftKind::Great, false),
            "less" => (SiftKind::Less, false),
            "oids" => (SiftKind::Oids, false),
            "custom" => (SiftKind::Custom, false),
            "fts" => (SiftKind::TextOnly, false),
            other => return Err(format!("unknown query kind {other:?} in {s:?}")),
        };
        let multi = match ext {
            "ints" => Some(MultiKind::Ints),
            "strs" => Some(MultiKind::Strs),
            "oids" => Some(MultiKind::Oids),
            _ => None,
        };
        Ok(Some(Self {
            kind,
            both,
            ext: ext.to_string(),
            multi,
            decode: ext == "decode",
            has_vals: ext == "hasVals",
        }))
    }

    pub fn is_fts(&self) -> bool {
        self.kind == SiftKind::TextOnly || self.ext == "fts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_value_annotation() {
        let q = QueryAnnotation::parse("equal,oids").unwrap().unwrap();
        assert_eq!(q.kind, SiftKind::Equal);
        assert_eq!(q.multi, Some(MultiKind::Oids));
        assert!(!q.decode);
    }

    #[test]
    fn test_parse_variants() {
        let q = QueryAnnotation::parse("ice2").unwrap().unwrap();
        assert_eq!((q.kind, q.both), (SiftKind::Ice, true));
        assert!(QueryAnnotation::parse("equal,decode").unwrap().unwrap().decode);
        assert!(QueryAnnotation::parse("match,fts").unwrap().unwrap().is_fts());
        assert!(QueryAnnotation::parse("").unwrap().is_none());
        assert!(QueryAnnotation::parse("fuzzy").is_err());
    }
}
