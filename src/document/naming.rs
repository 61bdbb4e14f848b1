//! Identifier helpers shared by the resolver and every emitter.
//!
//! Document names are written in the upper-camel style (`AuthorID`, `ListArticle`); emitted Rust
//! uses snake_case for fields/functions and SCREAMING_SNAKE_CASE for constants.

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use once_cell::sync::Lazy;
use regex::Regex;

/// `AuthorID` → `author_id`, `AuthorIDs` → `author_ids`
pub fn snake(s: &str) -> String {
    s.replace("IDs", "Ids").to_snake_case()
}

/// `content` / `content_store` → `Content` / `ContentStore`
pub fn camel(s: &str) -> String {
    s.to_upper_camel_case()
}

/// `Article` → `ARTICLE`
pub fn shouty(s: &str) -> String {
    s.to_shouty_snake_case()
}

pub fn lc_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn uc_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const UNCOUNTABLE: &[&str] = &["equipment", "information", "news", "series", "species", "data"];

/// English plural of an identifier; names ending in `ID` just take an `s`.
pub fn plural(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    if s.ends_with("ID") {
        return format!("{s}s");
    }
    let lower = s.to_lowercase();
    if UNCOUNTABLE.iter().any(|u| lower.ends_with(u)) {
        return s.to_string();
    }
    if let Some(head) = strip_suffix_ci(s, "erson").filter(|h| h.ends_with(['p', 'P'])) {
        return format!("{head}eople");
    }
    if let Some(head) = strip_suffix_ci(s, "y") {
        let before = head.chars().next_back().map(|c| c.to_ascii_lowercase());
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{head}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|suf| lower.ends_with(suf)) {
        return format!("{s}es");
    }
    format!("{s}s")
}

/// `s` without an ASCII `suffix`, compared case-insensitively.
fn strip_suffix_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let at = s.len().checked_sub(suffix.len())?;
    let (head, tail) = (s.get(..at)?, s.get(at..)?);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Splits a method name into action and target model: `ListArticle` → (`List`, `Article`).
pub fn cut_method(s: &str) -> Option<(&str, &str)> {
    let mut found_low = false;
    let mut found_up = false;
    for (i, c) in s.char_indices() {
        if c.is_ascii_uppercase() {
            if (found_up && found_low) || i > 2 {
                let (act, tgt) = s.split_at(i);
                return (!tgt.is_empty()).then_some((act, tgt));
            }
            found_up = true;
        }
        if c.is_ascii_lowercase() {
            found_low = true;
        }
    }
    None
}

#[allow(clippy::unwrap_used)]
static ROUTE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\[\]{}/ ]+").unwrap());

/// Permission id of a route string `"/cms/articles/{id} [put]"` → `cms-articles-id-put`.
pub fn route_id(route: &str) -> String {
    let s = route.strip_prefix("/api/").unwrap_or(route);
    let s = s.trim_matches('/');
    ROUTE_ID_RE
        .replace_all(s, "-")
        .trim_matches('-')
        .to_string()
}

/// Glob match of the `*.Suffix` form used for mixin detection.
pub fn matches_mixin(pattern_suffix: &str, names: &[&str]) -> bool {
    names.iter().any(|n| n.ends_with(pattern_suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_forms() {
        assert_eq!(plural("Article"), "Articles");
        assert_eq!(plural("AuthorID"), "AuthorIDs");
        assert_eq!(plural("Category"), "Categories");
        assert_eq!(plural("Key"), "Keys");
        assert_eq!(plural("Status"), "Statuses");
        assert_eq!(plural("Box"), "Boxes");
        assert_eq!(plural("News"), "News");
    }

    #[test]
    fn test_plural_non_ascii_names() {
        assert_eq!(plural("Person"), "People");
        assert_eq!(plural("SalesPerson"), "SalesPeople");
        assert_eq!(plural("Catégory"), "Catégories");
        assert_eq!(plural("Café"), "Cafés");
        assert_eq!(plural("Ωy"), "Ωies");
        assert_eq!(plural("文章"), "文章s");
        assert_eq!(plural("İperson"), "İpeople");
    }

    #[test]
    fn test_cut_method() {
        assert_eq!(cut_method("ListArticle"), Some(("List", "Article")));
        assert_eq!(cut_method("GetClause"), Some(("Get", "Clause")));
        assert_eq!(cut_method("PutObject"), Some(("Put", "Object")));
        assert_eq!(cut_method("Delete"), None);
    }

    #[test]
    fn test_route_id() {
        assert_eq!(route_id("/cms/articles/{id} [put]"), "cms-articles-id-put");
        assert_eq!(route_id("/api/cms/articles [get]"), "cms-articles-get");
    }

    #[test]
    fn test_case_helpers() {
        assert_eq!(snake("AuthorID"), "author_id");
        assert_eq!(snake("AuthorIDs"), "author_ids");
        assert_eq!(camel("content"), "Content");
        assert_eq!(lc_first("ListArticle"), "listArticle");
        assert_eq!(shouty("ArticleTag"), "ARTICLE_TAG");
    }
}
