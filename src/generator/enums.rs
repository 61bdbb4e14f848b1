//! Enum emission.
//!
//! Document enums come in two kinds that never share a code path: [`EnumKind::Ordinal`]
//! becomes a `#[repr]` Rust enum, [`EnumKind::Bitflag`] a transparent newtype with one
//! associated const per flag.

use super::code::CodeWriter;
use crate::document::naming::{camel, lc_first, shouty, snake};
use crate::document::{Enum, EnumValue, Qualifier};
use crate::error::{GenError, Result};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    Ordinal,
    Bitflag,
}

impl EnumKind {
    pub fn of(e: &Enum) -> Self {
        if e.multiple {
            EnumKind::Bitflag
        } else {
            EnumKind::Ordinal
        }
    }
}

/// One resolved enum entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<'a> {
    pub value: i64,
    pub code: String,
    /// Variant (ordinal) or const (bitflag) identifier
    pub ident: String,
    pub src: &'a EnumValue,
}

/// Underlying integer type of an enum, `i16` unless declared.
pub fn repr_type(e: &Enum, qualifier: &Qualifier) -> Result<String> {
    let ty = if e.ty.is_empty() { "i16" } else { e.ty.as_str() };
    let rust = qualifier.rust_type(ty, &mut BTreeSet::new())?;
    if !matches!(
        rust.as_str(),
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64"
    ) {
        return Err(GenError::schema(format!(
            "enum {}: underlying type {ty:?} is not an integer",
            e.name
        )));
    }
    Ok(rust)
}

fn code_of(e: &Enum, v: &EnumValue) -> String {
    let lower = v.suffix.to_lowercase();
    if e.shorted {
        lower.chars().take(3).collect()
    } else if v.lower {
        lower
    } else {
        lc_first(&v.suffix)
    }
}

/// Values and codes of the entries. For bitflags the zero-valued empty flag, when declared
/// first, is returned separately.
pub fn entries(e: &Enum) -> (Option<Entry<'_>>, Vec<Entry<'_>>) {
    match EnumKind::of(e) {
        EnumKind::Ordinal => {
            let list = e
                .values
                .iter()
                .enumerate()
                .map(|(i, v)| Entry {
                    value: v.value.unwrap_or(e.start + i as i64),
                    code: code_of(e, v),
                    ident: camel(&v.suffix),
                    src: v,
                })
                .collect();
            (None, list)
        }
        EnumKind::Bitflag => {
            let mut values = e.values.iter().peekable();
            let empty = match values.peek() {
                Some(v) if v.value == Some(0) => values.next().map(|v| Entry {
                    value: 0,
                    code: code_of(e, v),
                    ident: shouty(&v.suffix),
                    src: v,
                }),
                _ => None,
            };
            let base = e.start.max(1);
            let list = values
                .enumerate()
                .map(|(i, v)| Entry {
                    value: v.value.unwrap_or(base << i),
                    code: code_of(e, v),
                    ident: shouty(&v.suffix),
                    src: v,
                })
                .collect();
            (empty, list)
        }
    }
}

fn entry_doc(w: &mut CodeWriter, entry: &Entry<'_>) {
    let text = if entry.src.descr.is_empty() {
        &entry.src.label
    } else {
        &entry.src.descr
    };
    w.doc(text);
}

/// Writes the enum type and its impls.
pub fn emit_enum(w: &mut CodeWriter, e: &Enum, qualifier: &Qualifier) -> Result<()> {
    let repr = repr_type(e, qualifier)?;
    match EnumKind::of(e) {
        EnumKind::Ordinal => emit_ordinal(w, e, &repr),
        EnumKind::Bitflag => emit_bitflag(w, e, &repr),
    }
    tracing::debug!(name = %e.name, kind = ?EnumKind::of(e), "enum emitted");
    Ok(())
}

fn emit_ordinal(w: &mut CodeWriter, e: &Enum, repr: &str) {
    let name = &e.name;
    let (_, list) = entries(e);

    w.doc(&e.comment);
    w.line("#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]");
    w.line(format!("#[serde(into = \"{repr}\", try_from = \"{repr}\")]"));
    w.line(format!("#[repr({repr})]"));
    w.block(format!("pub enum {name}"), |w| {
        for (i, entry) in list.iter().enumerate() {
            entry_doc(w, entry);
            if i == 0 {
                w.line("#[default]");
            }
            w.line(format!("{} = {},", entry.ident, entry.value));
        }
    });
    w.blank();

    w.block(format!("impl {name}"), |w| {
        let all: Vec<String> = list.iter().map(|x| format!("{name}::{}", x.ident)).collect();
        w.line(format!(
            "pub const ALL: [{name}; {}] = [{}];",
            list.len(),
            all.join(", ")
        ));
        w.blank();
        w.block("pub fn code(self) -> &'static str", |w| {
            w.block("match self", |w| {
                for x in &list {
                    w.line(format!("{name}::{} => \"{}\",", x.ident, x.code));
                }
            });
        });
        if e.labeled {
            w.blank();
            w.block("pub fn label(self) -> &'static str", |w| {
                w.block("match self", |w| {
                    for x in &list {
                        w.line(format!("{name}::{} => \"{}\",", x.ident, label_of(x)));
                    }
                });
            });
        }
        if e.val_str {
            w.blank();
            w.block("pub fn val_str(self) -> String", |w| {
                w.line(format!("{repr}::from(self).to_string()"));
            });
        }
    });
    w.blank();

    w.block(format!("impl From<{name}> for {repr}"), |w| {
        w.block(format!("fn from(v: {name}) -> Self"), |w| {
            w.line(format!("v as {repr}"));
        });
    });
    w.blank();
    w.block(format!("impl TryFrom<{repr}> for {name}"), |w| {
        w.line("type Error = String;");
        w.blank();
        w.block(format!("fn try_from(v: {repr}) -> Result<Self, Self::Error>"), |w| {
            w.block("match v", |w| {
                for x in &list {
                    w.line(format!("{} => Ok({name}::{}),", x.value, x.ident));
                }
                w.line(format!("_ => Err(format!(\"invalid {name} value {{v}}\")),"));
            });
        });
    });

    if e.decodable {
        w.blank();
        w.block(format!("impl std::str::FromStr for {name}"), |w| {
            w.line("type Err = String;");
            w.blank();
            w.block("fn from_str(s: &str) -> Result<Self, Self::Err>", |w| {
                w.block("match s", |w| {
                    for x in &list {
                        w.line(format!("\"{}\" => Ok({name}::{}),", x.code, x.ident));
                    }
                    w.line(format!(
                        "_ => s.parse::<{repr}>().map_err(|e| e.to_string()).and_then({name}::try_from),"
                    ));
                });
            });
        });
    }
    if e.stringer {
        w.blank();
        w.block(format!("impl std::fmt::Display for {name}"), |w| {
            w.block("fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result", |w| {
                w.line("f.write_str(self.code())");
            });
        });
    }
    emit_func_all(w, e, repr, &list);
    w.blank();
}

fn emit_bitflag(w: &mut CodeWriter, e: &Enum, repr: &str) {
    let name = &e.name;
    let (empty, list) = entries(e);

    w.doc(&e.comment);
    w.line("#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]");
    w.line("#[serde(transparent)]");
    w.line(format!("pub struct {name}(pub {repr});"));
    w.blank();

    w.block(format!("impl {name}"), |w| {
        for x in empty.iter().chain(list.iter()) {
            entry_doc(w, x);
            w.line(format!("pub const {}: {name} = {name}({});", x.ident, x.value));
        }
        let all: Vec<String> = list.iter().map(|x| format!("{name}::{}", x.ident)).collect();
        w.line(format!(
            "pub const ALL: [{name}; {}] = [{}];",
            list.len(),
            all.join(", ")
        ));
        w.blank();
        w.block(format!("pub fn bits(self) -> {repr}"), |w| {
            w.line("self.0");
        });
        w.blank();
        w.block("pub fn is_empty(self) -> bool", |w| {
            w.line("self.0 == 0");
        });
        w.blank();
        w.block(format!("pub fn contains(self, other: {name}) -> bool"), |w| {
            w.line("other.0 != 0 && self.0 & other.0 == other.0");
        });
        w.blank();
        w.doc("Raw values of the flags that are set.");
        w.block(format!("pub fn vals(self) -> Vec<{repr}>"), |w| {
            w.line("Self::ALL.iter().filter(|f| self.contains(**f)).map(|f| f.0).collect()");
        });
        w.blank();
        w.doc("Code of a single flag; empty for combinations.");
        w.block("pub fn code(self) -> &'static str", |w| {
            w.block("match self.0", |w| {
                for x in empty.iter().chain(list.iter()) {
                    w.line(format!("{} => \"{}\",", x.value, x.code));
                }
                w.line("_ => \"\",");
            });
        });
        w.blank();
        w.block("pub fn codes(self) -> Vec<&'static str>", |w| {
            w.line("Self::ALL.iter().filter(|f| self.contains(**f)).map(|f| f.code()).collect()");
        });
        if e.labeled {
            w.blank();
            w.block("pub fn label(self) -> &'static str", |w| {
                w.block("match self.0", |w| {
                    for x in empty.iter().chain(list.iter()) {
                        w.line(format!("{} => \"{}\",", x.value, label_of(x)));
                    }
                    w.line("_ => \"\",");
                });
            });
        }
        if e.val_str {
            w.blank();
            w.block("pub fn val_str(self) -> String", |w| {
                w.line("self.0.to_string()");
            });
        }
    });
    w.blank();

    w.block(format!("impl From<{repr}> for {name}"), |w| {
        w.block(format!("fn from(v: {repr}) -> Self"), |w| {
            w.line(format!("{name}(v)"));
        });
    });
    w.blank();
    w.block(format!("impl From<{name}> for {repr}"), |w| {
        w.block(format!("fn from(v: {name}) -> Self"), |w| {
            w.line("v.0");
        });
    });
    w.blank();
    w.block(format!("impl std::ops::BitOr for {name}"), |w| {
        w.line("type Output = Self;");
        w.blank();
        w.block("fn bitor(self, rhs: Self) -> Self", |w| {
            w.line(format!("{name}(self.0 | rhs.0)"));
        });
    });

    if e.decodable {
        w.blank();
        w.block(format!("impl std::str::FromStr for {name}"), |w| {
            w.line("type Err = String;");
            w.blank();
            w.doc("Accepts a number or a comma separated list of codes.");
            w.block("fn from_str(s: &str) -> Result<Self, Self::Err>", |w| {
                w.block(format!("if let Ok(v) = s.parse::<{repr}>()"), |w| {
                    w.line(format!("return Ok({name}(v));"));
                });
                w.line(format!("let mut out = {name}::default();"));
                w.block("for code in s.split(',').map(str::trim).filter(|c| !c.is_empty())", |w| {
                    w.open("let flag = match code {");
                    for x in &list {
                        w.line(format!("\"{}\" => {name}::{},", x.code, x.ident));
                    }
                    w.line(format!("_ => return Err(format!(\"invalid {name} code {{code}}\")),"));
                    w.close("};");
                    w.line("out = out | flag;");
                });
                w.line("Ok(out)");
            });
        });
    }
    if e.stringer {
        w.blank();
        w.block(format!("impl std::fmt::Display for {name}"), |w| {
            w.block("fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result", |w| {
                w.line("f.write_str(&self.codes().join(\",\"))");
            });
        });
    }
    emit_func_all(w, e, repr, &list);
    w.blank();
}

fn label_of(x: &Entry<'_>) -> String {
    if x.src.label.is_empty() {
        x.src.suffix.clone()
    } else {
        x.src.label.replace('"', "\\\"")
    }
}

fn emit_func_all(w: &mut CodeWriter, e: &Enum, repr: &str, list: &[Entry<'_>]) {
    if e.func_all.is_empty() {
        return;
    }
    let name = &e.name;
    let func = snake(&e.func_all);
    w.blank();
    w.block(format!("pub fn {func}() -> &'static [{name}]"), |w| {
        w.line(format!("&{name}::ALL"));
    });
    w.blank();
    w.doc("(value, label) pairs for option lists.");
    w.block(format!("pub fn {func}_options() -> Vec<({repr}, &'static str)>"), |w| {
        let pairs: Vec<String> = list
            .iter()
            .map(|x| format!("({}, \"{}\")", x.value, label_of(x)))
            .collect();
        w.line(format!("vec![{}]", pairs.join(", ")));
    });
}
