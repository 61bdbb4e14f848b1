use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CRUD action of a store method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    List,
    Get,
    Create,
    Update,
    Put,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "List",
            Action::Get => "Get",
            Action::Create => "Create",
            Action::Update => "Update",
            Action::Put => "Put",
            Action::Delete => "Delete",
        }
    }

    /// Shorthand letter used by `hods` groups and the `ignore` filter.
    pub fn letter(self) -> char {
        match self {
            Action::List => 'L',
            Action::Get => 'G',
            Action::Create => 'C',
            Action::Update => 'U',
            Action::Put => 'P',
            Action::Delete => 'D',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'L' => Some(Action::List),
            'G' => Some(Action::Get),
            'C' => Some(Action::Create),
            'U' => Some(Action::Update),
            'P' => Some(Action::Put),
            'D' => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn http_verb(self) -> &'static str {
        match self {
            Action::List | Action::Get => "GET",
            Action::Create => "POST",
            Action::Update | Action::Put => "PUT",
            Action::Delete => "DELETE",
        }
    }

    /// Actions addressed by `/{id}`.
    pub fn is_id_scoped(self) -> bool {
        matches!(
            self,
            Action::Get | Action::Update | Action::Put | Action::Delete
        )
    }

    pub fn is_mutating(self) -> bool {
        !matches!(self, Action::List | Action::Get)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "List" | "list" => Ok(Action::List),
            "Get" | "get" => Ok(Action::Get),
            "Create" | "create" => Ok(Action::Create),
            "Update" | "update" => Ok(Action::Update),
            "Put" | "put" => Ok(Action::Put),
            "Delete" | "delete" => Ok(Action::Delete),
            other => Err(format!("unknown action {other:?}")),
        }
    }
}
