//! Domain DTOs for the todo API.
//!
//! # Design
//! These types mirror the server's schema but are defined independently of
//! the mock-server crate; integration tests catch any schema drift. Fields the
//! server is allowed to omit (`description`, `priority`) stay `Option` so the
//! synchronizer can tell "missing" apart from a real value when it merges a
//! create response with the draft that produced it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned todo identifier.
pub type TodoId = i64;

/// Todo priority, carried on the wire as the bare integer 1..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    #[default]
    Low = 1,
    Medium = 2,
    High = 3,
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            other => Err(format!("invalid priority {other}, expected 1, 2 or 3")),
        }
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> u8 {
        p as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

/// A single todo item returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub completed: bool,
}

impl Todo {
    /// Priority used for ordering; a todo the server sent without one ranks
    /// as `Low`.
    pub fn effective_priority(&self) -> Priority {
        self.priority.unwrap_or_default()
    }
}

/// Request payload for creating a new todo. The server assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
}

impl TodoDraft {
    /// Build a draft from form input. Title and description are trimmed and
    /// a blank description is dropped.
    pub fn new(title: &str, description: &str, priority: Priority) -> Self {
        let description = description.trim();
        Self {
            title: title.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            priority,
            completed: false,
        }
    }
}

/// Request payload for replacing fields of an existing todo. Only the fields
/// present in the JSON are applied; omitted fields remain unchanged on the
/// server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateTodo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl From<&Todo> for UpdateTodo {
    /// Every field of `todo`, for a full-record replace.
    fn from(todo: &Todo) -> Self {
        Self {
            title: Some(todo.title.clone()),
            description: todo.description.clone(),
            priority: todo.priority,
            completed: Some(todo.completed),
        }
    }
}

/// Credentials for `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Registration payload for `POST /signup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Body returned by the login and signup endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Result of parsing a list response: either a sequence of todos or a
/// well-formed JSON payload of the wrong shape, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListPayload {
    Todos(Vec<Todo>),
    Malformed(String),
}

/// View predicate over the local collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !todo.completed,
            Filter::Completed => todo.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Priority::Medium).unwrap(), "2");
        let p: Priority = serde_json::from_str("3").unwrap();
        assert_eq!(p, Priority::High);
    }

    #[test]
    fn priority_rejects_out_of_range() {
        assert!(serde_json::from_str::<Priority>("0").is_err());
        assert!(serde_json::from_str::<Priority>("4").is_err());
    }

    #[test]
    fn todo_tolerates_missing_optional_fields() {
        let todo: Todo = serde_json::from_str(r#"{"id":7,"title":"Buy milk","completed":false}"#).unwrap();
        assert_eq!(todo.id, 7);
        assert!(todo.priority.is_none());
        assert!(todo.description.is_none());
        assert_eq!(todo.effective_priority(), Priority::Low);
    }

    #[test]
    fn draft_trims_input() {
        let draft = TodoDraft::new("  Buy milk ", "   ", Priority::Medium);
        assert_eq!(draft.title, "Buy milk");
        assert!(draft.description.is_none());
        assert!(!draft.completed);

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["priority"], 2);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn full_update_from_todo_carries_every_field() {
        let todo = Todo {
            id: 1,
            title: "Walk dog".to_string(),
            description: Some("twice".to_string()),
            priority: Some(Priority::High),
            completed: false,
        };
        let update = UpdateTodo::from(&todo);
        assert_eq!(update.title.as_deref(), Some("Walk dog"));
        assert_eq!(update.description.as_deref(), Some("twice"));
        assert_eq!(update.priority, Some(Priority::High));
        assert_eq!(update.completed, Some(false));
    }

    #[test]
    fn filter_predicates() {
        let mut todo = Todo {
            id: 1,
            title: "t".to_string(),
            description: None,
            priority: None,
            completed: false,
        };
        assert!(Filter::All.matches(&todo));
        assert!(Filter::Active.matches(&todo));
        assert!(!Filter::Completed.matches(&todo));
        todo.completed = true;
        assert!(!Filter::Active.matches(&todo));
        assert!(Filter::Completed.matches(&todo));
    }
}
