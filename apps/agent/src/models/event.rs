use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Modify,
    Delete,
    /// Anything the capture side emits that stages do not understand.
    #[serde(other)]
    Other,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Modify => "MODIFY",
            ChangeKind::Delete => "DELETE",
            ChangeKind::Other => "OTHER",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "INSERT" => ChangeKind::Insert,
            "MODIFY" => ChangeKind::Modify,
            "DELETE" => ChangeKind::Delete,
            _ => ChangeKind::Other,
        }
    }
}

/// One captured write to the record store. `new_image` is the whole record after the
/// write, kept untyped: stages decode it themselves and treat decode failures as
/// malformed records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_kind: ChangeKind,
    pub key: String,
    #[serde(default)]
    pub new_image: Option<Value>,
}

impl ChangeEvent {
    pub fn new(event_kind: ChangeKind, key: impl Into<String>, new_image: Value) -> Self {
        Self {
            event_kind,
            key: key.into(),
            new_image: Some(new_image),
        }
    }
}
