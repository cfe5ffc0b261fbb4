use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of file mutation. The kebab-case name is part of every backup file
/// name, so it must never contain `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationType {
    Create,
    Replace,
    Before,
    After,
    Append,
    /// Current state captured right before a restore.
    PreRestore,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Replace => "replace",
            OperationType::Before => "before",
            OperationType::After => "after",
            OperationType::Append => "append",
            OperationType::PreRestore => "pre-restore",
        }
    }

    /// Whether the operation needs a search pattern.
    pub fn requires_pattern(&self) -> bool {
        matches!(
            self,
            OperationType::Replace | OperationType::Before | OperationType::After
        )
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(OperationType::Create),
            "replace" => Ok(OperationType::Replace),
            "before" | "insert-before" | "insert_before" => Ok(OperationType::Before),
            "after" | "insert-after" | "insert_after" => Ok(OperationType::After),
            "append" => Ok(OperationType::Append),
            "pre-restore" => Ok(OperationType::PreRestore),
            other => Err(format!("unknown operation '{other}'")),
        }
    }
}
