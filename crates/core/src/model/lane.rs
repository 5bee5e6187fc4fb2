use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// One lane as declared by the embedding page, in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaneDeclaration {
    pub label: Option<String>,
    /// Current text of the input bound to this lane, if there is one.
    /// A non-empty value is parsed as a preset time.
    pub bound_input: Option<String>,
}

impl LaneDeclaration {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            bound_input: None,
        }
    }

    pub fn with_input(mut self, value: impl Into<String>) -> Self {
        self.bound_input = Some(value.into());
        self
    }
}

/// A horizontal track the operator can mark a single time on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub index: usize,
    pub label: String,
    /// Mirror of the bound input; receives the formatted assigned time.
    pub bound_input: Option<String>,
    pub assigned_time: Option<Timestamp>,
}

impl Lane {
    pub fn from_declaration(index: usize, declaration: &LaneDeclaration) -> Self {
        let label = match declaration.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("Lane {}", index + 1),
        };
        Self {
            index,
            label,
            bound_input: declaration.bound_input.clone(),
            assigned_time: None,
        }
    }

    pub fn has_time(&self) -> bool {
        self.assigned_time.is_some()
    }
}
