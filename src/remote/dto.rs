use serde::{Deserialize, Serialize};

use crate::models::Priority;

/// PATCH body for `/tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskUpdate {
    #[serde(rename_all = "camelCase")]
    Fields {
        text: String,
        is_completed: bool,
        priority: Priority,
    },
    #[serde(rename_all = "camelCase")]
    Completion { is_completed: bool },
}
