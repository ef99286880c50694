use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Function as described by the deployment service
///
/// Only looked up, never created by the deploy step.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub id: String,

    #[serde(default)]
    pub folder_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// E.g. ACTIVE, CREATING
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub http_invoke_url: String,

    /// RFC 3339 timestamp
    #[serde(default)]
    pub created_at: String,

    #[serde(default)]
    pub log_group_id: String,

    #[serde(default)]
    pub labels: HashMap<String, String>,
}
