use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Store key of the entry holding every view instance's layout.
pub const LAYOUTS_KEY: &str = "layouts";

/// Persisted layout of one lane view instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    #[serde(default)]
    pub lane_height_percentages: Vec<f64>,
    /// RFC 3339 marked time per lane, `null` where unset.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marked_times: Vec<Option<String>>,
}

/// View-instance id → layout record.
pub type LayoutBook = BTreeMap<String, LayoutRecord>;
