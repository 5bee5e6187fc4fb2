use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One entry of the session directory listing.
///
/// The directory is written lazily by the capture server, so every field may
/// be missing while a session is still being set up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionIndexEntry {
    #[serde(default)]
    pub time_start: Option<f64>,
    #[serde(default)]
    pub time_span: Option<f64>,
    #[serde(default)]
    pub last_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

/// The directory `index.json`: session key → entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionIndex {
    pub sessions: BTreeMap<String, SessionIndexEntry>,
}

impl SessionIndex {
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Session keys, newest first (keys are timestamp-prefixed).
    pub fn keys_newest_first(&self) -> Vec<&str> {
        self.sessions.keys().rev().map(String::as_str).collect()
    }

    pub fn get(&self, key: &str) -> Option<&SessionIndexEntry> {
        self.sessions.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }
}
