use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `GET /health` as reported by the analysis backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub cache: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub apis: BTreeMap<String, String>,
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
