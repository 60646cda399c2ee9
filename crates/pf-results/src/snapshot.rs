//! JSON snapshots of a [`SharedStore`].

use std::fs;
use std::path::Path;

use pf_polars::{BoundaryLayerRecord, ReferenceCurve};
use serde::{Deserialize, Serialize};

use crate::palette::Color;
use crate::store::SharedStore;
use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub curve: ReferenceCurve,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// RFC 3339 time the snapshot was taken
    pub timestamp: String,
    pub entries: Vec<SnapshotEntry>,
    #[serde(default)]
    pub details: Vec<BoundaryLayerRecord>,
}

impl StoreSnapshot {
    pub fn capture(store: &SharedStore) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            entries: store
                .entries()
                .into_iter()
                .map(|e| SnapshotEntry {
                    curve: (*e.curve).clone(),
                    color: e.color,
                })
                .collect(),
            details: store.all_details(),
        }
    }

    /// Build a store holding exactly the snapshot's contents and colors.
    pub fn restore(self) -> ResultsResult<SharedStore> {
        let store = SharedStore::new();
        {
            let mut inner = store.write();
            for entry in self.entries {
                let name = entry.curve.name().to_string();
                if !inner.insert_curve(entry.curve, Some(entry.color)) {
                    return Err(ResultsError::DuplicateName { name });
                }
            }
            for record in self.details {
                let name = record.name.clone();
                if !inner.insert_detail(record) {
                    return Err(ResultsError::DuplicateName { name });
                }
            }
            inner.reorder();
        }
        Ok(store)
    }

    pub fn save_json(&self, path: &Path) -> ResultsResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> ResultsResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
