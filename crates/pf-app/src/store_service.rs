//! Loading and saving the polar store.

use std::path::Path;

use pf_results::{SharedStore, StoreSnapshot};
use tracing::{debug, info};

use crate::error::AppResult;

/// Load the store kept at `path`. A missing file is an empty store.
pub fn load_store(path: &Path) -> AppResult<SharedStore> {
    if !path.exists() {
        debug!(path = %path.display(), "no store snapshot yet, starting empty");
        return Ok(SharedStore::new());
    }
    let snapshot = StoreSnapshot::load_json(path)?;
    debug!(path = %path.display(), saved = %snapshot.timestamp, "store snapshot loaded");
    Ok(snapshot.restore()?)
}

pub fn save_store(path: &Path, store: &SharedStore) -> AppResult<()> {
    StoreSnapshot::capture(store).save_json(path)?;
    info!(path = %path.display(), polars = store.len(), "store saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_snapshot_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = load_store(&dir.path().join("polars.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polars.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_store(&path), Err(crate::AppError::Results(_))));
    }
}
