//! pf-results: the shared polar store and the merge step that feeds it.

pub mod error;
pub mod merger;
pub mod palette;
pub mod snapshot;
pub mod store;

pub use error::{ResultsError, ResultsResult};
pub use merger::{MergeReport, ResultMerger};
pub use palette::Color;
pub use snapshot::{SnapshotEntry, StoreSnapshot};
pub use store::{SharedStore, StoreEntry, StoreEvent};
