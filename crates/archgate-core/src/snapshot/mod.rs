//! Snapshots: persisted graphs and the diff between two of them.
//!
//! The core only defines the values and the [`SnapshotStore`] seam; where
//! snapshots live is up to the store implementation.

mod builder;
mod diff;
mod types;

pub use builder::SnapshotBuilder;
pub use diff::{
    DiffDetails, EdgeChange, EdgeDiff, FieldChange, NodeChange, NodeDiff, SnapshotDiff,
    SnapshotDiffEngine,
};
pub use types::{InvalidSnapshotRef, Snapshot, SnapshotMeta, SnapshotRef, SNAPSHOT_SCHEMA_VERSION};

/// Persistence for snapshots.
pub trait SnapshotStore {
    /// Where a saved snapshot ended up (a path, a URL, ...).
    type Location;
    /// Store failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Loads the snapshot saved under `reference`.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the snapshot is missing or unreadable.
    fn load(&self, reference: &SnapshotRef) -> Result<Snapshot, Self::Error>;

    /// Saves `snapshot` under `reference`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the snapshot cannot be written.
    fn save(&self, snapshot: &Snapshot, reference: &SnapshotRef)
        -> Result<Self::Location, Self::Error>;

    /// Whether a snapshot exists under `reference`.
    fn exists(&self, reference: &SnapshotRef) -> bool;
}
