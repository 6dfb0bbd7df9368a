use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::debug;

use pathway_core::error::{PathwayError, Result};
use pathway_core::traits::SnapshotStore;
use pathway_core::types::{JourneySnapshot, SnapshotMap};
use pathway_graph::LayoutEngine;

use crate::journey::Journey;

/// In-process snapshot store holding the keyed document in memory.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<SnapshotMap>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document previously written by `to_json`.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshots: SnapshotMap = serde_json::from_str(json)?;
        for (key, snapshot) in &snapshots {
            if key != &snapshot.journey_id {
                return Err(PathwayError::Storage(format!(
                    "snapshot keyed {} holds journey {}",
                    key, snapshot.journey_id
                )));
            }
        }
        Ok(Self {
            snapshots: RwLock::new(snapshots),
        })
    }

    /// The whole store as a JSON object keyed by journey id.
    pub async fn to_json(&self) -> Result<String> {
        let snapshots = self.snapshots.read().await;
        Ok(serde_json::to_string_pretty(&*snapshots)?)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, journey_id: &str) -> BoxFuture<'_, Result<Option<JourneySnapshot>>> {
        let journey_id = journey_id.to_string();
        Box::pin(async move { Ok(self.snapshots.read().await.get(&journey_id).cloned()) })
    }

    fn save(&self, snapshot: JourneySnapshot) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if snapshot.journey_id.is_empty() {
                return Err(PathwayError::Storage("snapshot has no journey id".into()));
            }
            debug!(journey_id = %snapshot.journey_id, nodes = snapshot.nodes.len(), "Snapshot saved");
            self.snapshots
                .write()
                .await
                .insert(snapshot.journey_id.clone(), snapshot);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move { Ok(self.snapshots.read().await.keys().cloned().collect()) })
    }
}

impl Journey {
    pub async fn save_to(&self, store: &dyn SnapshotStore) -> Result<()> {
        store.save(self.snapshot()).await
    }

    /// Restore `journey_id` from `store`, if it was ever saved.
    pub async fn load_from(
        store: &dyn SnapshotStore,
        journey_id: &str,
        engine: LayoutEngine,
    ) -> Result<Option<Journey>> {
        match store.load(journey_id).await? {
            Some(snapshot) => Ok(Some(Journey::from_snapshot(snapshot, engine)?)),
            None => Ok(None),
        }
    }
}
