//! Run-scoped snapshots of remote objects, captured before any write.

use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::remote::{RemoteApi, RemoteObject, ResourceKind};

/// Immutable copy of one remote object as it was when first fetched in this run
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSnapshot {
    pub kind: ResourceKind,
    pub id: String,
    pub object: RemoteObject,
}

impl LiveSnapshot {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.object.get(field)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(|v| v.as_str())
    }
}

/// Snapshots keyed by (kind, id). Each identity is fetched at most once.
#[derive(Debug, Default)]
pub struct LiveCache {
    snapshots: HashMap<(ResourceKind, String), Arc<LiveSnapshot>>,
}

impl LiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot, fetching it on first request
    pub async fn snapshot(
        &mut self,
        api: &dyn RemoteApi,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Arc<LiveSnapshot>> {
        let key = (kind, id.to_string());
        if let Some(snapshot) = self.snapshots.get(&key) {
            return Ok(Arc::clone(snapshot));
        }

        let object = api.fetch(kind, id).await?;
        tracing::debug!("Captured live {} {} ({} fields)", kind, id, object.len());
        let snapshot = Arc::new(LiveSnapshot {
            kind,
            id: id.to_string(),
            object,
        });
        self.snapshots.insert(key, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn get(&self, kind: ResourceKind, id: &str) -> Option<Arc<LiveSnapshot>> {
        self.snapshots.get(&(kind, id.to_string())).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
