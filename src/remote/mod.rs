pub mod client;
#[cfg(test)]
pub mod fake;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub use client::MistClient;

/// A remote object as returned by the API: a JSON object with arbitrary fields
pub type RemoteObject = serde_json::Map<String, serde_json::Value>;

/// Fields the remote system owns and that are never sent back
pub const READ_ONLY_FIELDS: &[&str] = &["id", "org_id", "site_id", "created_time", "modified_time"];

/// Kind of remote resource handled by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Site,
    SiteSetting,
    Device,
    Topology,
    Network,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Site => write!(f, "site"),
            ResourceKind::SiteSetting => write!(f, "site setting"),
            ResourceKind::Device => write!(f, "device"),
            ResourceKind::Topology => write!(f, "topology"),
            ResourceKind::Network => write!(f, "network"),
        }
    }
}

/// Single-object operations against the remote inventory.
///
/// Implementations do no batching or retries; every call is one request.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Exact, case-sensitive lookup on the name field
    async fn find_by_name(&self, kind: ResourceKind, name: &str) -> Result<Option<String>>;

    async fn fetch(&self, kind: ResourceKind, id: &str) -> Result<RemoteObject>;

    /// Create an object and return its new id
    async fn create(&self, kind: ResourceKind, object: &RemoteObject) -> Result<String>;

    async fn update(&self, kind: ResourceKind, id: &str, object: &RemoteObject) -> Result<()>;
}
