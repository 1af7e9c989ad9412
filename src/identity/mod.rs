use crate::errors::{ReconcileError, ValidationError};
use crate::remote::{RemoteApi, ResourceKind};

/// Outcome of a name lookup. A miss is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NotFound,
}

impl Resolution {
    pub fn id(&self) -> Option<&str> {
        match self {
            Resolution::Found(id) => Some(id),
            Resolution::NotFound => None,
        }
    }
}

/// Maps human names to remote ids. Read-only.
pub struct IdentityResolver<'a> {
    api: &'a dyn RemoteApi,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(api: &'a dyn RemoteApi) -> Self {
        Self { api }
    }

    pub async fn resolve(&self, kind: ResourceKind, name: &str) -> Result<Resolution, ReconcileError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName { kind }.into());
        }

        match self.api.find_by_name(kind, name).await {
            Ok(Some(id)) => {
                tracing::debug!("Resolved {} '{}' -> {}", kind, name, id);
                Ok(Resolution::Found(id))
            }
            Ok(None) => Ok(Resolution::NotFound),
            Err(e) => Err(ReconcileError::RemoteRead {
                kind,
                name: name.to_string(),
                message: format!("lookup failed: {}", e),
            }),
        }
    }

    /// Resolve an object that must already exist (site, device)
    pub async fn require(&self, kind: ResourceKind, name: &str) -> Result<String, ReconcileError> {
        match self.resolve(kind, name).await? {
            Resolution::Found(id) => Ok(id),
            Resolution::NotFound => Err(ReconcileError::NotFound {
                kind,
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeApi;
    use serde_json::json;

    fn api() -> FakeApi {
        let api = FakeApi::new();
        api.insert(ResourceKind::Device, "d1", json!({"name": "core-a"}));
        api.insert(ResourceKind::Topology, "t1", json!({"name": "campus"}));
        api
    }

    #[test]
    fn test_resolve_found_and_not_found() {
        let api = api();
        let resolver = IdentityResolver::new(&api);

        let found = tokio_test::block_on(resolver.resolve(ResourceKind::Device, "core-a")).unwrap();
        assert_eq!(found, Resolution::Found("d1".to_string()));
        assert_eq!(found.id(), Some("d1"));

        let missing = tokio_test::block_on(resolver.resolve(ResourceKind::Topology, "other")).unwrap();
        assert_eq!(missing, Resolution::NotFound);
    }

    #[test]
    fn test_matching_is_exact_and_case_sensitive() {
        let api = api();
        let resolver = IdentityResolver::new(&api);
        let r = tokio_test::block_on(resolver.resolve(ResourceKind::Device, "CORE-A")).unwrap();
        assert_eq!(r, Resolution::NotFound);

        // Same name under another kind does not match
        let r = tokio_test::block_on(resolver.resolve(ResourceKind::Network, "core-a")).unwrap();
        assert_eq!(r, Resolution::NotFound);
    }

    #[test]
    fn test_empty_name_is_rejected_without_a_call() {
        let api = api();
        let resolver = IdentityResolver::new(&api);
        let err = tokio_test::block_on(resolver.resolve(ResourceKind::Topology, "  ")).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::Validation(ValidationError::EmptyName { kind: ResourceKind::Topology })
        );
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_require_reports_not_found() {
        let api = api();
        let resolver = IdentityResolver::new(&api);
        let err = tokio_test::block_on(resolver.require(ResourceKind::Device, "ghost")).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::NotFound { kind: ResourceKind::Device, name: "ghost".to_string() }
        );
        assert_eq!(err.to_string(), "device 'ghost' not found");
    }
}
