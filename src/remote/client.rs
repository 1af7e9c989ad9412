use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;

use super::types::*;
use super::{RemoteApi, RemoteObject, ResourceKind};

/// Mist cloud API client
pub struct MistClient {
    base_url: String,
    token: String,
    org_id: String,
    site_id: Option<String>,
    client: Client,
}

impl MistClient {
    pub fn new(url: String, token: String, org_id: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            token,
            org_id,
            site_id: None,
            client,
        })
    }

    /// Scope site-level resources (devices, topologies, site setting) to one site
    pub fn with_site(mut self, site_id: &str) -> Self {
        self.site_id = Some(site_id.to_string());
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    fn site(&self) -> Result<&str> {
        self.site_id
            .as_deref()
            .ok_or_else(|| anyhow!("site-scoped request before the site was resolved"))
    }

    fn collection_path(&self, kind: ResourceKind) -> Result<String> {
        Ok(match kind {
            ResourceKind::Site => format!("orgs/{}/sites", self.org_id),
            ResourceKind::Network => format!("orgs/{}/networks", self.org_id),
            ResourceKind::Device => format!("sites/{}/devices", self.site()?),
            ResourceKind::Topology => format!("sites/{}/evpn_topologies", self.site()?),
            ResourceKind::SiteSetting => format!("sites/{}/setting", self.site()?),
        })
    }

    fn list_path(&self, kind: ResourceKind) -> Result<String> {
        let path = self.collection_path(kind)?;
        Ok(match kind {
            ResourceKind::Device => format!("{}?type=switch", path),
            _ => path,
        })
    }

    fn object_path(&self, kind: ResourceKind, id: &str) -> Result<String> {
        Ok(match kind {
            ResourceKind::Site => format!("sites/{}", id),
            // The setting has no id of its own; it is addressed by site
            ResourceKind::SiteSetting => format!("sites/{}/setting", id),
            _ => format!("{}/{}", self.collection_path(kind)?, id),
        })
    }

    /// Helper to perform a GET and decode the JSON body
    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.api_url(path);
        tracing::debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Mist API error {}: {}", status, body));
        }

        Ok(resp.json().await?)
    }

    /// Helper to send a JSON body with POST or PUT
    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &RemoteObject,
    ) -> Result<T> {
        let url = self.api_url(path);
        tracing::debug!("{} {}", method, url);

        let resp = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Mist API {} error {}: {}", method, status, body));
        }

        Ok(resp.json().await?)
    }

    /// Identify the token owner
    pub async fn whoami(&self) -> Result<SelfInfo> {
        self.get_json("self").await
    }

    /// Test connectivity and credentials
    pub async fn test_connection(&self) -> bool {
        match self.whoami().await {
            Ok(info) => {
                tracing::info!("Connected to {} as {}", self.base_url, info.display_name());
                true
            }
            Err(e) => {
                tracing::warn!("Connectivity check failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl RemoteApi for MistClient {
    async fn find_by_name(&self, kind: ResourceKind, name: &str) -> Result<Option<String>> {
        if kind == ResourceKind::SiteSetting {
            return Err(anyhow!("site settings are addressed by site id, not by name"));
        }

        let items: Vec<NamedRef> = self.get_json(&self.list_path(kind)?).await?;
        Ok(items
            .into_iter()
            .find(|item| item.name.as_deref() == Some(name))
            .map(|item| item.id))
    }

    async fn fetch(&self, kind: ResourceKind, id: &str) -> Result<RemoteObject> {
        self.get_json(&self.object_path(kind, id)?).await
    }

    async fn create(&self, kind: ResourceKind, object: &RemoteObject) -> Result<String> {
        match kind {
            ResourceKind::Topology | ResourceKind::Network => {}
            _ => return Err(anyhow!("{} objects are never created", kind)),
        }
        let created: NamedRef = self
            .send_json(Method::POST, &self.collection_path(kind)?, object)
            .await?;
        Ok(created.id)
    }

    async fn update(&self, kind: ResourceKind, id: &str, object: &RemoteObject) -> Result<()> {
        if kind == ResourceKind::Site {
            return Err(anyhow!("site objects are never updated"));
        }
        let _: serde_json::Value = self
            .send_json(Method::PUT, &self.object_path(kind, id)?, object)
            .await?;
        Ok(())
    }
}
