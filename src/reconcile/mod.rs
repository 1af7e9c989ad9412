use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::derive::{derive_core_addresses, port_roles, PortRoles};
use crate::errors::{Action, ReconcileError};
use crate::identity::{IdentityResolver, Resolution};
use crate::live::{LiveCache, LiveSnapshot};
use crate::merge::plans::{normalize_mac, Addressing};
use crate::merge::{
    changed_fields, device_plan, merge, network_plan, site_setting_plan, topology_plan, EntityPlan,
    FabricDevice, FinalObject, FinalState,
};
use crate::models::DesiredState;
use crate::remote::{RemoteApi, ResourceKind};

/// One successful write
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityAction {
    pub kind: ResourceKind,
    pub name: String,
    pub action: Action,
    pub remote_id: String,
    pub changed_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunCounts {
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub failed: u32,
}

/// Outcome of one reconciliation pass, printed as JSON by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub topology: String,
    pub site: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub message: String,
    pub result: RunCounts,
    pub actions: Vec<EntityAction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ReconcileError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct RunOutcome {
    pub report: RunReport,
    pub final_state: FinalState,
}

/// Reconcile one fabric against a site.
///
/// Per-entity failures are recorded in the report and never stop the run.
pub async fn run(api: &dyn RemoteApi, desired: &DesiredState, site_id: &str) -> RunOutcome {
    let mut run = Run::new(api, desired, site_id);
    tracing::info!(
        "Run {}: reconciling topology '{}' on site '{}' ({} devices, {} networks)",
        run.report.run_id,
        desired.settings.topology_name,
        desired.settings.site_name,
        desired.roles.len(),
        desired.networks.len()
    );

    let roles = match port_roles(desired) {
        Ok(roles) => roles,
        Err(errors) => {
            run.report.errors.extend(errors.into_iter().map(ReconcileError::from));
            PortRoles::new()
        }
    };

    let topology = run.resolve_topology().await;
    let devices = run.resolve_devices().await;
    let topology_id = match topology {
        Some(resolution) => run.reconcile_topology(resolution, &devices, &roles).await,
        None => None,
    };
    let addressing = run.reconcile_networks().await;
    run.reconcile_site_setting(topology_id.as_deref()).await;
    run.reconcile_devices(&devices, &roles, &addressing).await;

    run.finish()
}

struct Run<'a> {
    api: &'a dyn RemoteApi,
    desired: &'a DesiredState,
    site_id: &'a str,
    cache: LiveCache,
    report: RunReport,
    final_state: FinalState,
}

impl<'a> Run<'a> {
    fn new(api: &'a dyn RemoteApi, desired: &'a DesiredState, site_id: &'a str) -> Self {
        let now = Utc::now();
        Self {
            api,
            desired,
            site_id,
            cache: LiveCache::new(),
            report: RunReport {
                run_id: Uuid::new_v4(),
                topology: desired.settings.topology_name.clone(),
                site: desired.settings.site_name.clone(),
                started_at: now,
                finished_at: now,
                message: String::new(),
                result: RunCounts::default(),
                actions: Vec::new(),
                errors: Vec::new(),
                warnings: Vec::new(),
            },
            final_state: FinalState::default(),
        }
    }

    fn resolver(&self) -> IdentityResolver<'a> {
        IdentityResolver::new(self.api)
    }

    fn fail(&mut self, error: ReconcileError) {
        tracing::warn!("{}", error);
        self.report.errors.push(error);
    }

    async fn snapshot(&mut self, kind: ResourceKind, name: &str, id: &str) -> Option<Arc<LiveSnapshot>> {
        match self.cache.snapshot(self.api, kind, id).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                self.fail(ReconcileError::RemoteRead {
                    kind,
                    name: name.to_string(),
                    message: format!("fetch failed: {}", e),
                });
                None
            }
        }
    }

    async fn resolve_topology(&mut self) -> Option<Resolution> {
        let name = &self.desired.settings.topology_name;
        match self.resolver().resolve(ResourceKind::Topology, name).await {
            Ok(resolution) => {
                let mode = if resolution == Resolution::NotFound { "create" } else { "update" };
                tracing::info!("Topology '{}': {} mode", name, mode);
                Some(resolution)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    /// Resolve and snapshot every device in FABRIC order, before anything is written
    async fn resolve_devices(&mut self) -> Vec<FabricDevice> {
        let mut devices = Vec::new();

        for assignment in &self.desired.roles {
            let hostname = assignment.hostname.as_str();
            let id = match self.resolver().require(ResourceKind::Device, hostname).await {
                Ok(id) => id,
                Err(e) => {
                    self.fail(e);
                    continue;
                }
            };
            let Some(snapshot) = self.snapshot(ResourceKind::Device, hostname, &id).await else {
                continue;
            };

            let mac = normalize_mac(snapshot.str_field("mac").unwrap_or_default());
            if mac.is_empty() {
                self.report
                    .warnings
                    .push(format!("device '{}' has no MAC address; left out of the topology", hostname));
            }
            devices.push(FabricDevice {
                hostname: hostname.to_string(),
                role: assignment.role,
                id,
                mac,
            });
        }

        tracing::info!("Resolved {}/{} devices", devices.len(), self.desired.roles.len());
        devices
    }

    async fn reconcile_topology(
        &mut self,
        resolution: Resolution,
        devices: &[FabricDevice],
        roles: &PortRoles,
    ) -> Option<String> {
        let name = self.desired.settings.topology_name.clone();
        let members: Vec<FabricDevice> = devices.iter().filter(|d| !d.mac.is_empty()).cloned().collect();
        let plan = topology_plan(self.desired, &members, roles);

        let live = match &resolution {
            Resolution::Found(id) => match self.snapshot(ResourceKind::Topology, &name, id).await {
                Some(snapshot) => Some(snapshot),
                // The id is still good for linking the site setting
                None => return Some(id.clone()),
            },
            Resolution::NotFound => None,
        };

        self.write(&plan, live).await.or_else(|| resolution.id().map(str::to_string))
    }

    async fn reconcile_networks(&mut self) -> Addressing {
        let mut addressing = Addressing::new();
        let cores = self.desired.core_devices();

        for network in &self.desired.networks {
            match derive_core_addresses(network, &cores) {
                Ok(derived) => {
                    addressing.insert(network.name.clone(), derived);
                }
                Err(e) => {
                    self.fail(e.into());
                    continue;
                }
            }

            let Some(plan) = network_plan(self.desired, &network.name) else {
                continue;
            };
            let live = match self.resolver().resolve(ResourceKind::Network, &network.name).await {
                Ok(Resolution::Found(id)) => {
                    match self.snapshot(ResourceKind::Network, &network.name, &id).await {
                        Some(snapshot) => Some(snapshot),
                        None => continue,
                    }
                }
                Ok(Resolution::NotFound) => None,
                Err(e) => {
                    self.fail(e);
                    continue;
                }
            };
            self.write(&plan, live).await;
        }

        addressing
    }

    async fn reconcile_site_setting(&mut self, topology_id: Option<&str>) {
        let site_name = self.desired.settings.site_name.clone();
        let Some(live) = self.snapshot(ResourceKind::SiteSetting, &site_name, self.site_id).await else {
            return;
        };
        let plan = site_setting_plan(self.desired, topology_id);
        self.write(&plan, Some(live)).await;
    }

    async fn reconcile_devices(&mut self, devices: &[FabricDevice], roles: &PortRoles, addressing: &Addressing) {
        for device in devices {
            // Captured in resolve_devices, before the topology write
            let Some(live) = self.cache.get(ResourceKind::Device, &device.id) else {
                continue;
            };
            let plan = device_plan(self.desired, device, roles, addressing);
            self.write(&plan, Some(live)).await;
        }
    }

    /// Merge, then create or update. Returns the remote id on success.
    async fn write(&mut self, plan: &EntityPlan, live: Option<Arc<LiveSnapshot>>) -> Option<String> {
        let mut object = merge(plan, live.as_deref());
        let before = live.map(|s| s.object.clone()).unwrap_or_default();
        let changed = changed_fields(&before, &object.body);

        let (action, result) = match object.remote_id.clone() {
            Some(id) if changed.is_empty() => {
                tracing::info!("{} '{}' unchanged", plan.kind, plan.name);
                self.report.result.unchanged += 1;
                self.record(object);
                return Some(id);
            }
            Some(id) => (
                Action::Update,
                self.api.update(plan.kind, &id, &object.body).await.map(|_| id),
            ),
            None => (Action::Create, self.api.create(plan.kind, &object.body).await),
        };

        match result {
            Ok(id) => {
                tracing::info!(
                    "{} {} '{}' ({} changed fields)",
                    if action == Action::Create { "Created" } else { "Updated" },
                    plan.kind,
                    plan.name,
                    changed.len()
                );
                match action {
                    Action::Create => self.report.result.created += 1,
                    Action::Update => self.report.result.updated += 1,
                }
                self.report.actions.push(EntityAction {
                    kind: plan.kind,
                    name: plan.name.clone(),
                    action,
                    remote_id: id.clone(),
                    changed_fields: changed,
                });
                object.remote_id = Some(id.clone());
                self.record(object);
                Some(id)
            }
            Err(e) => {
                self.fail(ReconcileError::RemoteWrite {
                    kind: plan.kind,
                    name: plan.name.clone(),
                    action,
                    message: e.to_string(),
                    changed_fields: changed,
                });
                self.record(object);
                None
            }
        }
    }

    fn record(&mut self, object: FinalObject) {
        match object.kind {
            ResourceKind::Topology => self.final_state.topology = Some(object),
            ResourceKind::SiteSetting => self.final_state.site_setting = Some(object),
            ResourceKind::Network => self.final_state.networks.push(object),
            ResourceKind::Device => self.final_state.devices.push(object),
            ResourceKind::Site => {}
        }
    }

    fn finish(mut self) -> RunOutcome {
        let report = &mut self.report;
        report.finished_at = Utc::now();
        tracing::debug!("{} live snapshots captured", self.cache.len());
        report.result.failed = report.errors.len() as u32;
        report.message = format!(
            "Reconciled '{}': {} created, {} updated, {} unchanged, {} failed",
            report.topology,
            report.result.created,
            report.result.updated,
            report.result.unchanged,
            report.result.failed
        );
        tracing::info!("{}", report.message);

        RunOutcome {
            report: self.report,
            final_state: self.final_state,
        }
    }
}
