use regex_lite::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use crate::errors::ValidationError;
use crate::models::{port_usage, DesiredState, Role};

/// EVPN role of one port, as written into `port_config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortRole {
    pub usage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub esilag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ae_idx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_name: Option<String>,
}

/// hostname -> port key -> role
pub type PortRoles = BTreeMap<String, BTreeMap<String, PortRole>>;

fn channel_suffix() -> Option<&'static Regex> {
    static CHANNEL_SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();
    CHANNEL_SUFFIX
        .get_or_init(|| Regex::new(r"^([^:]+):\d+$").ok())
        .as_ref()
}

/// Strip a channel suffix: `et-0/0/0:2` -> `et-0/0/0`
pub fn base_port(port: &str) -> &str {
    channel_suffix()
        .and_then(|re| re.captures(port))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(port)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CoreLink {
    core1: String,
    port1: String,
    core2: String,
    port2: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EsiMember {
    core: String,
    core_port: String,
    access: String,
    access_port: String,
}

/// Assign EVPN port roles from the cabling declared in INTERFACES.
///
/// Core-to-access rows sharing an AE_IDX form one ESI-LAG. Core-to-core rows
/// become numbered links whose uplink/downlink direction alternates.
pub fn port_roles(state: &DesiredState) -> Result<PortRoles, Vec<ValidationError>> {
    let esi_lag_name = state.settings.esi_lag_name.as_str();
    let mut core_links: BTreeSet<CoreLink> = BTreeSet::new();
    let mut esi_groups: BTreeMap<u32, BTreeSet<EsiMember>> = BTreeMap::new();

    for iface in &state.interfaces {
        let Some(link) = &iface.link else { continue };
        let own_role = state.role_of(&iface.hostname);
        let peer_role = state.role_of(&link.peer_hostname);

        match (own_role, peer_role) {
            (Some(Role::Core), Some(Role::Core)) => {
                // The same cable may be declared from either end
                let a = (iface.hostname.clone(), iface.port.clone());
                let b = (link.peer_hostname.clone(), link.peer_port.clone());
                let (first, second) = if a <= b { (a, b) } else { (b, a) };
                core_links.insert(CoreLink {
                    core1: first.0,
                    port1: first.1,
                    core2: second.0,
                    port2: second.1,
                });
            }
            (Some(Role::Core), Some(Role::Access)) | (Some(Role::Access), Some(Role::Core)) => {
                let Some(ae_idx) = link.ae_idx else { continue };
                let member = if own_role == Some(Role::Core) {
                    EsiMember {
                        core: iface.hostname.clone(),
                        core_port: iface.port.clone(),
                        access: link.peer_hostname.clone(),
                        access_port: link.peer_port.clone(),
                    }
                } else {
                    EsiMember {
                        core: link.peer_hostname.clone(),
                        core_port: link.peer_port.clone(),
                        access: iface.hostname.clone(),
                        access_port: iface.port.clone(),
                    }
                };
                esi_groups.entry(ae_idx).or_default().insert(member);
            }
            _ => {}
        }
    }

    let mut roles: PortRoles = BTreeMap::new();
    let mut errors = Vec::new();

    for (ae_idx, members) in &esi_groups {
        if members.len() != 2 {
            errors.push(ValidationError::EsiLagMemberCount {
                ae_idx: *ae_idx,
                found: members.len(),
            });
            continue;
        }
        let access: BTreeSet<&str> = members.iter().map(|m| m.access.as_str()).collect();
        if access.len() != 1 {
            errors.push(ValidationError::EsiLagAccessMismatch { ae_idx: *ae_idx });
            continue;
        }

        for m in members {
            let ports = roles.entry(m.core.clone()).or_default();
            if ports.contains_key(&m.core_port) {
                errors.push(ValidationError::EsiLagPortReuse {
                    hostname: m.core.clone(),
                    port: m.core_port.clone(),
                });
                continue;
            }
            ports.insert(
                m.core_port.clone(),
                PortRole {
                    usage: esi_lag_name.to_string(),
                    aggregated: Some(true),
                    esilag: Some(true),
                    ae_idx: Some(*ae_idx),
                    link_name: None,
                },
            );
        }

        let access_ports: BTreeSet<&str> = members.iter().map(|m| m.access_port.as_str()).collect();
        let port_key = access_ports.into_iter().collect::<Vec<_>>().join(",");
        if let Some(access) = members.iter().next().map(|m| m.access.clone()) {
            roles.entry(access).or_default().insert(
                port_key,
                PortRole {
                    usage: esi_lag_name.to_string(),
                    aggregated: Some(true),
                    esilag: None,
                    ae_idx: Some(*ae_idx),
                    link_name: None,
                },
            );
        }
    }

    for (i, link) in core_links.iter().enumerate() {
        let n = i + 1;
        let link_name = format!("link{}", n);
        let (first_usage, second_usage) = if n % 2 == 1 {
            (port_usage::EVPN_DOWNLINK, port_usage::EVPN_UPLINK)
        } else {
            (port_usage::EVPN_UPLINK, port_usage::EVPN_DOWNLINK)
        };
        roles.entry(link.core1.clone()).or_default().insert(
            link.port1.clone(),
            PortRole {
                usage: first_usage.to_string(),
                aggregated: None,
                esilag: None,
                ae_idx: None,
                link_name: Some(link_name.clone()),
            },
        );
        roles.entry(link.core2.clone()).or_default().insert(
            link.port2.clone(),
            PortRole {
                usage: second_usage.to_string(),
                aggregated: None,
                esilag: None,
                ae_idx: None,
                link_name: Some(link_name),
            },
        );
    }

    if errors.is_empty() {
        Ok(roles)
    } else {
        Err(errors)
    }
}
