use oxnet::{Ipv4Net, Ipv6Net};
use std::collections::{BTreeMap, BTreeSet};

use crate::derive::{base_port, parse_static_routes, port_roles};
use crate::errors::{RouteWarning, ValidationError};
use crate::models::{
    DesiredState, FabricSettings, Family, Interface, Link, Network, Role, RoleAssignment, Speed,
    DEFAULT_ESI_LAG_NAME,
};
use crate::workbook::{FabricRow, InterfaceRow, NetworkRow, SettingRow, Workbook, INTERFACES_SHEET};

/// A validated desired state plus the non-fatal route warnings found while building it
#[derive(Debug, Clone)]
pub struct Built {
    pub state: DesiredState,
    pub warnings: Vec<RouteWarning>,
}

/// Normalize workbook rows into a `DesiredState`.
///
/// Every sheet is checked and all validation errors are returned together.
/// Duplicate (hostname, port) rows are last-row-wins.
pub fn build(workbook: &Workbook) -> Result<Built, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let settings = build_settings(&workbook.settings, &mut errors);
    let roles = build_roles(&workbook.fabric, &mut errors);
    let known: BTreeSet<&str> = workbook.fabric.iter().map(|r| r.hostname.as_str()).collect();
    let interfaces = build_interfaces(&workbook.interfaces, &known, &mut errors);
    check_optics(&interfaces, &mut errors);
    let networks = build_networks(&workbook.networks, &mut errors, &mut warnings);

    let settings = match settings {
        Some(s) if errors.is_empty() => s,
        _ => return Err(errors),
    };

    let state = DesiredState {
        settings,
        roles,
        interfaces,
        networks,
    };

    // Cabling problems (ESI-LAG membership) are workbook errors too
    port_roles(&state)?;

    Ok(Built { state, warnings })
}

fn build_settings(rows: &[SettingRow], errors: &mut Vec<ValidationError>) -> Option<FabricSettings> {
    let mut values: BTreeMap<String, (usize, String)> = BTreeMap::new();
    for r in rows {
        if let Some(v) = &r.value {
            values.insert(r.key.trim().to_ascii_lowercase(), (r.row, v.clone()));
        }
    }
    let lookup = |keys: &[&str]| keys.iter().find_map(|k| values.get(*k)).cloned();

    let as_number = |key: &str, errors: &mut Vec<ValidationError>| -> Option<u32> {
        let (row, value) = lookup(&[key])?;
        match value.parse::<u32>() {
            Ok(n) => Some(n),
            Err(_) => {
                errors.push(ValidationError::InvalidSetting { row, key: key.to_string(), value });
                None
            }
        }
    };

    let as_bool = |key: &str, errors: &mut Vec<ValidationError>| -> Option<bool> {
        let (row, value) = lookup(&[key])?;
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "t" | "y" | "yes" | "on" => Some(true),
            "0" | "false" | "f" | "n" | "no" | "off" => Some(false),
            _ => {
                errors.push(ValidationError::InvalidSetting { row, key: key.to_string(), value });
                None
            }
        }
    };

    let topology_name = lookup(&["topology_name", "topologyname"]).map(|(_, v)| v);
    let site_name = lookup(&["site_name", "sitename", "site"]).map(|(_, v)| v);

    let overlay_as = as_number("overlay_as", errors);
    let base_as = as_number("base_as", errors);
    let use_ipv6_underlay = as_bool("use_ipv6_underlay", errors);
    let per_vlan_vga_v4_mac = as_bool("per_vlan_vga_v4_mac", errors);
    let per_vlan_vga_v6_mac = as_bool("per_vlan_vga_v6_mac", errors);

    if topology_name.is_none() {
        errors.push(ValidationError::MissingSetting { key: "topology_name".to_string() });
    }
    if site_name.is_none() {
        errors.push(ValidationError::MissingSetting { key: "site_name".to_string() });
    }
    let (Some(topology_name), Some(site_name)) = (topology_name, site_name) else {
        return None;
    };

    Some(FabricSettings {
        topology_name,
        site_name,
        esi_lag_name: lookup(&["esi_lag_name"])
            .map(|(_, v)| v)
            .unwrap_or_else(|| DEFAULT_ESI_LAG_NAME.to_string()),
        overlay_as,
        base_as,
        underlay_subnet: lookup(&["underlay_subnet"]).map(|(_, v)| v),
        use_ipv6_underlay,
        per_vlan_vga_v4_mac,
        per_vlan_vga_v6_mac,
        auto_router_id_subnet: lookup(&["auto_router_id_subnet"]).map(|(_, v)| v),
        auto_router_id_subnet6: lookup(&["auto_router_id_subnet6"]).map(|(_, v)| v),
    })
}

fn build_roles(rows: &[FabricRow], errors: &mut Vec<ValidationError>) -> Vec<RoleAssignment> {
    let mut roles: Vec<RoleAssignment> = Vec::new();

    for r in rows {
        let raw = r.role.clone().unwrap_or_default();
        let Some(role) = Role::parse(&raw) else {
            errors.push(ValidationError::InvalidRole {
                row: r.row,
                hostname: r.hostname.clone(),
                role: raw,
            });
            continue;
        };

        match roles.iter().find(|a| a.hostname == r.hostname) {
            Some(existing) if existing.role != role => {
                errors.push(ValidationError::ConflictingRole {
                    row: r.row,
                    hostname: r.hostname.clone(),
                    first: existing.role.to_string(),
                    second: role.to_string(),
                });
            }
            Some(_) => {}
            None => roles.push(RoleAssignment {
                hostname: r.hostname.clone(),
                role,
            }),
        }
    }

    roles
}

fn build_interfaces(
    rows: &[InterfaceRow],
    known: &BTreeSet<&str>,
    errors: &mut Vec<ValidationError>,
) -> Vec<Interface> {
    let mut out: Vec<Interface> = Vec::new();

    for r in rows {
        let before = errors.len();

        if !known.contains(r.hostname.as_str()) {
            errors.push(ValidationError::UnknownDevice {
                sheet: INTERFACES_SHEET,
                row: r.row,
                hostname: r.hostname.clone(),
            });
        }

        let speed = r.speed.as_deref().and_then(|v| {
            let parsed = Speed::parse(v);
            if parsed.is_none() {
                errors.push(ValidationError::InvalidSpeed { row: r.row, value: v.to_string() });
            }
            parsed
        });

        let channelized = r.channelized.as_deref().and_then(|v| match v.to_ascii_uppercase().as_str() {
            "TRUE" => Some(true),
            "FALSE" => Some(false),
            _ => {
                errors.push(ValidationError::InvalidChannelized { row: r.row, value: v.to_string() });
                None
            }
        });

        let ae_idx = r.ae_idx.as_deref().and_then(|v| match v.parse::<u32>() {
            Ok(n) => Some(n),
            Err(_) => {
                errors.push(ValidationError::InvalidAeIndex { row: r.row, value: v.to_string() });
                None
            }
        });

        let link = match (&r.peer_hostname, &r.peer_port) {
            (Some(peer), Some(peer_port)) => {
                if !known.contains(peer.as_str()) {
                    errors.push(ValidationError::UnknownDevice {
                        sheet: INTERFACES_SHEET,
                        row: r.row,
                        hostname: peer.clone(),
                    });
                }
                Some(Link {
                    peer_hostname: peer.clone(),
                    peer_port: peer_port.clone(),
                    ae_idx,
                })
            }
            (Some(_), None) => {
                errors.push(missing(INTERFACES_SHEET, r.row, "PEER_PORT"));
                None
            }
            (None, Some(_)) => {
                errors.push(missing(INTERFACES_SHEET, r.row, "PEER_HOSTNAME"));
                None
            }
            (None, None) => {
                if r.ae_idx.is_some() {
                    errors.push(missing(INTERFACES_SHEET, r.row, "PEER_HOSTNAME"));
                }
                None
            }
        };

        let Some(port) = &r.port else {
            errors.push(missing(INTERFACES_SHEET, r.row, "PORT"));
            continue;
        };
        if errors.len() > before {
            continue;
        }

        let iface = Interface {
            hostname: r.hostname.clone(),
            port: port.clone(),
            speed,
            channelized,
            link,
        };
        match out
            .iter_mut()
            .find(|i| i.hostname == iface.hostname && i.port == iface.port)
        {
            Some(existing) => *existing = iface,
            None => out.push(iface),
        }
    }

    out
}

/// Channelized sub-ports share the optic of their base port, so their speed
/// and breakout declarations must agree.
fn check_optics(interfaces: &[Interface], errors: &mut Vec<ValidationError>) {
    let mut seen: BTreeMap<(&str, &str), (Option<Speed>, Option<bool>)> = BTreeMap::new();

    for iface in interfaces {
        let key = (iface.hostname.as_str(), base_port(&iface.port));
        let (speed, channelized) = seen.entry(key).or_default();

        match (*speed, iface.speed) {
            (Some(first), Some(second)) if first != second => {
                errors.push(ValidationError::ConflictingOptics {
                    hostname: iface.hostname.clone(),
                    port: key.1.to_string(),
                    field: "speed",
                    first: first.as_remote().to_string(),
                    second: second.as_remote().to_string(),
                });
            }
            (None, declared) => *speed = declared,
            _ => {}
        }
        match (*channelized, iface.channelized) {
            (Some(first), Some(second)) if first != second => {
                errors.push(ValidationError::ConflictingOptics {
                    hostname: iface.hostname.clone(),
                    port: key.1.to_string(),
                    field: "channelized",
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
            (None, declared) => *channelized = declared,
            _ => {}
        }
    }
}

fn build_networks(
    rows: &[NetworkRow],
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<RouteWarning>,
) -> Vec<Network> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();

    for r in rows {
        if !seen.insert(r.name.clone()) {
            errors.push(ValidationError::DuplicateNetwork { row: r.row, name: r.name.clone() });
            continue;
        }
        let before = errors.len();

        let vlan_id = r.vlan_id.as_deref().and_then(|v| match v.parse::<u16>() {
            Ok(id) if (1..=4094).contains(&id) => Some(id),
            _ => {
                errors.push(ValidationError::InvalidVlan { row: r.row, value: v.to_string() });
                None
            }
        });

        // Gateways carry their prefix length; a bare address is rejected
        let ipv4_gateway = r.gateway.as_deref().and_then(|v| match parse_prefixed::<Ipv4Net>(v) {
            Some(gw) => Some(gw),
            None => {
                errors.push(ValidationError::InvalidGateway {
                    network: r.name.clone(),
                    family: Family::V4,
                    value: v.to_string(),
                });
                None
            }
        });

        let ipv6_gateway = r.gateway6.as_deref().and_then(|v| match parse_prefixed::<Ipv6Net>(v) {
            Some(gw) => Some(gw),
            None => {
                errors.push(ValidationError::InvalidGateway {
                    network: r.name.clone(),
                    family: Family::V6,
                    value: v.to_string(),
                });
                None
            }
        });

        let mut routes = |cell: &Option<String>, family: Family| {
            let cell = cell.as_deref()?;
            match parse_static_routes(&r.name, family, cell) {
                Ok(parsed) => {
                    warnings.extend(parsed.warnings);
                    Some(parsed.routes)
                }
                Err(e) => {
                    errors.push(e);
                    None
                }
            }
        };
        let routes_v4 = routes(&r.static_routes_v4, Family::V4);
        let routes_v6 = routes(&r.static_routes_v6, Family::V6);

        if errors.len() > before {
            continue;
        }

        out.push(Network {
            name: r.name.clone(),
            vlan_id,
            vrf: r.vrf.clone(),
            ipv4_gateway,
            ipv6_gateway,
            routes_v4,
            routes_v6,
        });
    }

    out
}

fn parse_prefixed<T: std::str::FromStr>(value: &str) -> Option<T> {
    if !value.contains('/') {
        return None;
    }
    value.parse().ok()
}

fn missing(sheet: &'static str, row: usize, column: &'static str) -> ValidationError {
    ValidationError::MissingCell { sheet, row, column }
}
