use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::{Declared, EntityPlan};
use crate::derive::addressing::{subnet_v4, subnet_v6};
use crate::derive::{base_port, DerivedAddress, PortRoles};
use crate::models::{DesiredState, Role, StaticRoute};
use crate::remote::ResourceKind;

/// network name -> core hostname -> derived address
pub type Addressing = BTreeMap<String, BTreeMap<String, DerivedAddress>>;

/// A resolved device as seen in its live snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricDevice {
    pub hostname: String,
    pub role: Role,
    pub id: String,
    /// Bare lowercase hex, empty when the remote object has none
    pub mac: String,
}

/// `00:11:22:AA:BB:CC`, `0011.22aa.bbcc` and `001122aabbcc` all become `001122aabbcc`
pub fn normalize_mac(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Static routes as the remote `{prefix: {via: nexthop}}` map
pub fn route_map<'a>(routes: impl IntoIterator<Item = &'a StaticRoute>) -> Map<String, Value> {
    let mut map = Map::new();
    for route in routes {
        map.insert(
            route.destination.to_string(),
            json!({ "via": route.nexthop.to_string() }),
        );
    }
    map
}

/// The EVPN topology: role assignments, switch MACs, port roles and EVPN options.
///
/// `devices` holds the resolved devices in FABRIC order. The switches list is
/// declared as a whole, so devices missing from it are detached.
pub fn topology_plan(state: &DesiredState, devices: &[FabricDevice], roles: &PortRoles) -> EntityPlan {
    let settings = &state.settings;
    let mut plan = EntityPlan::new(ResourceKind::Topology, &settings.topology_name);

    let core_macs: Vec<&str> = devices
        .iter()
        .filter(|d| d.role == Role::Core)
        .map(|d| d.mac.as_str())
        .collect();

    let switches: Vec<Value> = devices
        .iter()
        .map(|d| {
            let peers: Vec<&str> = match d.role {
                Role::Core => core_macs
                    .iter()
                    .copied()
                    .filter(|mac| *mac != d.mac)
                    .take(1)
                    .collect(),
                Role::Access => Vec::new(),
            };
            let port_config: Map<String, Value> = roles
                .get(&d.hostname)
                .map(|ports| {
                    ports
                        .iter()
                        .map(|(port, role)| {
                            (port.clone(), serde_json::to_value(role).unwrap_or_default())
                        })
                        .collect()
                })
                .unwrap_or_default();
            json!({
                "mac": d.mac,
                "role": d.role.remote_name(),
                "uplinks": peers,
                "downlinks": peers,
                "config": { "port_config": port_config },
            })
        })
        .collect();

    let mut evpn = BTreeMap::new();
    evpn.insert("routed_at".to_string(), Declared::default("edge"));
    evpn.insert("core_as_border".to_string(), Declared::default(true));
    if let Some(overlay_as) = settings.overlay_as {
        evpn.insert(
            "overlay".to_string(),
            Declared::fields([("as", Declared::value(overlay_as))]),
        );
    }

    let mut underlay = BTreeMap::new();
    if let Some(base_as) = settings.base_as {
        underlay.insert("as_base".to_string(), Declared::value(base_as));
    }
    if let Some(subnet) = &settings.underlay_subnet {
        underlay.insert("subnet".to_string(), Declared::value(subnet.as_str()));
    }
    if let Some(use_ipv6) = settings.use_ipv6_underlay {
        underlay.insert("use_ipv6".to_string(), Declared::value(use_ipv6));
    }
    if !underlay.is_empty() {
        evpn.insert("underlay".to_string(), Declared::Fields(underlay));
    }

    let flags = [
        ("per_vlan_vga_v4_mac", settings.per_vlan_vga_v4_mac),
        ("per_vlan_vga_v6_mac", settings.per_vlan_vga_v6_mac),
    ];
    for (key, value) in flags {
        if let Some(v) = value {
            evpn.insert(key.to_string(), Declared::value(v));
        }
    }
    let subnets = [
        ("auto_router_id_subnet", &settings.auto_router_id_subnet),
        ("auto_router_id_subnet6", &settings.auto_router_id_subnet6),
    ];
    for (key, value) in subnets {
        if let Some(v) = value {
            evpn.insert(key.to_string(), Declared::value(v.as_str()));
        }
    }

    plan.set("name", Declared::value(settings.topology_name.as_str()))
        .set("overwrite", Declared::value(true))
        .set("pod_names", Declared::default(json!({ "1": "Pod 1" })))
        .set("evpn_options", Declared::Fields(evpn))
        .set("switches", Declared::Value(Value::Array(switches)));
    plan
}

/// One org network: VLAN, subnets with gateways, and routes
pub fn network_plan(state: &DesiredState, name: &str) -> Option<EntityPlan> {
    let network = state.networks.iter().find(|n| n.name == name)?;
    let mut plan = EntityPlan::new(ResourceKind::Network, name);
    plan.set("name", Declared::value(name));

    if let Some(vlan_id) = network.vlan_id {
        plan.set("vlan_id", Declared::value(vlan_id));
    }
    if let Some(gw) = network.ipv4_gateway {
        plan.set("subnet", Declared::value(subnet_v4(gw).to_string()))
            .set("gateway", Declared::value(gw.addr().to_string()));
    }
    if let Some(gw) = network.ipv6_gateway {
        plan.set("subnet6", Declared::value(subnet_v6(gw).to_string()))
            .set("gateway6", Declared::value(gw.addr().to_string()));
    }
    if let Some(routes) = &network.routes_v4 {
        plan.set("routes", Declared::Value(Value::Object(route_map(routes))));
    }
    if let Some(routes) = &network.routes_v6 {
        plan.set("routes6", Declared::Value(Value::Object(route_map(routes))));
    }
    Some(plan)
}

/// The site setting: network definitions, the ESI-LAG trunk profile and one
/// VRF instance per declared VRF
pub fn site_setting_plan(state: &DesiredState, topology_id: Option<&str>) -> EntityPlan {
    let settings = &state.settings;
    let mut plan = EntityPlan::new(ResourceKind::SiteSetting, &settings.site_name);

    let mut usage = BTreeMap::new();
    usage.insert("mode".to_string(), Declared::value("trunk"));
    usage.insert("all_networks".to_string(), Declared::value(false));
    usage.insert("networks".to_string(), Declared::value(state.network_names()));
    if let Some(id) = topology_id {
        usage.insert("ui_evpntopo_id".to_string(), Declared::value(id));
    }
    // Operational knobs an operator may tune afterwards
    let defaults = [
        ("disabled", json!(false)),
        ("port_network", Value::Null),
        ("voip_network", Value::Null),
        ("port_auth", Value::Null),
        ("stp_edge", json!(false)),
        ("speed", json!("auto")),
        ("duplex", json!("auto")),
        ("mac_limit", json!("0")),
        ("poe_disabled", json!(true)),
        ("enable_qos", json!(false)),
        ("storm_control", json!({})),
        ("mtu", json!("9200")),
    ];
    for (key, value) in defaults {
        usage.insert(key.to_string(), Declared::Default(value));
    }
    plan.set(
        "port_usages",
        Declared::fields([(settings.esi_lag_name.as_str(), Declared::Fields(usage))]),
    );

    let networks = state.networks.iter().map(|network| {
        let mut fields = BTreeMap::new();
        if let Some(vlan_id) = network.vlan_id {
            fields.insert("vlan_id".to_string(), Declared::value(vlan_id));
        }
        if let Some(gw) = network.ipv4_gateway {
            fields.insert("subnet".to_string(), Declared::value(subnet_v4(gw).to_string()));
            fields.insert("gateway".to_string(), Declared::value(gw.addr().to_string()));
        }
        if let Some(gw) = network.ipv6_gateway {
            fields.insert("subnet6".to_string(), Declared::value(subnet_v6(gw).to_string()));
            fields.insert("gateway6".to_string(), Declared::value(gw.addr().to_string()));
        }
        (network.name.clone(), Declared::Fields(fields))
    });
    plan.set("networks", Declared::fields(networks));

    let mut vrfs: BTreeMap<String, Vec<&crate::models::Network>> = BTreeMap::new();
    for network in &state.networks {
        if let Some(vrf) = &network.vrf {
            vrfs.entry(vrf.clone()).or_default().push(network);
        }
    }
    if !vrfs.is_empty() {
        let instances = vrfs.into_iter().map(|(vrf, members)| {
            let mut instance = BTreeMap::new();
            let names: Vec<&str> = members.iter().map(|n| n.name.as_str()).collect();
            instance.insert("networks".to_string(), Declared::value(names));
            instance.insert(
                "v4_routing".to_string(),
                Declared::value(members.iter().any(|n| n.ipv4_gateway.is_some())),
            );
            instance.insert(
                "v6_routing".to_string(),
                Declared::value(members.iter().any(|n| n.ipv6_gateway.is_some())),
            );

            let declared_v4: Vec<&StaticRoute> = members
                .iter()
                .filter_map(|n| n.routes_v4.as_ref())
                .flatten()
                .collect();
            let declared_v6: Vec<&StaticRoute> = members
                .iter()
                .filter_map(|n| n.routes_v6.as_ref())
                .flatten()
                .collect();
            if members.iter().any(|n| n.routes_v4.is_some()) {
                instance.insert(
                    "extra_routes".to_string(),
                    Declared::Value(Value::Object(route_map(declared_v4))),
                );
            }
            if members.iter().any(|n| n.routes_v6.is_some()) {
                instance.insert(
                    "extra_routes6".to_string(),
                    Declared::Value(Value::Object(route_map(declared_v6))),
                );
            }
            (vrf, Declared::Fields(instance))
        });
        plan.set("vrf_instances", Declared::fields(instances));
    }

    plan
}

/// One switch: EVPN port roles, optics, and gateway-relative addresses
pub fn device_plan(
    state: &DesiredState,
    device: &FabricDevice,
    roles: &PortRoles,
    addressing: &Addressing,
) -> EntityPlan {
    let mut plan = EntityPlan::new(ResourceKind::Device, &device.hostname);

    let port_config = roles
        .get(&device.hostname)
        .into_iter()
        .flatten()
        .map(|(port, role)| {
            // Every role key is declared so a port that changes role sheds the old one
            let role_fields = [
                ("usage", Some(Value::from(role.usage.as_str()))),
                ("aggregated", role.aggregated.map(Value::from)),
                ("esilag", role.esilag.map(Value::from)),
                ("ae_idx", role.ae_idx.map(Value::from)),
                ("link_name", role.link_name.as_deref().map(Value::from)),
            ];
            let fields = role_fields
                .into_iter()
                .map(|(key, value)| (key, value.map_or(Declared::Absent, Declared::Value)));
            (port.clone(), Declared::fields(fields))
        });
    plan.set("port_config", Declared::fields(port_config));

    // Speed and breakout live on the base port of a channelized interface
    let mut optics: BTreeMap<String, BTreeMap<String, Declared>> = BTreeMap::new();
    for iface in state.interfaces_for(&device.hostname) {
        if iface.speed.is_none() && iface.channelized.is_none() {
            continue;
        }
        let entry = optics.entry(base_port(&iface.port).to_string()).or_default();
        if let Some(speed) = iface.speed {
            entry.insert("speed".to_string(), Declared::value(speed.as_remote()));
        }
        if let Some(channelized) = iface.channelized {
            entry.insert("channelized".to_string(), Declared::value(channelized));
        }
    }
    plan.set(
        "optic_port_config",
        Declared::fields(optics.into_iter().map(|(port, f)| (port, Declared::Fields(f)))),
    );

    let ip_configs = state.networks.iter().map(|network| {
        let derived = addressing
            .get(&network.name)
            .and_then(|per_core| per_core.get(&device.hostname));
        let declared = match derived.map(ip_config) {
            Some(cfg) if !cfg.is_empty() => Declared::Value(Value::Object(cfg)),
            _ => Declared::Absent,
        };
        (network.name.clone(), declared)
    });
    plan.set("other_ip_configs", Declared::fields(ip_configs));

    match device.role {
        Role::Core => {
            plan.set(
                "vrf_config",
                Declared::fields([("enabled", Declared::value(state.has_vrfs()))]),
            )
            .set(
                "dhcpd_config",
                Declared::fields([("enabled", Declared::value(false))]),
            );
        }
        Role::Access => {
            // Marks the switch as managed by the EVPN topology
            plan.set("-ui_evpntopo_id", Declared::value(true));
        }
    }

    plan
}

/// Remote `other_ip_configs` entry for one derived address
fn ip_config(address: &DerivedAddress) -> Map<String, Value> {
    let mut cfg = Map::new();
    if let Some(v4) = address.v4 {
        cfg.insert("type".to_string(), json!("static"));
        cfg.insert("ip".to_string(), json!(v4.addr().to_string()));
        cfg.insert("netmask".to_string(), json!(v4.mask_addr().to_string()));
    }
    if let Some(v6) = address.v6 {
        cfg.insert("type6".to_string(), json!("static"));
        cfg.insert("ip6".to_string(), json!(v6.addr().to_string()));
        cfg.insert("netmask6".to_string(), json!(format!("/{}", v6.width())));
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::{derive_core_addresses, port_roles};
    use crate::live::LiveSnapshot;
    use crate::merge::merge;
    use crate::models::{FabricSettings, Interface, Link, Network, RoleAssignment, Speed};

    fn settings() -> FabricSettings {
        FabricSettings {
            topology_name: "campus".to_string(),
            site_name: "HQ".to_string(),
            esi_lag_name: "EVPN-ESI-LAG".to_string(),
            overlay_as: Some(65000),
            base_as: Some(65001),
            underlay_subnet: Some("10.255.240.0/20".to_string()),
            use_ipv6_underlay: None,
            per_vlan_vga_v4_mac: Some(true),
            per_vlan_vga_v6_mac: None,
            auto_router_id_subnet: None,
            auto_router_id_subnet6: None,
        }
    }

    fn iface(host: &str, port: &str, speed: Option<Speed>, ch: Option<bool>, link: Option<Link>) -> Interface {
        Interface {
            hostname: host.to_string(),
            port: port.to_string(),
            speed,
            channelized: ch,
            link,
        }
    }

    fn link(peer: &str, port: &str, ae: Option<u32>) -> Option<Link> {
        Some(Link {
            peer_hostname: peer.to_string(),
            peer_port: port.to_string(),
            ae_idx: ae,
        })
    }

    fn state() -> DesiredState {
        let role = |h: &str, r| RoleAssignment { hostname: h.to_string(), role: r };
        DesiredState {
            settings: settings(),
            roles: vec![role("core-a", Role::Core), role("core-b", Role::Core), role("acc-1", Role::Access)],
            interfaces: vec![
                iface("core-a", "et-0/0/0", Some(Speed::G100), Some(false), link("core-b", "et-0/0/0", None)),
                iface("core-a", "et-0/0/10", None, None, link("acc-1", "xe-0/2/0", Some(1))),
                iface("core-b", "et-0/0/10", None, None, link("acc-1", "xe-0/2/1", Some(1))),
                iface("core-a", "et-0/0/4:1", Some(Speed::G25), Some(true), None),
            ],
            networks: vec![
                Network {
                    name: "users".to_string(),
                    vlan_id: Some(10),
                    vrf: Some("corp".to_string()),
                    ipv4_gateway: Some("10.0.0.1/24".parse().unwrap()),
                    ipv6_gateway: Some("2001:db8:10::1/64".parse().unwrap()),
                    routes_v4: Some(vec![StaticRoute {
                        destination: "10.1.0.0/24".parse().unwrap(),
                        nexthop: "10.0.0.254".parse().unwrap(),
                    }]),
                    routes_v6: None,
                },
                Network {
                    name: "iot".to_string(),
                    vlan_id: Some(20),
                    vrf: None,
                    ipv4_gateway: None,
                    ipv6_gateway: None,
                    routes_v4: None,
                    routes_v6: None,
                },
            ],
        }
    }

    fn devices() -> Vec<FabricDevice> {
        let dev = |h: &str, role, id: &str, mac: &str| FabricDevice {
            hostname: h.to_string(),
            role,
            id: id.to_string(),
            mac: mac.to_string(),
        };
        vec![
            dev("core-a", Role::Core, "d1", "aa0000000001"),
            dev("core-b", Role::Core, "d2", "aa0000000002"),
            dev("acc-1", Role::Access, "d3", "aa0000000003"),
        ]
    }

    fn addressing(state: &DesiredState) -> Addressing {
        let cores = state.core_devices();
        state
            .networks
            .iter()
            .map(|n| (n.name.clone(), derive_core_addresses(n, &cores).unwrap()))
            .collect()
    }

    fn live(object: Value) -> LiveSnapshot {
        LiveSnapshot {
            kind: ResourceKind::Device,
            id: "d1".to_string(),
            object: object.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_normalize_mac() {
        assert_eq!(normalize_mac("00:11:22:AA:BB:CC"), "001122aabbcc");
        assert_eq!(normalize_mac("0011.22aa.bbcc"), "001122aabbcc");
        assert_eq!(normalize_mac("00-11-22-aa-bb-cc"), "001122aabbcc");
    }

    #[test]
    fn test_topology_switches() {
        let state = state();
        let roles = port_roles(&state).unwrap();
        let out = merge(&topology_plan(&state, &devices(), &roles), None);

        assert_eq!(out.body["name"], json!("campus"));
        assert_eq!(out.body["overwrite"], json!(true));
        let switches = out.body["switches"].as_array().unwrap();
        assert_eq!(switches.len(), 3);
        assert_eq!(switches[0]["role"], json!("collapsed-core"));
        assert_eq!(switches[0]["uplinks"], json!(["aa0000000002"]));
        assert_eq!(switches[1]["downlinks"], json!(["aa0000000001"]));
        assert_eq!(switches[2]["role"], json!("access"));
        assert_eq!(switches[2]["uplinks"], json!([]));
        assert_eq!(
            switches[0]["config"]["port_config"]["et-0/0/10"]["usage"],
            json!("EVPN-ESI-LAG")
        );
        assert_eq!(
            switches[2]["config"]["port_config"]["xe-0/2/0,xe-0/2/1"]["ae_idx"],
            json!(1)
        );
    }

    #[test]
    fn test_topology_evpn_options_keep_undeclared_live_values() {
        let state = state();
        let roles = port_roles(&state).unwrap();
        let mut existing = live(json!({
            "name": "campus",
            "evpn_options": {
                "routed_at": "core",
                "overlay": {"as": 64000},
                "underlay": {"as_base": 1, "use_ipv6": true},
                "auto_router_id_subnet": "172.16.0.0/24"
            },
            "switches": [{"mac": "ff0000000009", "role": "access"}]
        }));
        existing.kind = ResourceKind::Topology;
        let out = merge(&topology_plan(&state, &devices(), &roles), Some(&existing));

        let evpn = &out.body["evpn_options"];
        assert_eq!(evpn["routed_at"], json!("core"));
        assert_eq!(evpn["core_as_border"], json!(true));
        assert_eq!(evpn["overlay"]["as"], json!(65000));
        assert_eq!(evpn["underlay"]["as_base"], json!(65001));
        assert_eq!(evpn["underlay"]["use_ipv6"], json!(true));
        assert_eq!(evpn["auto_router_id_subnet"], json!("172.16.0.0/24"));
        assert_eq!(evpn["per_vlan_vga_v4_mac"], json!(true));
        // Switch list is declared as a whole
        assert_eq!(out.body["switches"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_network_plan() {
        let state = state();
        let out = merge(&network_plan(&state, "users").unwrap(), None);
        assert_eq!(
            Value::Object(out.body),
            json!({
                "name": "users",
                "vlan_id": 10,
                "subnet": "10.0.0.0/24",
                "gateway": "10.0.0.1",
                "subnet6": "2001:db8:10::/64",
                "gateway6": "2001:db8:10::1",
                "routes": {"10.1.0.0/24": {"via": "10.0.0.254"}}
            })
        );
        assert!(network_plan(&state, "missing").is_none());
    }

    #[test]
    fn test_network_blank_routes_keep_live_routes() {
        let state = state();
        let existing = live(json!({"name": "iot", "vlan_id": 99, "routes": {"0.0.0.0/0": {"via": "10.2.0.1"}}}));
        let out = merge(&network_plan(&state, "iot").unwrap(), Some(&existing));
        assert_eq!(out.body["vlan_id"], json!(20));
        assert_eq!(out.body["routes"], json!({"0.0.0.0/0": {"via": "10.2.0.1"}}));
    }

    #[test]
    fn test_site_setting_plan() {
        let state = state();
        let existing = live(json!({
            "port_usages": {
                "EVPN-ESI-LAG": {"mode": "access", "mtu": "1514"},
                "printers": {"mode": "access"}
            },
            "vrf_instances": {"legacy": {"networks": ["old"]}}
        }));
        let out = merge(&site_setting_plan(&state, Some("topo-1")), Some(&existing));

        let usage = &out.body["port_usages"]["EVPN-ESI-LAG"];
        assert_eq!(usage["mode"], json!("trunk"));
        assert_eq!(usage["mtu"], json!("1514"));
        assert_eq!(usage["poe_disabled"], json!(true));
        assert_eq!(usage["networks"], json!(["users", "iot"]));
        assert_eq!(usage["ui_evpntopo_id"], json!("topo-1"));
        assert_eq!(out.body["port_usages"]["printers"], json!({"mode": "access"}));

        let corp = &out.body["vrf_instances"]["corp"];
        assert_eq!(corp["networks"], json!(["users"]));
        assert_eq!(corp["v4_routing"], json!(true));
        assert_eq!(corp["v6_routing"], json!(true));
        assert_eq!(corp["extra_routes"], json!({"10.1.0.0/24": {"via": "10.0.0.254"}}));
        assert!(corp.get("extra_routes6").is_none());
        assert_eq!(out.body["vrf_instances"]["legacy"], json!({"networks": ["old"]}));
    }

    #[test]
    fn test_site_setting_defines_every_trunk_network() {
        let state = state();
        let existing = live(json!({
            "networks": {
                "users": {"vlan_id": 99, "subnet": "10.9.0.0/24", "isolation": true},
                "guest": {"vlan_id": 30}
            }
        }));
        let out = merge(&site_setting_plan(&state, None), Some(&existing));

        let networks = out.body["networks"].as_object().unwrap();
        for name in out.body["port_usages"]["EVPN-ESI-LAG"]["networks"].as_array().unwrap() {
            assert!(networks.contains_key(name.as_str().unwrap()), "{} is not defined", name);
        }
        assert_eq!(
            networks["users"],
            json!({
                "vlan_id": 10,
                "subnet": "10.0.0.0/24",
                "gateway": "10.0.0.1",
                "subnet6": "2001:db8:10::/64",
                "gateway6": "2001:db8:10::1",
                "isolation": true
            })
        );
        assert_eq!(networks["iot"], json!({"vlan_id": 20}));
        assert_eq!(networks["guest"], json!({"vlan_id": 30}));
    }

    #[test]
    fn test_core_device_plan() {
        let state = state();
        let roles = port_roles(&state).unwrap();
        let addressing = addressing(&state);
        let existing = live(json!({
            "name": "core-a",
            "port_config": {
                "ge-0/0/47": {"usage": "ap", "description": "closet AP"},
                "et-0/0/10": {"usage": "default", "description": "to acc-1"}
            },
            "other_ip_configs": {"users": {"type": "static", "ip": "10.0.0.50", "netmask": "255.255.255.0"}}
        }));
        let out = merge(&device_plan(&state, &devices()[0], &roles, &addressing), Some(&existing));

        assert_eq!(out.get(&["port_config", "ge-0/0/47", "usage"]), Some(&json!("ap")));
        assert_eq!(out.get(&["port_config", "et-0/0/10", "usage"]), Some(&json!("EVPN-ESI-LAG")));
        assert_eq!(
            out.get(&["port_config", "et-0/0/10", "description"]),
            Some(&json!("to acc-1"))
        );
        assert_eq!(out.get(&["port_config", "et-0/0/0", "link_name"]), Some(&json!("link1")));

        assert_eq!(
            out.get(&["other_ip_configs", "users"]),
            Some(&json!({
                "type": "static",
                "ip": "10.0.0.2",
                "netmask": "255.255.255.0",
                "type6": "static",
                "ip6": "2001:db8:10::2",
                "netmask6": "/64"
            }))
        );
        assert_eq!(out.get(&["other_ip_configs", "iot"]), None);

        assert_eq!(out.get(&["optic_port_config", "et-0/0/0", "speed"]), Some(&json!("100g")));
        assert_eq!(out.get(&["optic_port_config", "et-0/0/4", "channelized"]), Some(&json!(true)));
        assert_eq!(out.get(&["vrf_config", "enabled"]), Some(&json!(true)));
        assert_eq!(out.get(&["dhcpd_config", "enabled"]), Some(&json!(false)));
        assert_eq!(out.get(&["-ui_evpntopo_id"]), None);
    }

    #[test]
    fn test_port_changing_role_drops_old_role_fields() {
        let mut state = state();
        // et-0/0/10 was an ESI-LAG member and is now cabled core to core
        state.interfaces = vec![iface("core-a", "et-0/0/10", None, None, link("core-b", "et-0/0/10", None))];
        let roles = port_roles(&state).unwrap();
        let existing = live(json!({
            "name": "core-a",
            "port_config": {
                "et-0/0/10": {
                    "usage": "EVPN-ESI-LAG",
                    "aggregated": true,
                    "esilag": true,
                    "ae_idx": 1,
                    "description": "x"
                }
            }
        }));
        let out = merge(&device_plan(&state, &devices()[0], &roles, &addressing(&state)), Some(&existing));

        assert_eq!(
            out.get(&["port_config", "et-0/0/10"]),
            Some(&json!({"usage": "evpn_downlink", "link_name": "link1", "description": "x"}))
        );
    }

    #[test]
    fn test_esi_lag_port_drops_link_name() {
        let state = state();
        let roles = port_roles(&state).unwrap();
        let existing = live(json!({
            "port_config": {"et-0/0/10": {"usage": "evpn_uplink", "link_name": "link3"}}
        }));
        let out = merge(&device_plan(&state, &devices()[0], &roles, &addressing(&state)), Some(&existing));

        assert_eq!(
            out.get(&["port_config", "et-0/0/10"]),
            Some(&json!({"usage": "EVPN-ESI-LAG", "aggregated": true, "esilag": true, "ae_idx": 1}))
        );
    }

    #[test]
    fn test_access_device_plan() {
        let state = state();
        let roles = port_roles(&state).unwrap();
        let addressing = addressing(&state);
        let out = merge(&device_plan(&state, &devices()[2], &roles, &addressing), None);

        assert_eq!(
            out.get(&["port_config", "xe-0/2/0,xe-0/2/1", "aggregated"]),
            Some(&json!(true))
        );
        assert_eq!(out.get(&["other_ip_configs"]), Some(&json!({})));
        assert_eq!(out.get(&["vrf_config"]), None);
        assert_eq!(out.get(&["dhcpd_config"]), None);
        assert_eq!(out.get(&["-ui_evpntopo_id"]), Some(&json!(true)));
    }
}
