use oxnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::Serialize;
use std::net::IpAddr;

/// Canonical role names used by the remote EVPN topology API
pub mod remote_role {
    pub const COLLAPSED_CORE: &str = "collapsed-core";
    pub const ACCESS: &str = "access";
}

/// Port usage names assigned to core-to-core links
pub mod port_usage {
    pub const EVPN_UPLINK: &str = "evpn_uplink";
    pub const EVPN_DOWNLINK: &str = "evpn_downlink";
}

/// Default name of the ESI-LAG port usage profile
pub const DEFAULT_ESI_LAG_NAME: &str = "EVPN-ESI-LAG";

/// Fabric role of a device within the multihoming topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Core,
    Access,
}

impl Role {
    /// Parse a FABRIC sheet role cell. `collapsed-core` is accepted as an alias of `core`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "core" | "collapsed-core" => Some(Role::Core),
            "access" => Some(Role::Access),
            _ => None,
        }
    }

    pub fn remote_name(&self) -> &'static str {
        match self {
            Role::Core => remote_role::COLLAPSED_CORE,
            Role::Access => remote_role::ACCESS,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Core => write!(f, "core"),
            Role::Access => write!(f, "access"),
        }
    }
}

/// Port speed as declared in the INTERFACES sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Speed {
    #[serde(rename = "10g")]
    G10,
    #[serde(rename = "25g")]
    G25,
    #[serde(rename = "50g")]
    G50,
    #[serde(rename = "100g")]
    G100,
    #[serde(rename = "200g")]
    G200,
    #[serde(rename = "auto")]
    Auto,
}

impl Speed {
    pub const ALL: &'static [Speed] = &[
        Speed::G10,
        Speed::G25,
        Speed::G50,
        Speed::G100,
        Speed::G200,
        Speed::Auto,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|speed| speed.as_remote().eq_ignore_ascii_case(value))
    }

    /// Lowercase wire value, e.g. `100g` or `auto`
    pub fn as_remote(&self) -> &'static str {
        match self {
            Speed::G10 => "10g",
            Speed::G25 => "25g",
            Speed::G50 => "50g",
            Speed::G100 => "100g",
            Speed::G200 => "200g",
            Speed::Auto => "auto",
        }
    }
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    V4,
    V6,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

/// A static route parsed from a `route@nexthop` token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticRoute {
    pub destination: IpNet,
    pub nexthop: IpAddr,
}

/// The far end of a cabled port, plus the aggregated-ethernet group it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub peer_hostname: String,
    pub peer_port: String,
    pub ae_idx: Option<u32>,
}

/// One physical port on a device, keyed by (hostname, port)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub hostname: String,
    pub port: String,
    /// `None` when the cell was blank; the live value is then kept.
    pub speed: Option<Speed>,
    pub channelized: Option<bool>,
    pub link: Option<Link>,
}

/// A device and its fabric role, in FABRIC sheet order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub hostname: String,
    pub role: Role,
}

/// An IP network attached to the topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    pub vlan_id: Option<u16>,
    pub vrf: Option<String>,
    pub ipv4_gateway: Option<Ipv4Net>,
    pub ipv6_gateway: Option<Ipv6Net>,
    /// `None` when the STATIC_ROUTESv4 cell was blank.
    pub routes_v4: Option<Vec<StaticRoute>>,
    pub routes_v6: Option<Vec<StaticRoute>>,
}

/// Topology-wide settings from the SETTINGS sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricSettings {
    pub topology_name: String,
    pub site_name: String,
    pub esi_lag_name: String,
    pub overlay_as: Option<u32>,
    pub base_as: Option<u32>,
    pub underlay_subnet: Option<String>,
    pub use_ipv6_underlay: Option<bool>,
    pub per_vlan_vga_v4_mac: Option<bool>,
    pub per_vlan_vga_v6_mac: Option<bool>,
    pub auto_router_id_subnet: Option<String>,
    pub auto_router_id_subnet6: Option<String>,
}

/// Immutable desired state for one run, built from the workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    pub settings: FabricSettings,
    pub roles: Vec<RoleAssignment>,
    /// Ordered by first appearance; values from the last row for each (hostname, port).
    pub interfaces: Vec<Interface>,
    pub networks: Vec<Network>,
}

impl DesiredState {
    pub fn role_of(&self, hostname: &str) -> Option<Role> {
        self.roles
            .iter()
            .find(|r| r.hostname == hostname)
            .map(|r| r.role)
    }

    /// Core devices in FABRIC sheet order
    pub fn core_devices(&self) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|r| r.role == Role::Core)
            .map(|r| r.hostname.as_str())
            .collect()
    }

    pub fn interfaces_for<'a>(&'a self, hostname: &'a str) -> impl Iterator<Item = &'a Interface> + 'a {
        self.interfaces.iter().filter(move |i| i.hostname == hostname)
    }

    pub fn network_names(&self) -> Vec<&str> {
        self.networks.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn has_vrfs(&self) -> bool {
        self.networks.iter().any(|n| n.vrf.is_some())
    }
}
