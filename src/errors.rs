use serde::Serialize;
use thiserror::Error;

use crate::models::Family;
use crate::remote::ResourceKind;

/// Malformed workbook input, or a derivation that cannot be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("SETTINGS: missing required key '{key}'")]
    MissingSetting { key: String },

    #[error("SETTINGS row {row}: invalid value '{value}' for '{key}'")]
    InvalidSetting { row: usize, key: String, value: String },

    #[error("{sheet} row {row}: missing {column}")]
    MissingCell { sheet: &'static str, row: usize, column: &'static str },

    #[error("FABRIC row {row}: invalid role '{role}' for device '{hostname}'")]
    InvalidRole { row: usize, hostname: String, role: String },

    #[error("FABRIC row {row}: device '{hostname}' has conflicting roles '{first}' and '{second}'")]
    ConflictingRole { row: usize, hostname: String, first: String, second: String },

    #[error("{sheet} row {row}: device '{hostname}' is not in the FABRIC role table")]
    UnknownDevice { sheet: &'static str, row: usize, hostname: String },

    #[error("INTERFACES row {row}: invalid speed '{value}' (expected 10G, 25G, 50G, 100G, 200G or AUTO)")]
    InvalidSpeed { row: usize, value: String },

    #[error("INTERFACES row {row}: invalid channelized value '{value}' (expected TRUE or FALSE)")]
    InvalidChannelized { row: usize, value: String },

    #[error("INTERFACES row {row}: invalid AE_IDX '{value}'")]
    InvalidAeIndex { row: usize, value: String },

    #[error("INTERFACES: device '{hostname}' declares conflicting {field} '{first}' and '{second}' on base port '{port}'")]
    ConflictingOptics {
        hostname: String,
        port: String,
        field: &'static str,
        first: String,
        second: String,
    },

    #[error("ESI-LAG ae_idx {ae_idx} must have exactly 2 core-facing members (found {found})")]
    EsiLagMemberCount { ae_idx: u32, found: usize },

    #[error("ESI-LAG ae_idx {ae_idx} spans more than one access device")]
    EsiLagAccessMismatch { ae_idx: u32 },

    #[error("core '{hostname}' port '{port}' is used by more than one ESI-LAG")]
    EsiLagPortReuse { hostname: String, port: String },

    #[error("NETWORKS row {row}: duplicate network name '{name}'")]
    DuplicateNetwork { row: usize, name: String },

    #[error("NETWORKS row {row}: invalid VLAN_ID '{value}'")]
    InvalidVlan { row: usize, value: String },

    #[error("network '{network}': invalid {family} gateway '{value}' (expected address/prefix)")]
    InvalidGateway { network: String, family: Family, value: String },

    #[error("network '{network}': no valid {family} static route in '{value}'")]
    NoValidRoutes { network: String, family: Family, value: String },

    #[error("network '{network}': {family} gateway {gateway} + {offset} is outside the subnet host range")]
    AddressOverflow { network: String, family: Family, gateway: String, offset: u8 },

    #[error("{kind} name must not be empty")]
    EmptyName { kind: ResourceKind },
}

/// A single `route@nexthop` token that was dropped while the rest of the cell parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("network '{network}': skipped {family} static route '{token}': {reason}")]
pub struct RouteWarning {
    pub network: String,
    pub family: Family,
    pub token: String,
    pub reason: String,
}

/// The action attempted against the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
        }
    }
}

/// Per-entity failure collected into the run report.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum ReconcileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("{kind} '{name}': {action} rejected: {message}")]
    RemoteWrite {
        kind: ResourceKind,
        name: String,
        action: Action,
        message: String,
        changed_fields: Vec<String>,
    },

    #[error("{kind} '{name}': {message}")]
    RemoteRead { kind: ResourceKind, name: String, message: String },
}
