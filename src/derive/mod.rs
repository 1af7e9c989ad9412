//! Values the workbook leaves implicit: gateway-relative core addresses,
//! static routes, and EVPN port roles.

pub mod addressing;
pub mod ports;
pub mod routes;

pub use addressing::{derive_core_addresses, DerivedAddress};
pub use ports::{base_port, port_roles, PortRoles};
pub use routes::parse_static_routes;
