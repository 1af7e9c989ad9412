use oxnet::{Ipv4Net, Ipv6Net};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::errors::ValidationError;
use crate::models::{Family, Network};

/// Offsets from the gateway handed to the first and second core device
pub const CORE_OFFSETS: [u8; 2] = [1, 2];

/// Addresses derived for one core device on one network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DerivedAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v4: Option<Ipv4Net>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v6: Option<Ipv6Net>,
}

/// Network prefix containing the gateway, e.g. 10.0.0.1/24 -> 10.0.0.0/24
pub fn subnet_v4(gateway: Ipv4Net) -> Ipv4Net {
    Ipv4Net::new(gateway.prefix(), gateway.width()).unwrap_or(gateway)
}

pub fn subnet_v6(gateway: Ipv6Net) -> Ipv6Net {
    Ipv6Net::new(gateway.prefix(), gateway.width()).unwrap_or(gateway)
}

/// `gateway + offset`, keeping the prefix length. `None` when the result
/// would leave the usable host range (broadcast excluded below /31).
pub fn offset_v4(gateway: Ipv4Net, offset: u8) -> Option<Ipv4Net> {
    let candidate = u32::from(gateway.addr()).checked_add(u32::from(offset))?;
    if candidate > u32::from(gateway.last_host()) {
        return None;
    }
    Ipv4Net::new(Ipv4Addr::from(candidate), gateway.width()).ok()
}

/// IPv6 has no broadcast; the last address of the prefix is the limit.
pub fn offset_v6(gateway: Ipv6Net, offset: u8) -> Option<Ipv6Net> {
    let candidate = u128::from(gateway.addr()).checked_add(u128::from(offset))?;
    if candidate > u128::from(gateway.last_addr()) {
        return None;
    }
    Ipv6Net::new(Ipv6Addr::from(candidate), gateway.width()).ok()
}

/// Derive the per-core addresses of one network.
///
/// The first core in role order gets gateway+1, the second gateway+2, in each
/// family the network declares a gateway for. Further cores get nothing.
pub fn derive_core_addresses(
    network: &Network,
    cores: &[&str],
) -> Result<BTreeMap<String, DerivedAddress>, ValidationError> {
    let mut out = BTreeMap::new();

    for (hostname, offset) in cores.iter().zip(CORE_OFFSETS) {
        let mut address = DerivedAddress::default();

        if let Some(gw) = network.ipv4_gateway {
            address.v4 = Some(offset_v4(gw, offset).ok_or_else(|| ValidationError::AddressOverflow {
                network: network.name.clone(),
                family: Family::V4,
                gateway: gw.to_string(),
                offset,
            })?);
        }
        if let Some(gw) = network.ipv6_gateway {
            address.v6 = Some(offset_v6(gw, offset).ok_or_else(|| ValidationError::AddressOverflow {
                network: network.name.clone(),
                family: Family::V6,
                gateway: gw.to_string(),
                offset,
            })?);
        }

        if address.v4.is_some() || address.v6.is_some() {
            out.insert(hostname.to_string(), address);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(gw4: Option<&str>, gw6: Option<&str>) -> Network {
        Network {
            name: "users".to_string(),
            vlan_id: Some(10),
            vrf: None,
            ipv4_gateway: gw4.map(|g| g.parse().unwrap()),
            ipv6_gateway: gw6.map(|g| g.parse().unwrap()),
            routes_v4: None,
            routes_v6: None,
        }
    }

    #[test]
    fn test_first_two_cores_get_plus_one_and_two() {
        let net = network(Some("10.0.0.1/24"), None);
        let derived = derive_core_addresses(&net, &["coreA", "coreB"]).unwrap();

        assert_eq!(derived.len(), 2);
        assert_eq!(derived["coreA"].v4.unwrap().to_string(), "10.0.0.2/24");
        assert_eq!(derived["coreB"].v4.unwrap().to_string(), "10.0.0.3/24");
        assert_eq!(derived["coreA"].v6, None);
    }

    #[test]
    fn test_third_core_gets_nothing() {
        let net = network(Some("10.0.0.1/24"), None);
        let derived = derive_core_addresses(&net, &["coreA", "coreB", "coreC"]).unwrap();
        assert_eq!(derived.len(), 2);
        assert!(!derived.contains_key("coreC"));
    }

    #[test]
    fn test_dual_stack() {
        let net = network(Some("192.168.10.1/24"), Some("2001:db8:10::1/64"));
        let derived = derive_core_addresses(&net, &["c1", "c2"]).unwrap();
        assert_eq!(derived["c1"].v6.unwrap().to_string(), "2001:db8:10::2/64");
        assert_eq!(derived["c2"].v6.unwrap().to_string(), "2001:db8:10::3/64");
    }

    #[test]
    fn test_overflow_past_broadcast_is_an_error() {
        // .253 + 1 = .254 is the last host, + 2 would be the broadcast address
        let net = network(Some("10.0.0.253/24"), None);
        let err = derive_core_addresses(&net, &["coreA", "coreB"]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::AddressOverflow { family: Family::V4, offset: 2, .. }
        ));
    }

    #[test]
    fn test_offset_limits() {
        let gw: Ipv4Net = "10.0.0.254/24".parse().unwrap();
        assert_eq!(offset_v4(gw, 1), None);

        let gw: Ipv4Net = "10.0.0.0/31".parse().unwrap();
        assert_eq!(offset_v4(gw, 1).unwrap().to_string(), "10.0.0.1/31");
        assert_eq!(offset_v4(gw, 2), None);

        let gw: Ipv4Net = "10.0.0.1/32".parse().unwrap();
        assert_eq!(offset_v4(gw, 1), None);

        let gw: Ipv4Net = "255.255.255.254/0".parse().unwrap();
        assert_eq!(offset_v4(gw, 2), None);

        let gw: Ipv6Net = "2001:db8::ffff/112".parse().unwrap();
        assert_eq!(offset_v6(gw, 1), None);
    }

    #[test]
    fn test_subnet_and_netmask() {
        let gw: Ipv4Net = "10.20.30.1/22".parse().unwrap();
        assert_eq!(subnet_v4(gw).to_string(), "10.20.28.0/22");
        assert_eq!(gw.mask_addr().to_string(), "255.255.252.0");

        // Derived addresses stay inside the same prefix as the gateway
        let derived = offset_v4(gw, 2).unwrap();
        assert_eq!(derived.to_string(), "10.20.30.3/22");
        assert_eq!(subnet_v4(derived), subnet_v4(gw));

        let gw: Ipv4Net = "10.20.31.253/22".parse().unwrap();
        assert_eq!(offset_v4(gw, 1).unwrap().to_string(), "10.20.31.254/22");
        assert_eq!(offset_v4(gw, 2), None);

        let gw6: Ipv6Net = "2001:db8:10::1/64".parse().unwrap();
        assert_eq!(subnet_v6(gw6).to_string(), "2001:db8:10::/64");
    }
}
