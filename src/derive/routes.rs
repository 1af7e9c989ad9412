use oxnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::errors::{RouteWarning, ValidationError};
use crate::models::{Family, StaticRoute};

/// Routes parsed from one cell, plus the tokens that were skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRoutes {
    pub routes: Vec<StaticRoute>,
    pub warnings: Vec<RouteWarning>,
}

/// Parse a space-separated list of `route@nexthop` tokens in one address family.
///
/// Each token stands on its own: a malformed token becomes a warning and the
/// rest of the cell is kept. A cell where no token parses is rejected. A later
/// token for the same destination replaces the earlier one.
pub fn parse_static_routes(
    network: &str,
    family: Family,
    cell: &str,
) -> Result<ParsedRoutes, ValidationError> {
    let mut routes: Vec<StaticRoute> = Vec::new();
    let mut warnings = Vec::new();
    let mut tokens = 0;

    for token in cell.split_whitespace() {
        tokens += 1;
        match parse_token(token, family) {
            Ok(route) => {
                if let Some(existing) = routes.iter_mut().find(|r| r.destination == route.destination) {
                    *existing = route;
                } else {
                    routes.push(route);
                }
            }
            Err(reason) => warnings.push(RouteWarning {
                network: network.to_string(),
                family,
                token: token.to_string(),
                reason,
            }),
        }
    }

    if tokens > 0 && routes.is_empty() {
        return Err(ValidationError::NoValidRoutes {
            network: network.to_string(),
            family,
            value: cell.to_string(),
        });
    }

    Ok(ParsedRoutes { routes, warnings })
}

fn parse_token(token: &str, family: Family) -> Result<StaticRoute, String> {
    let (route, nexthop) = token
        .split_once('@')
        .ok_or_else(|| "expected route@nexthop".to_string())?;
    if route.is_empty() || nexthop.is_empty() {
        return Err("expected route@nexthop".to_string());
    }

    match family {
        Family::V4 => {
            let destination: Ipv4Net = route
                .parse()
                .map_err(|_| format!("'{}' is not an IPv4 prefix", route))?;
            let nexthop: Ipv4Addr = nexthop
                .parse()
                .map_err(|_| format!("'{}' is not an IPv4 address", nexthop))?;
            Ok(StaticRoute {
                destination: IpNet::V4(destination),
                nexthop: IpAddr::V4(nexthop),
            })
        }
        Family::V6 => {
            let destination: Ipv6Net = route
                .parse()
                .map_err(|_| format!("'{}' is not an IPv6 prefix", route))?;
            let nexthop: Ipv6Addr = nexthop
                .parse()
                .map_err(|_| format!("'{}' is not an IPv6 address", nexthop))?;
            Ok(StaticRoute {
                destination: IpNet::V6(destination),
                nexthop: IpAddr::V6(nexthop),
            })
        }
    }
}
