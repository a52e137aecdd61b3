//! IP address sensor.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{Result, SensorError};
use crate::sensor::Sensor;

/// Address family names and their display labels.
const FAMILIES: [(&str, &str); 2] = [("AF_INET", "IPv4"), ("AF_INET6", "IPv6")];

/// Lists the IPv4 and IPv6 addresses assigned to this host.
///
/// Values are `(family, address)` pairs in interface enumeration order with
/// duplicates removed, e.g. `("AF_INET", "192.168.1.10")`.
#[derive(Debug, Default)]
pub struct IpAddresses;

impl IpAddresses {
    pub fn new() -> Self {
        Self
    }

    fn family_label(family: &str) -> &'static str {
        FAMILIES
            .iter()
            .find(|(name, _)| *name == family)
            .map(|(_, label)| *label)
            .unwrap_or("Unknown")
    }

    /// Reads all interface addresses using getifaddrs.
    fn interface_addresses() -> Result<Vec<(String, String)>> {
        let mut found = Vec::new();

        // SAFETY: getifaddrs is a standard POSIX function. We properly free the
        // list with freeifaddrs when done.
        unsafe {
            let mut ifaddrs: *mut libc::ifaddrs = std::ptr::null_mut();
            if libc::getifaddrs(&mut ifaddrs) != 0 {
                let err = std::io::Error::last_os_error();
                return Err(SensorError::Intermittent(format!(
                    "Could not list network interfaces: {}",
                    err
                )));
            }

            let mut current = ifaddrs;
            while !current.is_null() {
                let ifa = &*current;

                if !ifa.ifa_addr.is_null() {
                    let family = (*ifa.ifa_addr).sa_family as i32;

                    if family == libc::AF_INET {
                        let sockaddr_in = ifa.ifa_addr as *const libc::sockaddr_in;
                        let addr_bytes = (*sockaddr_in).sin_addr.s_addr.to_ne_bytes();
                        found.push(("AF_INET".to_string(), Ipv4Addr::from(addr_bytes).to_string()));
                    } else if family == libc::AF_INET6 {
                        let sockaddr_in6 = ifa.ifa_addr as *const libc::sockaddr_in6;
                        let addr_bytes = (*sockaddr_in6).sin6_addr.s6_addr;
                        found.push(("AF_INET6".to_string(), Ipv6Addr::from(addr_bytes).to_string()));
                    }
                }

                current = ifa.ifa_next;
            }

            libc::freeifaddrs(ifaddrs);
        }

        Ok(found)
    }
}

/// Keeps the first occurrence of each pair, preserving order.
fn dedup_pairs(pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut unique: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    for pair in pairs {
        if !unique.contains(&pair) {
            unique.push(pair);
        }
    }
    unique
}

impl Sensor for IpAddresses {
    type Value = Vec<(String, String)>;

    const NAME: &'static str = "ip_addresses";
    const TITLE: &'static str = "IP Addresses";

    fn value(&self) -> Result<Self::Value> {
        Self::interface_addresses().map(dedup_pairs)
    }

    fn format(value: &Self::Value) -> String {
        value
            .iter()
            .map(|(family, address)| format!("{} ({})", address, Self::family_label(family)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(family: &str, address: &str) -> (String, String) {
        (family.to_string(), address.to_string())
    }

    #[test]
    fn test_format_one_line_per_address() {
        let value = vec![pair("AF_INET", "127.0.0.1"), pair("AF_INET6", "::1")];
        assert_eq!(IpAddresses::format(&value), "127.0.0.1 (IPv4)\n::1 (IPv6)");
    }

    #[test]
    fn test_format_unknown_family() {
        let value = vec![pair("AF_PACKET", "00:11:22:33:44:55")];
        assert_eq!(IpAddresses::format(&value), "00:11:22:33:44:55 (Unknown)");
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(IpAddresses::format(&Vec::new()), "");
    }

    #[test]
    fn test_dedup_preserves_order() {
        let pairs = vec![
            pair("AF_INET", "10.0.0.2"),
            pair("AF_INET6", "fe80::1"),
            pair("AF_INET", "10.0.0.2"),
            pair("AF_INET", "127.0.0.1"),
        ];
        assert_eq!(
            dedup_pairs(pairs),
            vec![
                pair("AF_INET", "10.0.0.2"),
                pair("AF_INET6", "fe80::1"),
                pair("AF_INET", "127.0.0.1"),
            ]
        );
    }

    #[test]
    fn test_value_only_ip_families() {
        let value = IpAddresses.value().unwrap();
        assert!(value
            .iter()
            .all(|(family, _)| family == "AF_INET" || family == "AF_INET6"));
    }
}
