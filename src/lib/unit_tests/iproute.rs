// SPDX-License-Identifier: Apache-2.0

use crate::{
    runtime_commands, AddrIntent, DomainPatch, ErrorKind, GatewayPatch, IpPatch,
};

fn texts(patch: &DomainPatch) -> Vec<String> {
    runtime_commands("ip", "p0m0", patch)
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn test_runtime_address_commands() {
    let patch = DomainPatch::Ip(IpPatch::new(
        Some(AddrIntent::Static("192.0.2.10/24".to_string())),
        Some(AddrIntent::Static("2001:db8::10/64".to_string())),
    ));
    assert_eq!(
        texts(&patch),
        vec![
            "ip address add dev p0m0 192.0.2.10/24",
            "ip address add dev p0m0 2001:db8::10/64"
        ]
    );
}

#[test]
fn test_runtime_dhcp_rejected() {
    let patch = DomainPatch::Ip(IpPatch::new(Some(AddrIntent::Dhcp), None));
    let result = runtime_commands("ip", "p0m0", &patch);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_runtime_mtu_command() {
    assert_eq!(
        texts(&DomainPatch::Mtu(Some(9000))),
        vec!["ip link set p0m0 mtu 9000"]
    );
    assert!(texts(&DomainPatch::Mtu(None)).is_empty());
}

#[test]
fn test_runtime_route_commands() {
    let default_route = DomainPatch::Gateway(
        GatewayPatch::new(Some("192.0.2.1".to_string()), None)
            .with_route(None, None, Some(100)),
    );
    assert_eq!(
        texts(&default_route),
        vec!["ip route add default via 192.0.2.1 dev p0m0 metric 100"]
    );

    let network_route = DomainPatch::Gateway(
        GatewayPatch::new(Some("192.0.2.1".to_string()), None).with_route(
            Some("198.51.100.9".to_string()),
            Some("255.255.255.0".to_string()),
            None,
        ),
    );
    assert_eq!(
        texts(&network_route),
        vec!["ip route add 198.51.100.0/24 via 192.0.2.1 dev p0m0"]
    );
}

#[test]
fn test_runtime_route_family_mismatch() {
    let patch = DomainPatch::Gateway(
        GatewayPatch::new(None, Some("2001:db8::1".to_string())).with_route(
            Some("10.0.0.0".to_string()),
            Some("24".to_string()),
            Some(100),
        ),
    );
    let result = runtime_commands("ip", "p0m0", &patch);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}
