// SPDX-License-Identifier: Apache-2.0

use crate::{NameserverUpdate, ResolverConfig, SearchUpdate};

const RESOLV_CONF: &str = "# Generated
search example.com lab.example.com
nameserver 192.0.2.53
nameserver 2001:db8::53
options edns0
";

#[test]
fn test_parse_resolv_conf() {
    let resolver = ResolverConfig::parse(RESOLV_CONF);
    assert_eq!(
        resolver.search_domains,
        vec!["example.com".to_string(), "lab.example.com".to_string()]
    );
    assert_eq!(resolver.ipv4_nameservers(), vec!["192.0.2.53"]);
    assert_eq!(resolver.ipv6_nameservers(), vec!["2001:db8::53"]);
}

#[test]
fn test_replace_nameservers_drops_stored() {
    let mut resolver = ResolverConfig::parse(RESOLV_CONF);
    resolver.set_nameservers(&NameserverUpdate::new(
        vec!["198.51.100.53".to_string(), String::new()],
        Vec::new(),
    ));
    assert_eq!(
        resolver.to_file_content(),
        "search example.com lab.example.com\nnameserver 198.51.100.53\n"
    );
}

#[test]
fn test_ipv4_nameservers_written_before_ipv6() {
    let mut resolver = ResolverConfig::default();
    resolver.set_nameservers(&NameserverUpdate::new(
        vec!["192.0.2.53".to_string()],
        vec!["2001:db8::53".to_string()],
    ));
    assert_eq!(
        resolver.to_file_content(),
        "nameserver 192.0.2.53\nnameserver 2001:db8::53\n"
    );
}

#[test]
fn test_empty_nameserver_update_keeps_stored() {
    let mut resolver = ResolverConfig::parse(RESOLV_CONF);
    resolver.set_nameservers(&NameserverUpdate::default());
    assert_eq!(resolver.nameservers.len(), 2);
}

#[test]
fn test_search_update() {
    let mut resolver = ResolverConfig::parse(RESOLV_CONF);
    resolver.set_search(&SearchUpdate::Keep);
    assert_eq!(resolver.search_domains.len(), 2);

    resolver.set_search(&SearchUpdate::from_domains(["corp.example.com"]));
    assert_eq!(resolver.search_domains, vec!["corp.example.com".to_string()]);

    resolver.set_search(&SearchUpdate::from_domains([""]));
    assert!(!resolver.to_file_content().contains("search"));
}

#[test]
fn test_nameserver_update_validation() {
    assert!(NameserverUpdate::new(vec!["2001:db8::53".to_string()], Vec::new())
        .validate()
        .is_err());
    assert!(NameserverUpdate::new(
        vec!["192.0.2.53".to_string(), " ".to_string()],
        vec!["2001:db8::53".to_string()]
    )
    .validate()
    .is_ok());
}

#[test]
fn test_save_and_load() {
    let tmpdir = tempfile::tempdir().unwrap();
    let path = tmpdir.path().join("resolv.conf");
    let mut resolver = ResolverConfig::default();
    resolver.set_search(&SearchUpdate::from_domains(["example.com"]));
    resolver.save(&path).unwrap();

    let loaded = ResolverConfig::load(&path).unwrap();
    assert_eq!(loaded, resolver);
}
