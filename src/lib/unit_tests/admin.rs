// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use tempfile::TempDir;

use super::ScriptedRunner;
use crate::{
    AdmConfig, ApplyMode, ConfigBackend, DeviceContext, ErrorKind,
    GatewayPatch, NameserverUpdate, NetworkAdmin, NetworkDocument, Operation,
    RoceAcclField, RoceQosIntent, RoceType, SearchUpdate, SetRequest, Trust,
};

const NETWORK_DOC: &str = "network:
  version: 2
  renderer: networkd
  ethernets:
    p0:
      addresses:
      - 192.0.2.10/24
      gateway4: 192.0.2.1
";

const RESOLV_CONF: &str = "search example.com
nameserver 192.0.2.53
nameserver 2001:db8::53
";

fn setup() -> (TempDir, AdmConfig) {
    let tmpdir = tempfile::tempdir().unwrap();
    let root = tmpdir.path();
    std::fs::write(root.join("60-mlnx.yaml"), NETWORK_DOC).unwrap();
    std::fs::write(root.join("resolv.conf"), RESOLV_CONF).unwrap();
    std::fs::write(root.join("mlxreg"), "").unwrap();
    let config = AdmConfig {
        netplan_config: root.join("60-mlnx.yaml"),
        cloud_init_config: root.join("network-config"),
        resolv_conf: root.join("resolv.conf"),
        mlxreg_tool: root.join("mlxreg"),
        sysfs_net: root.join("net"),
        ..Default::default()
    };
    (tmpdir, config)
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

fn with_suffix(path: &Path, suffix: &str) -> String {
    format!("{}{suffix}", path.display())
}

fn roce_ctx() -> DeviceContext {
    DeviceContext::new("p0m0").with_roce("p0", "0000:03:00.0")
}

#[test]
fn test_set_mtu_end_to_end() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new();
    let admin = NetworkAdmin::new(config.clone(), &runner);

    admin
        .set(&DeviceContext::new("p0"), &SetRequest::Mtu(Some(9000)))
        .unwrap();

    let doc =
        NetworkDocument::load(&config.netplan_config, ConfigBackend::Netplan)
            .unwrap();
    assert_eq!(doc.get_mtu("p0").unwrap(), Some(9000));
    assert_eq!(
        doc.get_ip_config("p0").unwrap().ipv4_addr.as_deref(),
        Some("192.0.2.10")
    );
    assert_eq!(runner.calls(), vec!["netplan apply"]);
    assert_eq!(
        read(Path::new(&with_suffix(&config.netplan_config, ".orig"))),
        NETWORK_DOC
    );
    assert_eq!(
        read(Path::new(&with_suffix(&config.netplan_config, ".bak"))),
        NETWORK_DOC
    );

    let result = admin.show(Operation::MtuConfig, &DeviceContext::new("p0"));
    assert_eq!(result.status, 0);
    assert_eq!(result.output, "mtu=9000");
}

#[test]
fn test_gateway_apply_failure_restores_backup() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new()
        .reply("netplan apply", 78, "Error in network definition")
        .reply("netplan apply", 0, "");
    let admin = NetworkAdmin::new(config.clone(), &runner);

    let request = SetRequest::Gateway(GatewayPatch::new(
        Some("203.0.113.1".to_string()),
        None,
    ));
    let result = admin.set(&DeviceContext::new("p0"), &request);

    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::ApplyError);
        assert_eq!(e.status(), 78);
    }
    assert_eq!(read(&config.netplan_config), NETWORK_DOC);
    let bad = read(Path::new(&with_suffix(&config.netplan_config, ".bad")));
    assert!(bad.contains("203.0.113.1"));
    assert_eq!(runner.calls(), vec!["netplan apply", "netplan apply"]);
}

#[test]
fn test_apply_failure_falls_back_to_original() {
    let (_tmpdir, config) = setup();
    let factory = "network:\n  version: 2\n";
    std::fs::write(with_suffix(&config.netplan_config, ".orig"), factory)
        .unwrap();
    let runner = ScriptedRunner::new()
        .reply("netplan apply", 1, "rejected")
        .reply("netplan apply", 1, "still rejected")
        .reply("netplan apply", 0, "");
    let admin = NetworkAdmin::new(config.clone(), &runner);

    let result =
        admin.set(&DeviceContext::new("p0"), &SetRequest::Mtu(Some(1400)));

    assert!(result.is_err());
    assert_eq!(read(&config.netplan_config), factory);
    assert_eq!(runner.calls().len(), 3);
}

#[test]
fn test_apply_and_recovery_failure() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new().reply("netplan apply", 1, "rejected");
    let admin = NetworkAdmin::new(config, &runner);

    let result =
        admin.set(&DeviceContext::new("p0"), &SetRequest::Mtu(Some(1400)));

    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::RecoveryFailure);
    }
    assert_eq!(runner.calls().len(), 3);
}

#[test]
fn test_set_without_network_config() {
    let (_tmpdir, mut config) = setup();
    config.netplan_config = config.netplan_config.with_file_name("absent.yaml");
    let runner = ScriptedRunner::new();
    let admin = NetworkAdmin::new(config, &runner);

    let result =
        admin.set(&DeviceContext::new("p0"), &SetRequest::Mtu(Some(9000)));

    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::ConfigLoadError);
    }
    assert!(runner.calls().is_empty());
}

#[test]
fn test_cloud_init_apply_sequence() {
    let (_tmpdir, mut config) = setup();
    config.backend = ConfigBackend::CloudInit;
    std::fs::write(
        &config.cloud_init_config,
        "version: 2\nethernets:\n  p0:\n    dhcp4: true\n",
    )
    .unwrap();
    let runner = ScriptedRunner::new();
    let admin = NetworkAdmin::new(config.clone(), &runner);

    admin
        .set(&DeviceContext::new("p0"), &SetRequest::Mtu(Some(9000)))
        .unwrap();

    assert_eq!(
        runner.calls(),
        vec!["cloud-init clean", "cloud-init init", "netplan apply"]
    );
    let content = read(&config.cloud_init_config);
    assert!(content.contains("mtu: 9000"));
    assert!(content.contains("dhcp4: true"));
}

#[test]
fn test_runtime_mode_leaves_document() {
    let (_tmpdir, mut config) = setup();
    config.apply_mode = ApplyMode::Runtime;
    let runner = ScriptedRunner::new();
    let admin = NetworkAdmin::new(config.clone(), &runner);

    admin
        .set(&DeviceContext::new("p0"), &SetRequest::Mtu(Some(9000)))
        .unwrap();

    assert_eq!(runner.calls(), vec!["ip link set p0 mtu 9000"]);
    assert_eq!(read(&config.netplan_config), NETWORK_DOC);
}

#[test]
fn test_show_ip_and_gateway() {
    let (_tmpdir, config) = setup();
    std::fs::write(
        &config.netplan_config,
        "network:
  ethernets:
    p0:
      dhcp4: true
      addresses:
      - 2001:db8::10/64
      routes:
      - to: 198.51.100.0/24
        via: 192.0.2.254
        metric: 100
",
    )
    .unwrap();
    let runner = ScriptedRunner::new();
    let admin = NetworkAdmin::new(config, &runner);
    let ctx = DeviceContext::new("p0");

    let result = admin.show(Operation::IpConfig, &ctx);
    assert_eq!(
        result.output,
        "ipv4_addr=dhcp4/ipv4_prefix=/ipv6_addr=2001:db8::10/ipv6_prefix=64"
    );

    let result = admin.show(Operation::GwConfig, &ctx);
    assert_eq!(result.output, "ipv4_gateway=/ipv6_gateway=");
    let routes = result.routes.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].metric, Some(100));
}

#[test]
fn test_show_mtu_falls_back_to_running_value() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new().reply("/mtu", 0, "1500\n");
    let admin = NetworkAdmin::new(config, &runner);

    let result = admin.show(Operation::MtuConfig, &DeviceContext::new("p0"));
    assert_eq!(result.status, 0);
    assert_eq!(result.output, "mtu=1500");
}

#[test]
fn test_show_mtu_failure() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new().reply("/mtu", 1, "No such file");
    let admin = NetworkAdmin::new(config, &runner);

    let result = admin.show(Operation::MtuConfig, &DeviceContext::new("p9"));
    assert_eq!(result.status, 1);
    assert!(result
        .output
        .starts_with("ERR: Failed to get MTU for p9 interface"));
}

#[test]
fn test_show_without_device() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new();
    let admin = NetworkAdmin::new(config, &runner);

    let result = admin.show(Operation::IpConfig, &DeviceContext::default());
    assert_eq!(result.status, 1);
    assert!(result.output.starts_with("ERR: "));
}

#[test]
fn test_dns_set_and_show() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new();
    let admin = NetworkAdmin::new(config.clone(), &runner);

    admin
        .set(
            &DeviceContext::default(),
            &SetRequest::Dns(NameserverUpdate::new(
                vec!["198.51.100.53".to_string()],
                Vec::new(),
            )),
        )
        .unwrap();

    let result = admin.show(Operation::DnsConfig, &DeviceContext::default());
    assert_eq!(result.output, "ipv4_nameservers=198.51.100.53/ipv6_nameservers=");
    assert_eq!(
        read(Path::new(&with_suffix(&config.resolv_conf, ".orig"))),
        RESOLV_CONF
    );

    admin
        .set(
            &DeviceContext::default(),
            &SetRequest::Domain(SearchUpdate::from_domains([
                "a.example.com",
                "b.example.com",
            ])),
        )
        .unwrap();
    let result = admin.show(Operation::DomainConfig, &DeviceContext::default());
    assert_eq!(result.output, "domains=a.example.com,b.example.com");
    assert_eq!(
        read(Path::new(&with_suffix(&config.resolv_conf, ".orig"))),
        RESOLV_CONF
    );
    assert!(runner.calls().is_empty());
}

#[test]
fn test_dns_set_rejects_wrong_family() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new();
    let admin = NetworkAdmin::new(config.clone(), &runner);

    let result = admin.set(
        &DeviceContext::default(),
        &SetRequest::Dns(NameserverUpdate::new(
            vec!["2001:db8::53".to_string()],
            Vec::new(),
        )),
    );
    assert!(result.is_err());
    assert_eq!(read(&config.resolv_conf), RESOLV_CONF);
}

#[test]
fn test_show_roce() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new()
        .reply(
            "mlnx_qos",
            0,
            "Priority trust state: dscp\nCable len: 7\n",
        )
        .reply("--get", 0, "roce_tx_window_en | 0x00000001\n")
        .reply("roce_np/enable/3", 0, "1\n");
    let admin = NetworkAdmin::new(config, &runner);

    let result = admin.show(Operation::RoceConfig, &roce_ctx());

    assert_eq!(result.status, 0);
    assert!(result.output.starts_with("trust=dscp/prio_tc=/ecn=0,0,0,1,0,0,0,0/"));
    assert!(result.output.contains("/cable_len=7/"));
    assert!(result.output.ends_with("/roce_accl=roce_tx_window_en=0x00000001"));
    assert_eq!(result.roce.unwrap().trust, Some(Trust::Dscp));
    // one query per tool plus one ECN read per priority
    assert_eq!(runner.calls().len(), 10);
}

#[test]
fn test_show_roce_tool_failure() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new().reply("mlnx_qos", 2, "netlink error");
    let admin = NetworkAdmin::new(config, &runner);

    let result = admin.show(Operation::RoceConfig, &roce_ctx());

    assert_eq!(result.status, 2);
    assert!(result.output.contains("Failed to run mlnx_qos. RC=2"));
    assert!(result.roce.is_none());
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn test_show_roce_stops_at_failed_ecn_read() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new().reply(
        "roce_np/enable/3",
        2,
        "cat: enable/3: No such file or directory",
    );
    let admin = NetworkAdmin::new(config, &runner);

    let result = admin.show(Operation::RoceConfig, &roce_ctx());

    assert_eq!(result.status, 2);
    assert!(result.output.starts_with("ERR: Failed to read ECN. RC=2"));
    assert!(result.output.contains("enable/3: No such file or directory"));
    assert!(result.roce.is_none());
    let calls = runner.calls();
    assert_eq!(calls.len(), 6);
    assert!(calls[5].ends_with("roce_np/enable/3"));
}

#[test]
fn test_set_roce_order() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new().reply("tee", 1, "Permission denied");
    let admin = NetworkAdmin::new(config.clone(), &runner);
    let intent = RoceQosIntent {
        roce_type: Some(RoceType::Lossless),
        trust: Some(Trust::Dscp),
        ecn: vec![true],
        roce_accl: vec![RoceAcclField::new("roce_slow_restart_idle_en", "0x1")],
        ..Default::default()
    };

    admin.set(&roce_ctx(), &SetRequest::Roce(intent)).unwrap();

    let calls = runner.commands();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].program, "tee");
    let mlxreg = config.mlxreg_tool.display().to_string();
    assert_eq!(calls[1].program, mlxreg);
    assert_eq!(
        calls[1].args.last().map(String::as_str),
        Some(
            "roce_adp_retrans_en=0x0,roce_tx_window_en=0x0,\
             roce_slow_restart_en=0x0"
        )
    );
    assert_eq!(calls[2].program, mlxreg);
    assert_eq!(
        calls[2].args.last().map(String::as_str),
        Some("roce_slow_restart_idle_en=0x1")
    );
    assert_eq!(calls[3].to_string(), "mlnx_qos -i p0 --trust dscp");
}

#[test]
fn test_set_roce_without_register_tool() {
    let (_tmpdir, mut config) = setup();
    config.mlxreg_tool = config.mlxreg_tool.with_file_name("absent");
    let runner = ScriptedRunner::new();
    let admin = NetworkAdmin::new(config, &runner);
    let intent = RoceQosIntent {
        trust: Some(Trust::Pcp),
        ..Default::default()
    };

    let result = admin.set(&roce_ctx(), &SetRequest::Roce(intent));

    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::ToolInvocationError);
    }
    assert!(runner.calls().is_empty());
}

#[test]
fn test_set_roce_empty_intent() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new();
    let admin = NetworkAdmin::new(config, &runner);

    admin
        .set(
            &DeviceContext::default(),
            &SetRequest::Roce(RoceQosIntent::default()),
        )
        .unwrap();
    assert!(runner.calls().is_empty());
}

#[test]
fn test_set_roce_failure_status() {
    let (_tmpdir, config) = setup();
    let runner = ScriptedRunner::new().reply("mlnx_qos", 3, "invalid");
    let admin = NetworkAdmin::new(config, &runner);
    let intent = RoceQosIntent {
        cable_len: Some(7),
        ..Default::default()
    };

    let result = admin.set(&roce_ctx(), &SetRequest::Roce(intent));

    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::ToolInvocationError);
        assert_eq!(e.status(), 3);
    }
}
