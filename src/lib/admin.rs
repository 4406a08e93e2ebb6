// SPDX-License-Identifier: Apache-2.0

use crate::{
    iproute::runtime_commands,
    roce::{
        build_accl_query_command, build_accl_set_command,
        build_ecn_read_command, build_ecn_write_commands, build_qos_command,
        build_qos_query_command, parse_ecn_flag, parse_qos_report,
        parse_roce_accl, PRIORITY_COUNT,
    },
    Action, AdmConfig, ApplyMode, BackupChain, BfnetError, ConfigBackend,
    DeviceContext, DomainPatch, ErrorKind, GatewayConfigView, IpConfigView,
    NetworkDocument, Operation, OperationResult, RecoveryOutcome,
    ResolverConfig, RoceQosIntent, RoceQosReport, SetRequest, ToolCommand,
    ToolRunner,
};

/// Entry point of every show and set operation.
#[derive(Debug)]
pub struct NetworkAdmin<R: ToolRunner> {
    config: AdmConfig,
    runner: R,
}

impl<R: ToolRunner> NetworkAdmin<R> {
    pub fn new(config: AdmConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &AdmConfig {
        &self.config
    }

    /// Query current state of `op`. Failures are reported through the
    /// status and output of the result.
    pub fn show(&self, op: Operation, ctx: &DeviceContext) -> OperationResult {
        let mut result = OperationResult::new(op, Action::Show);
        if let Err(e) = self.query(op, ctx, &mut result) {
            log::error!("Failed to show {op}: {e}");
            result.set_error(&e);
        }
        result
    }

    pub fn set(
        &self,
        ctx: &DeviceContext,
        request: &SetRequest,
    ) -> Result<(), BfnetError> {
        log::info!("Setting {} with {request:?}", request.operation());
        match request {
            SetRequest::Ip(_) | SetRequest::Mtu(_) | SetRequest::Gateway(_) => {
                let device = ctx.require_device()?;
                let Some(patch) = request.domain_patch() else {
                    return Err(BfnetError::new(
                        ErrorKind::Bug,
                        format!("No document patch for {request:?}"),
                    ));
                };
                if let DomainPatch::Gateway(p) = &patch {
                    p.validate()?;
                }
                match self.config.apply_mode {
                    ApplyMode::Persistent => self.set_document(device, &patch),
                    ApplyMode::Runtime => self.set_runtime(device, &patch),
                }
            }
            SetRequest::Dns(update) => {
                update.validate()?;
                self.set_resolver(|r| r.set_nameservers(update))
            }
            SetRequest::Domain(update) => {
                self.set_resolver(|r| r.set_search(update))
            }
            SetRequest::Roce(intent) => self.set_roce(ctx, intent),
        }
    }

    fn query(
        &self,
        op: Operation,
        ctx: &DeviceContext,
        result: &mut OperationResult,
    ) -> Result<(), BfnetError> {
        match op {
            Operation::IpConfig => {
                let device = ctx.require_device()?;
                let view = self.load_document()?.get_ip_config(device)?;
                result.output = ip_view_to_output(&view);
            }
            Operation::MtuConfig => {
                let device = ctx.require_device()?;
                result.output = format!("mtu={}", self.query_mtu(device)?);
            }
            Operation::GwConfig => {
                let device = ctx.require_device()?;
                let view = self.load_document()?.get_gateway_config(device)?;
                result.output = gateway_view_to_output(&view);
                if !view.routes.is_empty() {
                    result.routes = Some(view.routes);
                }
            }
            Operation::DnsConfig => {
                let resolver = ResolverConfig::load(&self.config.resolv_conf)?;
                result.output = format!(
                    "ipv4_nameservers={}/ipv6_nameservers={}",
                    resolver.ipv4_nameservers().join(","),
                    resolver.ipv6_nameservers().join(",")
                );
            }
            Operation::DomainConfig => {
                let resolver = ResolverConfig::load(&self.config.resolv_conf)?;
                result.output =
                    format!("domains={}", resolver.search_domains.join(","));
            }
            Operation::RoceConfig => {
                let report = self.query_roce(ctx)?;
                result.output = report.to_show_output();
                result.roce = Some(report);
            }
        }
        Ok(())
    }

    fn load_document(&self) -> Result<NetworkDocument, BfnetError> {
        NetworkDocument::load(self.config.network_config(), self.config.backend)
    }

    fn query_mtu(&self, device: &str) -> Result<String, BfnetError> {
        if let Some(mtu) = self.load_document()?.get_mtu(device)? {
            return Ok(mtu.to_string());
        }
        log::debug!("No MTU stored for {device}, reading current value");
        let path = self.config.sysfs_net.join(device).join("mtu");
        let output = self
            .runner
            .run(
                &ToolCommand::new(self.config.cat_tool.as_str())
                    .arg(path.display().to_string()),
            )
            .check(
                ErrorKind::ToolInvocationError,
                &format!("get MTU for {device} interface"),
            )?;
        Ok(output.trim().to_string())
    }

    fn query_roce(
        &self,
        ctx: &DeviceContext,
    ) -> Result<RoceQosReport, BfnetError> {
        let roce_device = ctx.require_roce_device()?;
        let pci_device = ctx.require_pci_device()?;

        let qos_output = self
            .runner
            .run(&build_qos_query_command(
                &self.config.mlnx_qos_tool,
                roce_device,
            ))
            .check(ErrorKind::ToolInvocationError, "run mlnx_qos")?;
        let mut report = parse_qos_report(&qos_output)?;

        let accl_output = self
            .runner
            .run(&build_accl_query_command(
                &self.config.mlxreg_tool,
                pci_device,
            ))
            .check(ErrorKind::ToolInvocationError, "run mlxreg")?;
        report.roce_accl = parse_roce_accl(&accl_output);

        for prio in 0..PRIORITY_COUNT {
            let output = self
                .runner
                .run(&build_ecn_read_command(
                    &self.config.cat_tool,
                    &self.config.sysfs_net,
                    roce_device,
                    prio,
                ))
                .check(ErrorKind::ToolInvocationError, "read ECN")?;
            if parse_ecn_flag(&output) {
                report.ecn_enabled.insert(prio);
            }
        }
        Ok(report)
    }

    fn set_document(
        &self,
        device: &str,
        patch: &DomainPatch,
    ) -> Result<(), BfnetError> {
        let path = self.config.network_config();
        let chain = BackupChain::new(path);
        chain.prepare()?;

        let mut doc = self.load_document()?;
        doc.merge_patch(device, patch)?;
        doc.prune_empty(device)?;
        doc.save(path)?;

        if let Err(e) = self.apply_document() {
            log::error!("{e}");
            match chain.recover(|| self.apply_document())? {
                RecoveryOutcome::RestoredBackup => log::warn!(
                    "Configuration of {device} reverted to previous state"
                ),
                RecoveryOutcome::RestoredOriginal => log::warn!(
                    "Configuration of {device} reverted to factory default"
                ),
            }
            return Err(e);
        }
        log::info!("Configuration of {device} applied");
        Ok(())
    }

    fn apply_document(&self) -> Result<(), BfnetError> {
        if self.config.backend == ConfigBackend::CloudInit {
            for step in ["clean", "init"] {
                let output = self.runner.run(
                    &ToolCommand::new(self.config.cloud_init_tool.as_str())
                        .arg(step),
                );
                if !output.is_success() {
                    log::warn!(
                        "cloud-init {step} failed. RC={}\nOutput:\n{}",
                        output.exit_code,
                        output.output.trim()
                    );
                }
            }
        }
        self.runner
            .run(&ToolCommand::new(self.config.netplan_tool.as_str()).arg("apply"))
            .check(ErrorKind::ApplyError, "apply configuration")
            .map(|_| ())
    }

    fn set_runtime(
        &self,
        device: &str,
        patch: &DomainPatch,
    ) -> Result<(), BfnetError> {
        for cmd in runtime_commands(&self.config.ip_tool, device, patch)? {
            self.runner.run(&cmd).check(
                ErrorKind::ToolInvocationError,
                &format!("configure {device} interface"),
            )?;
        }
        Ok(())
    }

    fn set_resolver<F>(&self, update: F) -> Result<(), BfnetError>
    where
        F: FnOnce(&mut ResolverConfig),
    {
        let path = self.config.resolv_conf.as_path();
        BackupChain::new(path).capture_original()?;
        let mut resolver = ResolverConfig::load(path)?;
        update(&mut resolver);
        resolver.save(path)
    }

    fn set_roce(
        &self,
        ctx: &DeviceContext,
        intent: &RoceQosIntent,
    ) -> Result<(), BfnetError> {
        if !self.config.mlxreg_tool.exists() {
            return Err(BfnetError::new(
                ErrorKind::ToolInvocationError,
                format!(
                    "{} tool does not exist. Cannot show/set RoCE configuration",
                    self.config.mlxreg_tool.display()
                ),
            ));
        }
        intent.validate()?;
        if intent.is_empty() {
            log::info!("No RoCE setting requested, nothing to change");
            return Ok(());
        }
        let roce_device = ctx.require_roce_device()?;

        for cmd in build_ecn_write_commands(
            &self.config.tee_tool,
            &self.config.sysfs_net,
            roce_device,
            &intent.ecn,
        ) {
            let output = self.runner.run(&cmd);
            if !output.is_success() {
                log::warn!(
                    "Failed to set ECN with {cmd}. RC={}\nOutput:\n{}",
                    output.exit_code,
                    output.output.trim()
                );
            }
        }

        let type_fields = intent
            .roce_type
            .map(|t| t.accl_fields())
            .unwrap_or_default();
        for fields in [type_fields.as_slice(), intent.roce_accl.as_slice()] {
            if fields.is_empty() {
                continue;
            }
            let pci_device = ctx.require_pci_device()?;
            if let Some(cmd) = build_accl_set_command(
                &self.config.mlxreg_tool,
                pci_device,
                fields,
            ) {
                self.runner
                    .run(&cmd)
                    .check(ErrorKind::ToolInvocationError, "run mlxreg")?;
            }
        }

        if let Some(cmd) =
            build_qos_command(&self.config.mlnx_qos_tool, roce_device, intent)
        {
            self.runner
                .run(&cmd)
                .check(ErrorKind::ToolInvocationError, "run mlnx_qos")?;
        }
        Ok(())
    }
}

fn ip_view_to_output(view: &IpConfigView) -> String {
    let ipv4_addr = if view.dhcp4 {
        "dhcp4"
    } else {
        view.ipv4_addr.as_deref().unwrap_or_default()
    };
    let ipv6_addr = if view.dhcp6 {
        "dhcp6"
    } else {
        view.ipv6_addr.as_deref().unwrap_or_default()
    };
    format!(
        "ipv4_addr={ipv4_addr}/ipv4_prefix={}/ipv6_addr={ipv6_addr}/\
         ipv6_prefix={}",
        view.ipv4_prefix.as_deref().unwrap_or_default(),
        view.ipv6_prefix.as_deref().unwrap_or_default(),
    )
}

fn gateway_view_to_output(view: &GatewayConfigView) -> String {
    format!(
        "ipv4_gateway={}/ipv6_gateway={}",
        view.gateway4.as_deref().unwrap_or_default(),
        view.gateway6.as_deref().unwrap_or_default(),
    )
}
