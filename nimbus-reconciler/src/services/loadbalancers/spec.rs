use crate::config::{FrontendIpConfig, LbRole, LbSku, LbType};
use crate::error::{ReconcileError, Result};
use crate::merge::merge_by_name;
use crate::models::{
    BackendAddressPool, FrontendIpConfiguration, IpAllocationMethod, LoadBalancer,
    LoadBalancingRule, LoadDistribution, OutboundRule, Probe, ProbeProtocol, Resource,
    ResourceKind, Sku, SubResource, TransportProtocol, downcast,
};
use crate::resource_id;
use crate::spec::ResourceSpec;
use crate::tags::{BuildParams, ResourceLifecycle, Tags, build_tags};

pub const LB_RULE_HTTPS: &str = "LBRuleHTTPS";
pub const HTTPS_PROBE: &str = "HTTPSProbe";
pub const OUTBOUND_NAT_ALL_PROTOCOLS: &str = "OutboundNATAllProtocols";

const PROBE_INTERVAL_SECONDS: i32 = 15;
const PROBE_COUNT: i32 = 4;

/// Desired state of one load balancer.
#[derive(Debug, Clone, PartialEq)]
pub struct LbSpec {
    pub name: String,
    pub resource_group: String,
    pub subscription_id: String,
    pub cluster_name: String,
    pub location: String,
    pub role: LbRole,
    pub lb_type: LbType,
    pub sku: LbSku,
    pub vnet_name: String,
    pub vnet_resource_group: String,
    /// Subnet for internal frontends.
    pub subnet_name: Option<String>,
    pub frontend_ip_configs: Vec<FrontendIpConfig>,
    pub backend_pool_name: String,
    pub api_server_port: u16,
    pub additional_ports: Vec<u16>,
    pub idle_timeout_in_minutes: i32,
    pub additional_tags: Tags,
}

fn role_tag(role: LbRole) -> &'static str {
    match role {
        LbRole::APIServer => "apiserver",
        LbRole::NodeOutbound => "nodeOutbound",
        LbRole::ControlPlaneOutbound => "controlPlaneOutbound",
    }
}

impl LbSpec {
    fn frontend_id(&self, frontend: &str) -> String {
        resource_id::frontend_ip_config_id(&self.subscription_id, &self.resource_group, &self.name, frontend)
    }

    fn backend_pool_ref(&self) -> SubResource {
        SubResource::new(resource_id::backend_pool_id(
            &self.subscription_id,
            &self.resource_group,
            &self.name,
            &self.backend_pool_name,
        ))
    }

    fn frontend_ip_configurations(&self) -> Result<Vec<FrontendIpConfiguration>> {
        self.frontend_ip_configs
            .iter()
            .map(|fe| {
                let mut config = FrontendIpConfiguration {
                    name: fe.name.clone(),
                    ..Default::default()
                };
                match self.lb_type {
                    LbType::Public => {
                        let pip = fe.public_ip.as_ref().ok_or_else(|| {
                            ReconcileError::Configuration(format!(
                                "public load balancer {} frontend {} has no public IP",
                                self.name, fe.name
                            ))
                        })?;
                        config.public_ip_address = Some(SubResource::new(resource_id::public_ip_id(
                            &self.subscription_id,
                            &self.resource_group,
                            &pip.name,
                        )));
                    }
                    LbType::Internal => {
                        let subnet = self.subnet_name.as_deref().ok_or_else(|| {
                            ReconcileError::Configuration(format!(
                                "internal load balancer {} has no subnet",
                                self.name
                            ))
                        })?;
                        config.subnet = Some(SubResource::new(resource_id::subnet_id(
                            &self.subscription_id,
                            &self.vnet_resource_group,
                            &self.vnet_name,
                            subnet,
                        )));
                        config.private_ip_address = fe.private_ip_address.clone();
                        config.private_ip_allocation_method = Some(match fe.private_ip_address {
                            Some(_) => IpAllocationMethod::Static,
                            None => IpAllocationMethod::Dynamic,
                        });
                    }
                }
                Ok(config)
            })
            .collect()
    }

    fn load_balancing_rules(&self) -> Vec<LoadBalancingRule> {
        if self.role != LbRole::APIServer {
            return Vec::new();
        }
        let Some(frontend) = self.frontend_ip_configs.first() else {
            return Vec::new();
        };
        let frontend = SubResource::new(self.frontend_id(&frontend.name));
        let probe = SubResource::new(resource_id::probe_id(
            &self.subscription_id,
            &self.resource_group,
            &self.name,
            HTTPS_PROBE,
        ));

        let rule = |name: String, port: u16| LoadBalancingRule {
            name,
            protocol: TransportProtocol::Tcp,
            frontend_port: port,
            backend_port: port,
            idle_timeout_in_minutes: self.idle_timeout_in_minutes,
            enable_floating_ip: false,
            disable_outbound_snat: true,
            load_distribution: LoadDistribution::Default,
            frontend_ip_configuration: Some(frontend.clone()),
            backend_address_pool: Some(self.backend_pool_ref()),
            probe: Some(probe.clone()),
        };

        let mut rules = vec![rule(LB_RULE_HTTPS.to_string(), self.api_server_port)];
        for port in &self.additional_ports {
            rules.push(rule(format!("{}-{}", LB_RULE_HTTPS, port), *port));
        }
        rules
    }

    fn probes(&self) -> Vec<Probe> {
        if self.role != LbRole::APIServer {
            return Vec::new();
        }
        vec![Probe {
            name: HTTPS_PROBE.to_string(),
            protocol: ProbeProtocol::Tcp,
            port: self.api_server_port,
            request_path: None,
            interval_in_seconds: PROBE_INTERVAL_SECONDS,
            number_of_probes: PROBE_COUNT,
        }]
    }

    // Internal load balancers get no SNAT.
    fn outbound_rules(&self) -> Vec<OutboundRule> {
        if self.lb_type == LbType::Internal {
            return Vec::new();
        }
        vec![OutboundRule {
            name: OUTBOUND_NAT_ALL_PROTOCOLS.to_string(),
            protocol: TransportProtocol::All,
            idle_timeout_in_minutes: self.idle_timeout_in_minutes,
            enable_tcp_reset: false,
            frontend_ip_configurations: self
                .frontend_ip_configs
                .iter()
                .map(|fe| SubResource::new(self.frontend_id(&fe.name)))
                .collect(),
            backend_address_pool: Some(self.backend_pool_ref()),
        }]
    }

    /// The full body for a load balancer that does not exist yet.
    pub fn desired(&self) -> Result<LoadBalancer> {
        Ok(LoadBalancer {
            id: None,
            name: self.name.clone(),
            location: Some(self.location.clone()),
            etag: None,
            tags: build_tags(BuildParams {
                cluster_name: &self.cluster_name,
                lifecycle: ResourceLifecycle::Owned,
                name: Some(&self.name),
                role: Some(role_tag(self.role)),
                additional: &self.additional_tags,
            }),
            sku: match self.sku {
                LbSku::Standard => Sku::Standard,
            },
            frontend_ip_configurations: self.frontend_ip_configurations()?,
            backend_address_pools: vec![BackendAddressPool {
                name: self.backend_pool_name.clone(),
                id: None,
            }],
            load_balancing_rules: self.load_balancing_rules(),
            probes: self.probes(),
            outbound_rules: self.outbound_rules(),
            provisioning_state: None,
        })
    }
}

impl ResourceSpec for LbSpec {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::LoadBalancer
    }

    fn resource_id(&self) -> String {
        resource_id::resource_id(
            &self.subscription_id,
            &self.resource_group,
            resource_id::LOAD_BALANCERS,
            &self.name,
        )
    }

    fn parameters(&self, existing: Option<&Resource>) -> Result<Option<Resource>> {
        let existing = downcast::<LoadBalancer>(existing)?;
        let desired = self.desired()?;
        let Some(existing) = existing else {
            return Ok(Some(desired.into()));
        };

        let (frontends, frontends_changed) =
            merge_by_name(&existing.frontend_ip_configurations, &desired.frontend_ip_configurations);
        let (pools, pools_changed) =
            merge_by_name(&existing.backend_address_pools, &desired.backend_address_pools);
        let (rules, rules_changed) =
            merge_by_name(&existing.load_balancing_rules, &desired.load_balancing_rules);
        let (probes, probes_changed) = merge_by_name(&existing.probes, &desired.probes);
        let (outbound, outbound_changed) =
            merge_by_name(&existing.outbound_rules, &desired.outbound_rules);

        if !(frontends_changed || pools_changed || rules_changed || probes_changed || outbound_changed) {
            return Ok(None);
        }

        // Start from the live resource so unknown fields and the etag survive.
        let mut updated = existing.clone();
        updated.frontend_ip_configurations = frontends;
        updated.backend_address_pools = pools;
        updated.load_balancing_rules = rules;
        updated.probes = probes;
        updated.outbound_rules = outbound;
        Ok(Some(updated.into()))
    }
}
