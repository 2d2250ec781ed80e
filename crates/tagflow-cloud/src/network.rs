//! Subnet, route table and default route provisioning

use crate::api::{ResourceKind, RouteTarget};
use crate::context::ProvisionContext;
use crate::error::{CloudError, Result};
use crate::model::{InstanceSpec, NetworkDescriptor, Shape};
use crate::report::ActionType;
use crate::tag_index::TagIndex;
use crate::wait::confirm_tag;

/// Destination of the default route
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// Egress topology of a freshly created route table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTopology {
    /// Default route through a NAT instance of the same customer
    Nat { instance_id: String },
    /// Default route through the Internet gateway, plus route propagation
    /// from the VPN gateway when one is attached to the VPC
    Gateway {
        gateway_id: String,
        vpn_gateway_id: Option<String>,
    },
}

impl RouteTopology {
    pub fn target(&self) -> RouteTarget {
        match self {
            RouteTopology::Nat { instance_id } => RouteTarget::Instance(instance_id.clone()),
            RouteTopology::Gateway { gateway_id, .. } => RouteTarget::Gateway(gateway_id.clone()),
        }
    }
}

/// Route table shared by all subnets of one customer and resource family
pub fn route_table_name(spec: &InstanceSpec) -> String {
    if spec.is_database() {
        format!("{}-rdsRT", spec.customer)
    } else {
        format!("{}-ec2RT", spec.customer)
    }
}

/// CIDR of the subnet an instance lives in
pub fn subnet_cidr(spec: &InstanceSpec, network: &NetworkDescriptor) -> Result<String> {
    match &spec.shape {
        Shape::Compute(compute) => Ok(compute.subnet_cidr()),
        Shape::Database(db) => {
            let key = format!("az{}", network.az_letter);
            db.subnets.get(&key).cloned().ok_or_else(|| {
                CloudError::Config(format!("{}: no subnet CIDR declared for {}", spec.name, key))
            })
        }
    }
}

pub struct NetworkProvisioner<'c, 'a> {
    ctx: &'c ProvisionContext<'a>,
}

impl<'c, 'a> NetworkProvisioner<'c, 'a> {
    pub fn new(ctx: &'c ProvisionContext<'a>) -> Self {
        Self { ctx }
    }

    /// Make sure the subnet of `network` exists, with its route table and
    /// default route. Returns the subnet id.
    pub async fn ensure_network(
        &self,
        spec: &InstanceSpec,
        network: &NetworkDescriptor,
    ) -> Result<String> {
        let api = self.ctx.api;
        let index = TagIndex::new(api);
        let subnet_name = network.subnet_name.as_str();

        if let Some(id) = index.find(ResourceKind::Subnet, subnet_name).await? {
            self.ctx.reuse("subnet", subnet_name, Some(&id));
            return Ok(id);
        }

        let zone = self.resolve_zone(network.az_letter).await?;
        let cidr = subnet_cidr(spec, network)?;

        let rt_name = route_table_name(spec);
        let existing_rt = index.find(ResourceKind::RouteTable, &rt_name).await?;

        // A new route table needs a default route, so settle the topology
        // before creating anything: declining the gateway must not leave a
        // half-built network behind.
        let topology = match existing_rt {
            Some(_) => None,
            None => Some(self.decide_topology(spec, subnet_name).await?),
        };

        let subnet_id = api.create_subnet(&self.ctx.vpc_id, &cidr, &zone).await?;
        confirm_tag(api, &self.ctx.settings.wait, &subnet_id, "Name", subnet_name).await?;
        tracing::info!(subnet = %subnet_id, name = %subnet_name, cidr = %cidr, zone = %zone, "Created subnet");
        self.ctx
            .record(ActionType::Created, "subnet", subnet_name, Some(&subnet_id));

        let rt_id = match existing_rt {
            Some(id) => {
                self.ctx.reuse("route table", &rt_name, Some(&id));
                id
            }
            None => {
                let id = api.create_route_table(&self.ctx.vpc_id).await?;
                confirm_tag(api, &self.ctx.settings.wait, &id, "Name", &rt_name).await?;
                tracing::info!(route_table = %id, name = %rt_name, "Created route table");
                self.ctx
                    .record(ActionType::Created, "route table", &rt_name, Some(&id));
                id
            }
        };

        let association = api.associate_route_table(&rt_id, &subnet_id).await?;
        tracing::info!(route_table = %rt_id, association = %association, "Associated route table");
        self.ctx.record(
            ActionType::Registered,
            "route table association",
            subnet_name,
            Some(&association),
        );

        if let Some(topology) = topology {
            if let RouteTopology::Gateway {
                vpn_gateway_id: Some(vgw),
                ..
            } = &topology
            {
                tracing::info!(route_table = %rt_id, vgw = %vgw, "Attaching route table to VPN gateway");
                api.enable_vgw_route_propagation(&rt_id, vgw).await?;
            }

            let target = topology.target();
            api.create_route(&rt_id, DEFAULT_ROUTE_CIDR, &target).await?;
            tracing::info!(route_table = %rt_id, target = %target.id(), "Created default route");
            self.ctx
                .record(ActionType::Created, "route", &rt_name, Some(target.id()));
        }

        Ok(subnet_id)
    }

    /// Full zone name whose trailing letter is `letter`
    pub async fn resolve_zone(&self, letter: char) -> Result<String> {
        let zones = self.ctx.api.availability_zones().await?;
        zones
            .into_iter()
            .find(|zone| zone.ends_with(letter))
            .ok_or_else(|| CloudError::Config(format!("{letter} does not match any AZ")))
    }

    /// NAT instance of the customer if one runs, otherwise the Internet
    /// gateway after operator confirmation
    pub async fn decide_topology(
        &self,
        spec: &InstanceSpec,
        subnet_name: &str,
    ) -> Result<RouteTopology> {
        let api = self.ctx.api;
        let nat_name = self.ctx.settings.nat_instance_name_for(&spec.customer);

        if let Some(instance_id) = api.find_running_instance(&nat_name).await? {
            tracing::info!(nat = %instance_id, customer = %spec.customer, "Routing through NAT instance");
            return Ok(RouteTopology::Nat { instance_id });
        }

        tracing::info!(customer = %spec.customer, "No NAT instance for customer");
        let prompt = format!("attach {subnet_name} to an Internet gateway? [y/N] ");
        if !self.ctx.confirm.confirm(&prompt) {
            return Err(CloudError::OperatorAbort(format!(
                "{subnet_name} not attached to the Internet gateway"
            )));
        }

        let gateway_id = api
            .internet_gateway(&self.ctx.vpc_id)
            .await?
            .ok_or_else(|| {
                CloudError::Config(format!("VPC {} has no Internet gateway", self.ctx.vpc_id))
            })?;
        let vpn_gateway_id = api.attached_vpn_gateway(&self.ctx.vpc_id).await?;

        Ok(RouteTopology::Gateway {
            gateway_id,
            vpn_gateway_id,
        })
    }
}
