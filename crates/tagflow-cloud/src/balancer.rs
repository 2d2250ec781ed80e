//! Load balancer get-or-create and instance registration

use crate::api::{Listener, LoadBalancerRequest, ResourceKind};
use crate::context::ProvisionContext;
use crate::error::Result;
use crate::model::{AzGroup, InstanceSpec, LoadBalancerSpec, NetworkDescriptor};
use crate::network::NetworkProvisioner;
use crate::report::ActionType;
use crate::tag_index::TagIndex;

const DEFAULT_PROTOCOL: &str = "tcp";
const DEFAULT_PORT: i32 = 80;

/// Balancer serving the family of `instance_name`: `foo-www-1` -> `elb-foo-www`
pub fn load_balancer_name(instance_name: &str) -> String {
    let family = instance_name
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .trim_end_matches('-');
    format!("elb-{family}")
}

/// Listener of a declaration. Each of the four fields defaults to tcp/80 on
/// its own.
pub fn listener(spec: &LoadBalancerSpec) -> Listener {
    let or_default = |proto: &Option<String>| {
        proto
            .clone()
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string())
    };
    Listener {
        protocol: or_default(&spec.elb_proto),
        load_balancer_port: spec.elb_port.unwrap_or(DEFAULT_PORT),
        instance_protocol: or_default(&spec.instance_proto),
        instance_port: spec.instance_port.unwrap_or(DEFAULT_PORT),
    }
}

pub struct LoadBalancerBinder<'c, 'a> {
    ctx: &'c ProvisionContext<'a>,
}

impl<'c, 'a> LoadBalancerBinder<'c, 'a> {
    pub fn new(ctx: &'c ProvisionContext<'a>) -> Self {
        Self { ctx }
    }

    /// Make sure the family balancer exists, then register `instance_id` with it
    pub async fn ensure_and_register(
        &self,
        spec: &InstanceSpec,
        instance_id: &str,
        groups: &[AzGroup],
        current: &AzGroup,
    ) -> Result<()> {
        let Some(lb) = &spec.load_balancer else {
            return Ok(());
        };
        let api = self.ctx.api;
        let name = load_balancer_name(&spec.name);

        if api.load_balancer_exists(&name).await? {
            self.ctx.reuse("load balancer", &name, None);
        } else {
            let subnet_ids = self.ensure_family_subnets(groups, current).await?;
            let security_group_ids = TagIndex::new(api)
                .require_all(ResourceKind::SecurityGroup, &lb.sg)
                .await?;

            let request = LoadBalancerRequest {
                name: name.clone(),
                listeners: vec![listener(lb)],
                subnet_ids,
                security_group_ids,
                scheme: lb.scheme.clone(),
                tags: vec![
                    ("Name".to_string(), name.clone()),
                    ("Customer".to_string(), spec.customer.clone()),
                ],
            };
            api.create_load_balancer(&request).await?;
            tracing::info!(name = %name, subnets = request.subnet_ids.len(), "Created load balancer");
            self.ctx.record(ActionType::Created, "load balancer", &name, None);
        }

        api.register_instance(&name, instance_id).await?;
        tracing::info!(name = %name, instance = %instance_id, "Registered instance with load balancer");
        self.ctx
            .record(ActionType::Registered, "load balancer", &name, Some(instance_id));
        Ok(())
    }

    /// Subnet of every AZ group sharing the network prefix of `current`,
    /// each ensured with the first compute instance declared in it
    async fn ensure_family_subnets(
        &self,
        groups: &[AzGroup],
        current: &AzGroup,
    ) -> Result<Vec<String>> {
        let network = NetworkProvisioner::new(self.ctx);
        let prefix = current.network_prefix();
        let mut subnet_ids = Vec::new();

        for group in groups.iter().filter(|g| g.network_prefix() == prefix) {
            let Some(first) = group.instances.first() else {
                continue;
            };
            let member = InstanceSpec::from_value(first)?;
            if member.is_database() {
                continue;
            }
            let descriptor = NetworkDescriptor::for_compute(&group.name)?;
            subnet_ids.push(network.ensure_network(&member, &descriptor).await?);
        }
        Ok(subnet_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_balancer_name() {
        assert_eq!(load_balancer_name("foo-www-1"), "elb-foo-www");
        assert_eq!(load_balancer_name("foo-www-12"), "elb-foo-www");
        assert_eq!(load_balancer_name("foo-www"), "elb-foo-www");
    }

    #[test]
    fn test_listener_defaults() {
        let l = listener(&LoadBalancerSpec::default());
        assert_eq!(l.protocol, "tcp");
        assert_eq!(l.load_balancer_port, 80);
        assert_eq!(l.instance_protocol, "tcp");
        assert_eq!(l.instance_port, 80);
    }

    #[test]
    fn test_listener_overrides() {
        let spec = LoadBalancerSpec {
            elb_proto: Some("http".to_string()),
            elb_port: Some(8080),
            instance_proto: Some("http".to_string()),
            instance_port: Some(3000),
            ..Default::default()
        };
        let l = listener(&spec);
        assert_eq!(l.protocol, "http");
        assert_eq!(l.load_balancer_port, 8080);
        assert_eq!(l.instance_protocol, "http");
        assert_eq!(l.instance_port, 3000);
    }

    #[test]
    fn test_balancer_side_does_not_leak_to_instance_side() {
        let spec = LoadBalancerSpec {
            elb_proto: Some("http".to_string()),
            elb_port: Some(443),
            ..Default::default()
        };
        let l = listener(&spec);
        assert_eq!(l.protocol, "http");
        assert_eq!(l.load_balancer_port, 443);
        assert_eq!(l.instance_protocol, "tcp");
        assert_eq!(l.instance_port, 80);
    }
}
