//! Classic load balancer operations

use crate::cloud::AwsCloud;
use crate::error::sdk_error;
use aws_sdk_elasticloadbalancing::types::{Instance, Listener, Tag};
use tagflow_cloud::{CloudError, LoadBalancerRequest, Result};

fn build_error(operation: &str, error: impl std::fmt::Display) -> CloudError {
    CloudError::provider(operation, error.to_string())
}

fn listeners(request: &LoadBalancerRequest) -> Result<Vec<Listener>> {
    request
        .listeners
        .iter()
        .map(|l| {
            Listener::builder()
                .protocol(&l.protocol)
                .load_balancer_port(l.load_balancer_port)
                .instance_protocol(&l.instance_protocol)
                .instance_port(l.instance_port)
                .build()
                .map_err(|e| build_error("CreateLoadBalancer", e))
        })
        .collect()
}

fn tags(request: &LoadBalancerRequest) -> Result<Vec<Tag>> {
    request
        .tags
        .iter()
        .map(|(k, v)| {
            Tag::builder()
                .key(k)
                .value(v)
                .build()
                .map_err(|e| build_error("CreateLoadBalancer", e))
        })
        .collect()
}

impl AwsCloud {
    pub(crate) async fn elb_load_balancer_exists(&self, name: &str) -> Result<bool> {
        let mut marker: Option<String> = None;
        loop {
            let out = self
                .elb
                .describe_load_balancers()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| sdk_error("DescribeLoadBalancers", e))?;

            if out
                .load_balancer_descriptions()
                .iter()
                .any(|lb| lb.load_balancer_name() == Some(name))
            {
                return Ok(true);
            }

            match out.next_marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => return Ok(false),
            }
        }
    }

    pub(crate) async fn elb_create_load_balancer(
        &self,
        request: &LoadBalancerRequest,
    ) -> Result<()> {
        self.elb
            .create_load_balancer()
            .load_balancer_name(&request.name)
            .set_listeners(Some(listeners(request)?))
            .set_subnets(Some(request.subnet_ids.clone()))
            .set_security_groups(Some(request.security_group_ids.clone()))
            .set_scheme(request.scheme.clone())
            .set_tags(Some(tags(request)?))
            .send()
            .await
            .map_err(|e| sdk_error("CreateLoadBalancer", e))?;
        Ok(())
    }

    pub(crate) async fn elb_register_instance(
        &self,
        load_balancer: &str,
        instance_id: &str,
    ) -> Result<()> {
        self.elb
            .register_instances_with_load_balancer()
            .load_balancer_name(load_balancer)
            .instances(Instance::builder().instance_id(instance_id).build())
            .send()
            .await
            .map_err(|e| sdk_error("RegisterInstancesWithLoadBalancer", e))?;
        Ok(())
    }
}
