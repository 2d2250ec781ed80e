//! `CloudApi` backed by the AWS SDK

use crate::context::AwsContext;
use async_trait::async_trait;
use tagflow_cloud::{
    BlockDevice, CloudApi, DbInstanceRequest, DbSubnetGroupRequest, ImageInfo, InstanceSummary,
    LoadBalancerRequest, ResourceKind, Result, RouteTarget, RunInstanceRequest,
    SecurityGroupRequest,
};

/// One profile's EC2, RDS and ELB clients
#[derive(Clone, Debug)]
pub struct AwsCloud {
    profile: String,
    pub(crate) ec2: aws_sdk_ec2::Client,
    pub(crate) rds: aws_sdk_rds::Client,
    pub(crate) elb: aws_sdk_elasticloadbalancing::Client,
}

impl AwsCloud {
    pub fn from_context(context: &AwsContext) -> Self {
        Self {
            profile: context.profile().to_string(),
            ec2: context.ec2_client(),
            rds: context.rds_client(),
            elb: context.elb_client(),
        }
    }
}

#[async_trait]
impl CloudApi for AwsCloud {
    fn profile(&self) -> &str {
        &self.profile
    }

    async fn find_by_name_tag(&self, kind: ResourceKind, name: &str) -> Result<Option<String>> {
        self.ec2_find_by_name_tag(kind, name).await
    }

    async fn default_vpc(&self) -> Result<Option<String>> {
        self.ec2_default_vpc().await
    }

    async fn availability_zones(&self) -> Result<Vec<String>> {
        self.ec2_availability_zones().await
    }

    async fn create_subnet(&self, vpc_id: &str, cidr: &str, zone: &str) -> Result<String> {
        self.ec2_create_subnet(vpc_id, cidr, zone).await
    }

    async fn create_route_table(&self, vpc_id: &str) -> Result<String> {
        self.ec2_create_route_table(vpc_id).await
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String> {
        self.ec2_associate_route_table(route_table_id, subnet_id)
            .await
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target: &RouteTarget,
    ) -> Result<()> {
        self.ec2_create_route(route_table_id, destination_cidr, target)
            .await
    }

    async fn internet_gateway(&self, vpc_id: &str) -> Result<Option<String>> {
        self.ec2_internet_gateway(vpc_id).await
    }

    async fn attached_vpn_gateway(&self, vpc_id: &str) -> Result<Option<String>> {
        self.ec2_attached_vpn_gateway(vpc_id).await
    }

    async fn enable_vgw_route_propagation(
        &self,
        route_table_id: &str,
        vpn_gateway_id: &str,
    ) -> Result<()> {
        self.ec2_enable_vgw_route_propagation(route_table_id, vpn_gateway_id)
            .await
    }

    async fn find_running_instance(&self, name: &str) -> Result<Option<String>> {
        self.ec2_find_running_instance(name).await
    }

    async fn create_tag(&self, resource_id: &str, key: &str, value: &str) -> Result<()> {
        self.ec2_create_tags(resource_id, &[(key.to_string(), value.to_string())])
            .await
    }

    async fn create_tags(&self, resource_id: &str, tags: &[(String, String)]) -> Result<()> {
        self.ec2_create_tags(resource_id, tags).await
    }

    async fn list_images(&self, name_glob: &str, owner: Option<&str>) -> Result<Vec<ImageInfo>> {
        self.ec2_list_images(name_glob, owner).await
    }

    async fn run_instance(&self, request: &RunInstanceRequest) -> Result<String> {
        self.ec2_run_instance(request).await
    }

    async fn set_source_dest_check(&self, instance_id: &str, enabled: bool) -> Result<()> {
        self.ec2_set_source_dest_check(instance_id, enabled).await
    }

    async fn block_devices(&self, instance_id: &str) -> Result<Vec<BlockDevice>> {
        self.ec2_block_devices(instance_id).await
    }

    async fn create_security_group(&self, request: &SecurityGroupRequest) -> Result<String> {
        self.ec2_create_security_group(request).await
    }

    async fn db_subnet_group_exists(&self, name: &str) -> Result<bool> {
        self.rds_db_subnet_group_exists(name).await
    }

    async fn create_db_subnet_group(&self, request: &DbSubnetGroupRequest) -> Result<()> {
        self.rds_create_db_subnet_group(request).await
    }

    async fn db_instance_exists(&self, identifier: &str) -> Result<bool> {
        self.rds_db_instance_exists(identifier).await
    }

    async fn create_db_instance(&self, request: &DbInstanceRequest) -> Result<()> {
        self.rds_create_db_instance(request).await
    }

    async fn load_balancer_exists(&self, name: &str) -> Result<bool> {
        self.elb_load_balancer_exists(name).await
    }

    async fn create_load_balancer(&self, request: &LoadBalancerRequest) -> Result<()> {
        self.elb_create_load_balancer(request).await
    }

    async fn register_instance(&self, load_balancer: &str, instance_id: &str) -> Result<()> {
        self.elb_register_instance(load_balancer, instance_id).await
    }

    async fn list_instances(&self) -> Result<Vec<InstanceSummary>> {
        self.ec2_list_instances().await
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()> {
        self.ec2_terminate_instances(instance_ids).await
    }

    async fn delete_db_instance(&self, identifier: &str) -> Result<()> {
        self.rds_delete_db_instance(identifier).await
    }
}
