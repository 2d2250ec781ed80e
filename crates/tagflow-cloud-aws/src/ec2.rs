//! EC2 operations: VPC networking, instances, images, tags

use crate::cloud::AwsCloud;
use crate::error::{missing, sdk_error};
use aws_sdk_ec2::types::{
    AttributeBooleanValue, BlockDeviceMapping, EbsBlockDevice, Filter,
    InstanceNetworkInterfaceSpecification, InstanceType, IpPermission, IpRange, ResourceType, Tag,
    TagSpecification,
};
use base64::Engine;
use tagflow_cloud::{
    BlockDevice, ImageInfo, InstanceSummary, ResourceKind, Result, RouteTarget,
    RunInstanceRequest, SecurityGroupRequest,
};
use tracing::debug;

const RUNNING: &str = "running";

fn name_filter(name: &str) -> Filter {
    Filter::builder().name("tag:Name").values(name).build()
}

fn vpc_attachment_filter(vpc_id: &str) -> Filter {
    Filter::builder()
        .name("attachment.vpc-id")
        .values(vpc_id)
        .build()
}

fn tag(key: &str, value: &str) -> Tag {
    Tag::builder().key(key).value(value).build()
}

fn name_tag_of(tags: &[Tag]) -> Option<String> {
    tags.iter()
        .find(|t| t.key() == Some("Name"))
        .and_then(|t| t.value())
        .map(str::to_string)
}

impl AwsCloud {
    pub(crate) async fn ec2_find_by_name_tag(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<String>> {
        let found = match kind {
            ResourceKind::Vpc => {
                let out = self
                    .ec2
                    .describe_vpcs()
                    .filters(name_filter(name))
                    .send()
                    .await
                    .map_err(|e| sdk_error("DescribeVpcs", e))?;
                out.vpcs()
                    .first()
                    .and_then(|v| v.vpc_id())
                    .map(str::to_string)
            }
            ResourceKind::Subnet => {
                let out = self
                    .ec2
                    .describe_subnets()
                    .filters(name_filter(name))
                    .send()
                    .await
                    .map_err(|e| sdk_error("DescribeSubnets", e))?;
                out.subnets()
                    .first()
                    .and_then(|s| s.subnet_id())
                    .map(str::to_string)
            }
            ResourceKind::RouteTable => {
                let out = self
                    .ec2
                    .describe_route_tables()
                    .filters(name_filter(name))
                    .send()
                    .await
                    .map_err(|e| sdk_error("DescribeRouteTables", e))?;
                out.route_tables()
                    .first()
                    .and_then(|r| r.route_table_id())
                    .map(str::to_string)
            }
            ResourceKind::SecurityGroup => {
                let out = self
                    .ec2
                    .describe_security_groups()
                    .filters(name_filter(name))
                    .send()
                    .await
                    .map_err(|e| sdk_error("DescribeSecurityGroups", e))?;
                out.security_groups()
                    .first()
                    .and_then(|g| g.group_id())
                    .map(str::to_string)
            }
            ResourceKind::Instance => self.first_instance(vec![name_filter(name)]).await?,
        };
        Ok(found)
    }

    async fn first_instance(&self, filters: Vec<Filter>) -> Result<Option<String>> {
        let out = self
            .ec2
            .describe_instances()
            .set_filters(Some(filters))
            .send()
            .await
            .map_err(|e| sdk_error("DescribeInstances", e))?;
        Ok(out
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .find_map(|i| i.instance_id())
            .map(str::to_string))
    }

    pub(crate) async fn ec2_default_vpc(&self) -> Result<Option<String>> {
        let out = self
            .ec2
            .describe_vpcs()
            .send()
            .await
            .map_err(|e| sdk_error("DescribeVpcs", e))?;
        Ok(out
            .vpcs()
            .first()
            .and_then(|v| v.vpc_id())
            .map(str::to_string))
    }

    pub(crate) async fn ec2_availability_zones(&self) -> Result<Vec<String>> {
        let out = self
            .ec2
            .describe_availability_zones()
            .send()
            .await
            .map_err(|e| sdk_error("DescribeAvailabilityZones", e))?;
        Ok(out
            .availability_zones()
            .iter()
            .filter_map(|z| z.zone_name())
            .map(str::to_string)
            .collect())
    }

    pub(crate) async fn ec2_create_subnet(
        &self,
        vpc_id: &str,
        cidr: &str,
        zone: &str,
    ) -> Result<String> {
        let out = self
            .ec2
            .create_subnet()
            .vpc_id(vpc_id)
            .cidr_block(cidr)
            .availability_zone(zone)
            .send()
            .await
            .map_err(|e| sdk_error("CreateSubnet", e))?;
        out.subnet()
            .and_then(|s| s.subnet_id())
            .map(str::to_string)
            .ok_or_else(|| missing("CreateSubnet", "subnet id"))
    }

    pub(crate) async fn ec2_create_route_table(&self, vpc_id: &str) -> Result<String> {
        let out = self
            .ec2
            .create_route_table()
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| sdk_error("CreateRouteTable", e))?;
        out.route_table()
            .and_then(|r| r.route_table_id())
            .map(str::to_string)
            .ok_or_else(|| missing("CreateRouteTable", "route table id"))
    }

    pub(crate) async fn ec2_associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String> {
        let out = self
            .ec2
            .associate_route_table()
            .route_table_id(route_table_id)
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(|e| sdk_error("AssociateRouteTable", e))?;
        out.association_id()
            .map(str::to_string)
            .ok_or_else(|| missing("AssociateRouteTable", "association id"))
    }

    pub(crate) async fn ec2_create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target: &RouteTarget,
    ) -> Result<()> {
        let request = self
            .ec2
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr);
        let request = match target {
            RouteTarget::Instance(id) => request.instance_id(id),
            RouteTarget::Gateway(id) => request.gateway_id(id),
        };
        request
            .send()
            .await
            .map_err(|e| sdk_error("CreateRoute", e))?;
        Ok(())
    }

    pub(crate) async fn ec2_internet_gateway(&self, vpc_id: &str) -> Result<Option<String>> {
        let out = self
            .ec2
            .describe_internet_gateways()
            .filters(vpc_attachment_filter(vpc_id))
            .send()
            .await
            .map_err(|e| sdk_error("DescribeInternetGateways", e))?;
        Ok(out
            .internet_gateways()
            .first()
            .and_then(|g| g.internet_gateway_id())
            .map(str::to_string))
    }

    pub(crate) async fn ec2_attached_vpn_gateway(&self, vpc_id: &str) -> Result<Option<String>> {
        let out = self
            .ec2
            .describe_vpn_gateways()
            .filters(vpc_attachment_filter(vpc_id))
            .filters(
                Filter::builder()
                    .name("attachment.state")
                    .values("attached")
                    .build(),
            )
            .send()
            .await
            .map_err(|e| sdk_error("DescribeVpnGateways", e))?;
        Ok(out
            .vpn_gateways()
            .first()
            .and_then(|g| g.vpn_gateway_id())
            .map(str::to_string))
    }

    pub(crate) async fn ec2_enable_vgw_route_propagation(
        &self,
        route_table_id: &str,
        vpn_gateway_id: &str,
    ) -> Result<()> {
        self.ec2
            .enable_vgw_route_propagation()
            .route_table_id(route_table_id)
            .gateway_id(vpn_gateway_id)
            .send()
            .await
            .map_err(|e| sdk_error("EnableVgwRoutePropagation", e))?;
        Ok(())
    }

    pub(crate) async fn ec2_find_running_instance(&self, name: &str) -> Result<Option<String>> {
        self.first_instance(vec![
            name_filter(name),
            Filter::builder()
                .name("instance-state-name")
                .values(RUNNING)
                .build(),
        ])
        .await
    }

    pub(crate) async fn ec2_create_tags(
        &self,
        resource_id: &str,
        tags: &[(String, String)],
    ) -> Result<()> {
        let tags = tags.iter().map(|(k, v)| tag(k, v)).collect();
        self.ec2
            .create_tags()
            .resources(resource_id)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| sdk_error("CreateTags", e))?;
        Ok(())
    }

    pub(crate) async fn ec2_list_images(
        &self,
        name_glob: &str,
        owner: Option<&str>,
    ) -> Result<Vec<ImageInfo>> {
        let mut request = self
            .ec2
            .describe_images()
            .filters(Filter::builder().name("name").values(name_glob).build())
            .filters(Filter::builder().name("state").values("available").build());
        if let Some(owner) = owner {
            request = request.owners(owner);
        }
        let out = request
            .send()
            .await
            .map_err(|e| sdk_error("DescribeImages", e))?;

        let images: Vec<ImageInfo> = out
            .images()
            .iter()
            .filter_map(|i| {
                Some(ImageInfo {
                    id: i.image_id()?.to_string(),
                    name: i.name().unwrap_or_default().to_string(),
                    creation_date: i.creation_date().unwrap_or_default().to_string(),
                })
            })
            .collect();
        debug!(glob = %name_glob, count = images.len(), "Listed images");
        Ok(images)
    }

    pub(crate) async fn ec2_run_instance(&self, request: &RunInstanceRequest) -> Result<String> {
        let user_data =
            base64::engine::general_purpose::STANDARD.encode(request.user_data.as_bytes());

        let interface = InstanceNetworkInterfaceSpecification::builder()
            .device_index(0)
            .subnet_id(&request.subnet_id)
            .set_groups(Some(request.security_group_ids.clone()))
            .private_ip_address(&request.private_ip)
            .associate_public_ip_address(request.associate_public_ip)
            .build();

        let block_devices = request
            .block_devices
            .iter()
            .map(|d| {
                BlockDeviceMapping::builder()
                    .device_name(&d.device_name)
                    .ebs(
                        EbsBlockDevice::builder()
                            .volume_size(d.size_gib)
                            .delete_on_termination(d.delete_on_termination)
                            .build(),
                    )
                    .build()
            })
            .collect::<Vec<_>>();

        let out = self
            .ec2
            .run_instances()
            .image_id(&request.image_id)
            .instance_type(InstanceType::from(request.instance_type.as_str()))
            .key_name(&request.key_name)
            .min_count(1)
            .max_count(1)
            .user_data(user_data)
            .network_interfaces(interface)
            .set_block_device_mappings((!block_devices.is_empty()).then_some(block_devices))
            .send()
            .await
            .map_err(|e| sdk_error("RunInstances", e))?;

        out.instances()
            .first()
            .and_then(|i| i.instance_id())
            .map(str::to_string)
            .ok_or_else(|| missing("RunInstances", "instance id"))
    }

    pub(crate) async fn ec2_set_source_dest_check(
        &self,
        instance_id: &str,
        enabled: bool,
    ) -> Result<()> {
        self.ec2
            .modify_instance_attribute()
            .instance_id(instance_id)
            .source_dest_check(AttributeBooleanValue::builder().value(enabled).build())
            .send()
            .await
            .map_err(|e| sdk_error("ModifyInstanceAttribute", e))?;
        Ok(())
    }

    pub(crate) async fn ec2_block_devices(&self, instance_id: &str) -> Result<Vec<BlockDevice>> {
        let out = self
            .ec2
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeInstances", e))?;
        Ok(out
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .flat_map(|i| i.block_device_mappings())
            .filter_map(|m| {
                Some(BlockDevice {
                    device_name: m.device_name()?.to_string(),
                    volume_id: m.ebs()?.volume_id()?.to_string(),
                })
            })
            .collect())
    }

    pub(crate) async fn ec2_create_security_group(
        &self,
        request: &SecurityGroupRequest,
    ) -> Result<String> {
        let out = self
            .ec2
            .create_security_group()
            .group_name(&request.group_name)
            .description(&request.description)
            .vpc_id(&request.vpc_id)
            .tag_specifications(
                TagSpecification::builder()
                    .resource_type(ResourceType::SecurityGroup)
                    .tags(tag("Name", &request.name_tag))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| sdk_error("CreateSecurityGroup", e))?;
        let group_id = out
            .group_id()
            .map(str::to_string)
            .ok_or_else(|| missing("CreateSecurityGroup", "group id"))?;

        if !request.rules.is_empty() {
            let permissions = request
                .rules
                .iter()
                .map(|rule| {
                    IpPermission::builder()
                        .ip_protocol(&rule.protocol)
                        .from_port(rule.port)
                        .to_port(rule.port)
                        .ip_ranges(IpRange::builder().cidr_ip(&rule.cidr).build())
                        .build()
                })
                .collect();
            self.ec2
                .authorize_security_group_ingress()
                .group_id(&group_id)
                .set_ip_permissions(Some(permissions))
                .send()
                .await
                .map_err(|e| sdk_error("AuthorizeSecurityGroupIngress", e))?;
        }
        Ok(group_id)
    }

    pub(crate) async fn ec2_list_instances(&self) -> Result<Vec<InstanceSummary>> {
        let out = self
            .ec2
            .describe_instances()
            .send()
            .await
            .map_err(|e| sdk_error("DescribeInstances", e))?;
        Ok(out
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .filter_map(|i| {
                Some(InstanceSummary {
                    id: i.instance_id()?.to_string(),
                    name: name_tag_of(i.tags()),
                    instance_type: i
                        .instance_type()
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_default(),
                    state: i
                        .state()
                        .and_then(|s| s.name())
                        .map(|n| n.as_str().to_string())
                        .unwrap_or_default(),
                })
            })
            .collect())
    }

    pub(crate) async fn ec2_terminate_instances(&self, instance_ids: &[String]) -> Result<()> {
        self.ec2
            .terminate_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(|e| sdk_error("TerminateInstances", e))?;
        Ok(())
    }
}
