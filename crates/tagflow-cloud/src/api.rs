//! Cloud control-plane capability definition
//!
//! The reconciler never talks to a provider SDK directly. Everything it needs
//! from the provider account goes through [`CloudApi`], which keeps the engine
//! testable against an in-memory account and lets the AWS implementation live
//! in its own crate.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Resource kinds that can be looked up by their `Name` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Vpc,
    Subnet,
    RouteTable,
    SecurityGroup,
    Instance,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Vpc => write!(f, "vpc"),
            ResourceKind::Subnet => write!(f, "subnet"),
            ResourceKind::RouteTable => write!(f, "route table"),
            ResourceKind::SecurityGroup => write!(f, "security group"),
            ResourceKind::Instance => write!(f, "instance"),
        }
    }
}

/// Capability-typed facade over one provider profile (account + region)
///
/// Every method maps to a single control-plane round-trip. Lookups return
/// `None` when nothing matches; they never create anything.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Profile (account/region alias) this client is bound to
    fn profile(&self) -> &str;

    /// First resource of `kind` whose `Name` tag matches `name` (globs allowed)
    async fn find_by_name_tag(&self, kind: ResourceKind, name: &str) -> Result<Option<String>>;

    /// The VPC used when the document does not select one
    async fn default_vpc(&self) -> Result<Option<String>>;

    /// Full availability-zone names of the region, e.g. `eu-central-1a`
    async fn availability_zones(&self) -> Result<Vec<String>>;

    async fn create_subnet(&self, vpc_id: &str, cidr: &str, zone: &str) -> Result<String>;

    async fn create_route_table(&self, vpc_id: &str) -> Result<String>;

    /// Returns the association id
    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String>;

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target: &RouteTarget,
    ) -> Result<()>;

    async fn internet_gateway(&self, vpc_id: &str) -> Result<Option<String>>;

    /// VPN gateway attached to `vpc_id`, if any
    async fn attached_vpn_gateway(&self, vpc_id: &str) -> Result<Option<String>>;

    async fn enable_vgw_route_propagation(
        &self,
        route_table_id: &str,
        vpn_gateway_id: &str,
    ) -> Result<()>;

    /// Running instance whose `Name` tag matches `name` (globs allowed)
    async fn find_running_instance(&self, name: &str) -> Result<Option<String>>;

    /// Attach a single tag. Fails with `CloudError::NotVisible` while the
    /// provider has not materialized `resource_id` yet.
    async fn create_tag(&self, resource_id: &str, key: &str, value: &str) -> Result<()>;

    /// Attach several tags in one call
    async fn create_tags(&self, resource_id: &str, tags: &[(String, String)]) -> Result<()>;

    /// Images whose name matches `name_glob`, optionally restricted to an owner
    async fn list_images(&self, name_glob: &str, owner: Option<&str>) -> Result<Vec<ImageInfo>>;

    /// Launch exactly one instance and return its id
    async fn run_instance(&self, request: &RunInstanceRequest) -> Result<String>;

    async fn set_source_dest_check(&self, instance_id: &str, enabled: bool) -> Result<()>;

    /// Block devices currently attached to an instance
    async fn block_devices(&self, instance_id: &str) -> Result<Vec<BlockDevice>>;

    async fn create_security_group(&self, request: &SecurityGroupRequest) -> Result<String>;

    async fn db_subnet_group_exists(&self, name: &str) -> Result<bool>;

    async fn create_db_subnet_group(&self, request: &DbSubnetGroupRequest) -> Result<()>;

    async fn db_instance_exists(&self, identifier: &str) -> Result<bool>;

    async fn create_db_instance(&self, request: &DbInstanceRequest) -> Result<()>;

    /// Exact-name scan over existing load balancers
    async fn load_balancer_exists(&self, name: &str) -> Result<bool>;

    async fn create_load_balancer(&self, request: &LoadBalancerRequest) -> Result<()>;

    async fn register_instance(&self, load_balancer: &str, instance_id: &str) -> Result<()>;

    async fn list_instances(&self) -> Result<Vec<InstanceSummary>>;

    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()>;

    async fn delete_db_instance(&self, identifier: &str) -> Result<()>;
}

/// One authenticated client per profile, built once per run
#[async_trait]
pub trait CloudRegistry: Send + Sync {
    async fn client(&self, profile: &str) -> Result<Arc<dyn CloudApi>>;
}

/// Default route target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// NAT instance id
    Instance(String),
    /// Internet gateway id
    Gateway(String),
}

impl RouteTarget {
    pub fn id(&self) -> &str {
        match self {
            RouteTarget::Instance(id) | RouteTarget::Gateway(id) => id,
        }
    }
}

/// Machine image as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: String,
    pub name: String,
    /// ISO 8601 timestamp, so lexical order is chronological order
    pub creation_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDevice {
    pub device_name: String,
    pub volume_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDeviceSpec {
    pub device_name: String,
    pub size_gib: i32,
    pub delete_on_termination: bool,
}

/// Parameters of a single-unit instance launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInstanceRequest {
    pub image_id: String,
    pub instance_type: String,
    pub key_name: String,
    pub subnet_id: String,
    pub security_group_ids: Vec<String>,
    pub private_ip: String,
    pub associate_public_ip: bool,
    /// Rendered user-data, not yet encoded
    pub user_data: String,
    pub block_devices: Vec<BlockDeviceSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub cidr: String,
    pub port: i32,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupRequest {
    pub vpc_id: String,
    pub group_name: String,
    pub name_tag: String,
    pub description: String,
    pub rules: Vec<IngressRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSubnetGroupRequest {
    pub name: String,
    pub description: String,
    pub subnet_ids: Vec<String>,
    pub tags: Vec<(String, String)>,
}

/// Provider parameter value forwarded from an optional database field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Text(s) => s.parse().ok(),
            ParamValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            ParamValue::Text(s) => s.parse().ok(),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInstanceRequest {
    pub identifier: String,
    pub allocated_storage: i32,
    pub instance_class: String,
    pub engine: String,
    pub master_username: String,
    pub master_password: String,
    pub security_group_ids: Vec<String>,
    pub subnet_group: String,
    pub engine_version: String,
    /// Optional provider parameters keyed by provider parameter name
    pub options: BTreeMap<String, ParamValue>,
    pub tags: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub protocol: String,
    pub load_balancer_port: i32,
    pub instance_protocol: String,
    pub instance_port: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerRequest {
    pub name: String,
    pub listeners: Vec<Listener>,
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
    pub scheme: Option<String>,
    pub tags: Vec<(String, String)>,
}

/// Instance listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSummary {
    pub id: String,
    pub name: Option<String>,
    pub instance_type: String,
    pub state: String,
}
