//! Desired-state document model
//!
//! The document is kept as a raw YAML tree so that rewriting it after a
//! discovery never drops keys this crate does not know about. Typed views
//! ([`InstanceSpec`], [`AzGroup`]) are parsed from it on demand.
//!
//! ```yaml
//! frankfurt:
//! - vpc: infra-vpc
//! - web-aza:
//!   - type: t2.micro
//!     customer: foo
//!     name: foo-www-1
//!     image: debian-stretch-*
//!     key: mypemkey
//!     ipaddr: 10.1.1.2
//!     sg: [ssh-icmp-reply, http-https]
//!     userdata: [base.sh]
//! ```

use crate::error::{CloudError, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Key under which a discovered provider id is stored on an instance
pub const DISCOVERED_ID_KEY: &str = "awsid";

/// Key of a region entry that selects the VPC by Name tag
pub const VPC_KEY: &str = "vpc";

/// Instance types with this prefix are managed databases
pub const DATABASE_TYPE_PREFIX: &str = "db.";

/// Whole desired-state document
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    root: Value,
}

/// One step of a region walk, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub enum RegionStep {
    /// `{vpc: <name>}`: use this VPC for the following groups
    SelectVpc(String),
    Group(AzGroup),
}

/// Availability-zone group: a named list of instance declarations
#[derive(Debug, Clone, PartialEq)]
pub struct AzGroup {
    pub name: String,
    /// Position of the enclosing list item inside the region
    pub entry: usize,
    pub instances: Vec<Value>,
}

impl AzGroup {
    /// Group name without its trailing `-az<letter>` part
    pub fn network_prefix(&self) -> &str {
        network_prefix(&self.name)
    }
}

/// Network prefix shared by the AZ groups of one network (`web-aza` -> `web`)
pub fn network_prefix(group: &str) -> &str {
    group.rsplit_once('-').map(|(prefix, _)| prefix).unwrap_or(group)
}

impl DesiredState {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let root: Value = serde_yaml::from_str(content)?;
        match root {
            Value::Mapping(_) => Ok(Self { root }),
            Value::Null => Ok(Self {
                root: Value::Mapping(Mapping::new()),
            }),
            _ => Err(CloudError::Config(
                "desired state must be a mapping of region to entries".to_string(),
            )),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    /// Region (profile) names in declaration order
    pub fn regions(&self) -> Vec<String> {
        self.root
            .as_mapping()
            .map(|m| {
                m.keys()
                    .filter_map(|k| k.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Walk plan for one region
    pub fn region_steps(&self, region: &str) -> Result<Vec<RegionStep>> {
        let entries = match self.root.get(region) {
            Some(Value::Sequence(entries)) => entries,
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(_) => {
                return Err(CloudError::Config(format!(
                    "region {region} must hold a list of entries"
                )));
            }
        };

        let mut steps = Vec::new();
        for (entry, item) in entries.iter().enumerate() {
            let Value::Mapping(map) = item else {
                return Err(CloudError::Config(format!(
                    "entry #{entry} of region {region} is not a mapping"
                )));
            };

            if let Some(vpc) = map.get(VPC_KEY) {
                let name = vpc.as_str().ok_or_else(|| {
                    CloudError::Config(format!("vpc entry of region {region} must be a name"))
                })?;
                steps.push(RegionStep::SelectVpc(name.to_string()));
                continue;
            }

            for (key, value) in map {
                let name = key.as_str().ok_or_else(|| {
                    CloudError::Config(format!("AZ group names in {region} must be strings"))
                })?;
                let instances = match value {
                    Value::Sequence(seq) => seq.clone(),
                    Value::Null => Vec::new(),
                    _ => {
                        return Err(CloudError::Config(format!(
                            "AZ group {name} must hold a list of instances"
                        )));
                    }
                };
                steps.push(RegionStep::Group(AzGroup {
                    name: name.to_string(),
                    entry,
                    instances,
                }));
            }
        }
        Ok(steps)
    }

    /// All AZ groups of a region, ignoring VPC selections
    pub fn groups(&self, region: &str) -> Result<Vec<AzGroup>> {
        Ok(self
            .region_steps(region)?
            .into_iter()
            .filter_map(|step| match step {
                RegionStep::Group(group) => Some(group),
                RegionStep::SelectVpc(_) => None,
            })
            .collect())
    }

    /// Record a discovered provider id on an instance declaration
    pub fn set_discovered_id(
        &mut self,
        region: &str,
        group: &AzGroup,
        index: usize,
        id: &str,
    ) -> Result<()> {
        let instance = self
            .root
            .get_mut(region)
            .and_then(|r| r.get_mut(group.entry))
            .and_then(|e| e.get_mut(group.name.as_str()))
            .and_then(|g| g.get_mut(index))
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| {
                CloudError::StateError(format!(
                    "instance #{index} of {region}/{} not found in document",
                    group.name
                ))
            })?;
        instance.insert(
            Value::String(DISCOVERED_ID_KEY.to_string()),
            Value::String(id.to_string()),
        );
        Ok(())
    }

    /// Parse every instance declaration and collect the failures
    pub fn validate(&self) -> Vec<(String, CloudError)> {
        let mut problems = Vec::new();
        for region in self.regions() {
            let groups = match self.groups(&region) {
                Ok(groups) => groups,
                Err(e) => {
                    problems.push((region.clone(), e));
                    continue;
                }
            };
            for group in groups {
                for (index, value) in group.instances.iter().enumerate() {
                    if let Err(e) = InstanceSpec::from_value(value) {
                        problems.push((format!("{region}/{}#{index}", group.name), e));
                    }
                }
            }
        }
        problems
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

/// Security group reference: a Name tag, or an inline declaration to ensure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecurityGroupRef {
    Named(String),
    Inline(SecurityGroupDecl),
}

/// Inline security group with one ingress rule per CIDR
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecurityGroupDecl {
    pub name: String,
    pub tag: String,
    #[serde(default)]
    pub cidr: Vec<String>,
    pub port: i32,
    #[serde(default = "default_protocol")]
    pub proto: String,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

/// Load balancer sub-declaration of a compute instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoadBalancerSpec {
    pub scheme: Option<String>,
    pub elb_proto: Option<String>,
    pub elb_port: Option<i32>,
    pub instance_proto: Option<String>,
    pub instance_port: Option<i32>,
    #[serde(default)]
    pub sg: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawInstance {
    #[serde(rename = "type")]
    instance_type: Option<String>,
    customer: Option<String>,
    name: Option<String>,
    image: Option<String>,
    key: Option<String>,
    ipaddr: Option<String>,
    #[serde(default)]
    sg: Vec<SecurityGroupRef>,
    #[serde(default)]
    userdata: Vec<String>,
    data: Option<i32>,
    srcdstchk: Option<bool>,
    pubip: Option<bool>,
    elb: Option<LoadBalancerSpec>,
    awsid: Option<String>,
    dbengine: Option<String>,
    dbversion: Option<String>,
    dbroot: Option<String>,
    subnets: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// One declared resource
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSpec {
    pub instance_type: String,
    pub customer: String,
    pub name: String,
    pub discovered_id: Option<String>,
    pub source_dest_check: Option<bool>,
    pub public_ip: bool,
    pub load_balancer: Option<LoadBalancerSpec>,
    pub shape: Shape,
    /// Keys not modelled above (database options, custom tag fields)
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Compute(ComputeShape),
    Database(DatabaseShape),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeShape {
    /// Image name glob
    pub image: String,
    pub key: String,
    pub private_ip: Ipv4Addr,
    pub security_groups: Vec<String>,
    pub userdata: Vec<String>,
    pub extra_disk_gib: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseShape {
    pub engine: String,
    pub version: String,
    pub root_user: String,
    pub storage_gib: i32,
    /// `az<letter>` -> CIDR
    pub subnets: BTreeMap<String, String>,
    pub security_groups: Vec<SecurityGroupRef>,
}

fn required<T>(value: Option<T>, field: &str, name: &str) -> Result<T> {
    value.ok_or_else(|| CloudError::Config(format!("{name}: missing required field '{field}'")))
}

impl InstanceSpec {
    pub fn from_value(value: &Value) -> Result<Self> {
        let raw: RawInstance = serde_yaml::from_value(value.clone())?;
        let name = required(raw.name, "name", "instance")?;
        let instance_type = required(raw.instance_type, "type", &name)?;
        let customer = required(raw.customer, "customer", &name)?;

        let shape = if instance_type.starts_with(DATABASE_TYPE_PREFIX) {
            Shape::Database(DatabaseShape {
                engine: required(raw.dbengine, "dbengine", &name)?,
                version: required(raw.dbversion, "dbversion", &name)?,
                root_user: required(raw.dbroot, "dbroot", &name)?,
                storage_gib: required(raw.data, "data", &name)?,
                subnets: required(raw.subnets, "subnets", &name)?,
                security_groups: raw.sg,
            })
        } else {
            let ipaddr = required(raw.ipaddr, "ipaddr", &name)?;
            let private_ip: Ipv4Addr = ipaddr.parse().map_err(|_| {
                CloudError::Config(format!("{name}: '{ipaddr}' is not an IPv4 address"))
            })?;
            let security_groups = raw
                .sg
                .into_iter()
                .map(|sg| match sg {
                    SecurityGroupRef::Named(n) => Ok(n),
                    SecurityGroupRef::Inline(d) => Err(CloudError::Config(format!(
                        "{name}: inline security group '{}' is only supported for databases",
                        d.name
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            Shape::Compute(ComputeShape {
                image: required(raw.image, "image", &name)?,
                key: required(raw.key, "key", &name)?,
                private_ip,
                security_groups,
                userdata: raw.userdata,
                extra_disk_gib: raw.data,
            })
        };

        Ok(Self {
            instance_type,
            customer,
            name,
            discovered_id: raw.awsid,
            source_dest_check: raw.srcdstchk,
            public_ip: raw.pubip.unwrap_or(false),
            load_balancer: raw.elb,
            shape,
            extra: raw.extra,
        })
    }

    pub fn is_database(&self) -> bool {
        matches!(self.shape, Shape::Database(_))
    }

    /// Value of a top-level field rendered as a tag value
    pub fn field_as_tag(&self, field: &str) -> Option<String> {
        match field {
            "name" => Some(self.name.clone()),
            "customer" => Some(self.customer.clone()),
            "type" => Some(self.instance_type.clone()),
            other => self.extra.get(other).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            }),
        }
    }
}

impl ComputeShape {
    /// `/24` subnet holding the private IP: `10.1.1.2` -> `10.1.1.0/24`
    pub fn subnet_cidr(&self) -> String {
        let [a, b, c, _] = self.private_ip.octets();
        format!("{a}.{b}.{c}.0/24")
    }

    /// `/16` network block of the private IP: `10.1.1.2` -> `10.1.0.0/16`
    pub fn network_block(&self) -> String {
        let [a, b, _, _] = self.private_ip.octets();
        format!("{a}.{b}.0.0/16")
    }
}

/// AZ letter plus subnet Name tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDescriptor {
    pub az_letter: char,
    pub subnet_name: String,
}

impl NetworkDescriptor {
    /// Compute groups are named after their subnet and end with the AZ letter
    pub fn for_compute(group: &str) -> Result<Self> {
        let az_letter = trailing_letter(group)?;
        Ok(Self {
            az_letter,
            subnet_name: group.to_string(),
        })
    }

    /// Database subnets are `<group>-<subnet key>`, the key ending with the AZ letter
    pub fn for_database(group: &str, subnet_key: &str) -> Result<Self> {
        let az_letter = trailing_letter(subnet_key)?;
        Ok(Self {
            az_letter,
            subnet_name: format!("{group}-{subnet_key}"),
        })
    }
}

fn trailing_letter(name: &str) -> Result<char> {
    name.chars()
        .last()
        .filter(char::is_ascii_alphabetic)
        .ok_or_else(|| CloudError::Config(format!("'{name}' does not end with an AZ letter")))
}
