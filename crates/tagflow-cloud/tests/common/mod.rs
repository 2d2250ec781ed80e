use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tagflow_cloud::{
    BlockDevice, CloudApi, CloudError, CloudRegistry, DbInstanceRequest, DbSubnetGroupRequest,
    ImageInfo, InstanceSummary, LoadBalancerRequest, ResourceKind, Result, RouteTarget,
    RunInstanceRequest, SecurityGroupRequest,
};

/// In-memory provider account that records every mutating call
#[derive(Default)]
pub struct FakeState {
    pub zones: Vec<String>,
    pub default_vpc: Option<String>,
    pub internet_gateway: Option<String>,
    pub vpn_gateway: Option<String>,
    pub images: Vec<(ImageInfo, Option<String>)>,

    /// Every new resource rejects this many tag attempts before it is visible
    pub not_visible_attempts: u32,
    /// `block_devices` answers empty this many times per instance
    pub block_device_delay: u32,

    pub kinds: HashMap<String, ResourceKind>,
    pub tags: HashMap<String, Vec<(String, String)>>,
    pub pending_visibility: HashMap<String, u32>,
    pub block_device_polls: HashMap<String, u32>,
    pub terminated: HashSet<String>,

    pub db_subnet_groups: HashSet<String>,
    pub db_instances: HashSet<String>,
    pub load_balancers: HashSet<String>,

    pub calls: Vec<String>,
    pub routes: Vec<(String, String, RouteTarget)>,
    pub propagations: Vec<(String, String)>,
    pub run_requests: Vec<RunInstanceRequest>,
    pub db_requests: Vec<DbInstanceRequest>,
    pub lb_requests: Vec<LoadBalancerRequest>,
    pub sg_requests: Vec<SecurityGroupRequest>,
    pub registrations: Vec<(String, String)>,

    next_id: u32,
}

impl FakeState {
    fn new_id(&mut self, prefix: &str, kind: Option<ResourceKind>) -> String {
        self.next_id += 1;
        let id = format!("{prefix}-{:04}", self.next_id);
        if let Some(kind) = kind {
            self.kinds.insert(id.clone(), kind);
        }
        if self.not_visible_attempts > 0 {
            self.pending_visibility
                .insert(id.clone(), self.not_visible_attempts);
        }
        id
    }

    fn name_of(&self, id: &str) -> Option<&str> {
        self.tags
            .get(id)?
            .iter()
            .find(|(k, _)| k == "Name")
            .map(|(_, v)| v.as_str())
    }

    fn find(&self, kind: ResourceKind, pattern: &str) -> Option<String> {
        let pattern = glob::Pattern::new(pattern).ok();
        let mut ids: Vec<&String> = self
            .kinds
            .iter()
            .filter(|(id, k)| **k == kind && !self.terminated.contains(*id))
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids.into_iter()
            .find(|id| match (self.name_of(id), &pattern) {
                (Some(name), Some(p)) => p.matches(name),
                _ => false,
            })
            .cloned()
    }
}

pub struct FakeCloud {
    profile: String,
    pub state: Mutex<FakeState>,
}

#[allow(dead_code)]
impl FakeCloud {
    pub fn new(profile: &str) -> Self {
        let state = FakeState {
            zones: vec![
                "eu-central-1a".to_string(),
                "eu-central-1b".to_string(),
                "eu-central-1c".to_string(),
            ],
            default_vpc: Some("vpc-default".to_string()),
            internet_gateway: Some("igw-0001".to_string()),
            ..Default::default()
        };
        Self {
            profile: profile.to_string(),
            state: Mutex::new(state),
        }
    }

    /// Pre-existing resource carrying a Name tag
    pub fn seed(&self, kind: ResourceKind, id: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.kinds.insert(id.to_string(), kind);
        state
            .tags
            .insert(id.to_string(), vec![("Name".to_string(), name.to_string())]);
    }

    pub fn with_vpn_gateway(self, id: &str) -> Self {
        self.state.lock().unwrap().vpn_gateway = Some(id.to_string());
        self
    }

    pub fn with_not_visible_attempts(self, attempts: u32) -> Self {
        self.state.lock().unwrap().not_visible_attempts = attempts;
        self
    }

    pub fn with_block_device_delay(self, polls: u32) -> Self {
        self.state.lock().unwrap().block_device_delay = polls;
        self
    }

    pub fn with_image(self, id: &str, name: &str, created: &str, owner: Option<&str>) -> Self {
        self.state.lock().unwrap().images.push((
            ImageInfo {
                id: id.to_string(),
                name: name.to_string(),
                creation_date: created.to_string(),
            },
            owner.map(str::to_string),
        ));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of recorded mutating calls of one operation
    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }

    pub fn tags_of(&self, id: &str) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .tags
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    fn profile(&self) -> &str {
        &self.profile
    }

    async fn find_by_name_tag(&self, kind: ResourceKind, name: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().find(kind, name))
    }

    async fn default_vpc(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().default_vpc.clone())
    }

    async fn availability_zones(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().zones.clone())
    }

    async fn create_subnet(&self, vpc_id: &str, cidr: &str, zone: &str) -> Result<String> {
        self.record(format!("create_subnet {vpc_id} {cidr} {zone}"));
        Ok(self
            .state
            .lock()
            .unwrap()
            .new_id("subnet", Some(ResourceKind::Subnet)))
    }

    async fn create_route_table(&self, vpc_id: &str) -> Result<String> {
        self.record(format!("create_route_table {vpc_id}"));
        Ok(self
            .state
            .lock()
            .unwrap()
            .new_id("rtb", Some(ResourceKind::RouteTable)))
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String> {
        self.record(format!("associate_route_table {route_table_id} {subnet_id}"));
        Ok(self.state.lock().unwrap().new_id("rtbassoc", None))
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target: &RouteTarget,
    ) -> Result<()> {
        self.record(format!(
            "create_route {route_table_id} {destination_cidr} {}",
            target.id()
        ));
        self.state.lock().unwrap().routes.push((
            route_table_id.to_string(),
            destination_cidr.to_string(),
            target.clone(),
        ));
        Ok(())
    }

    async fn internet_gateway(&self, _vpc_id: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().internet_gateway.clone())
    }

    async fn attached_vpn_gateway(&self, _vpc_id: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().vpn_gateway.clone())
    }

    async fn enable_vgw_route_propagation(
        &self,
        route_table_id: &str,
        vpn_gateway_id: &str,
    ) -> Result<()> {
        self.record(format!(
            "enable_vgw_route_propagation {route_table_id} {vpn_gateway_id}"
        ));
        self.state
            .lock()
            .unwrap()
            .propagations
            .push((route_table_id.to_string(), vpn_gateway_id.to_string()));
        Ok(())
    }

    async fn find_running_instance(&self, name: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().find(ResourceKind::Instance, name))
    }

    async fn create_tag(&self, resource_id: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.pending_visibility.get_mut(resource_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CloudError::NotVisible(resource_id.to_string()));
            }
        }
        state.calls.push(format!("create_tag {resource_id} {key}={value}"));
        state
            .tags
            .entry(resource_id.to_string())
            .or_default()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    async fn create_tags(&self, resource_id: &str, tags: &[(String, String)]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_tags {resource_id}"));
        state
            .tags
            .entry(resource_id.to_string())
            .or_default()
            .extend(tags.iter().cloned());
        Ok(())
    }

    async fn list_images(&self, name_glob: &str, owner: Option<&str>) -> Result<Vec<ImageInfo>> {
        let pattern = glob::Pattern::new(name_glob)
            .map_err(|e| CloudError::provider("DescribeImages", e.to_string()))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .images
            .iter()
            .filter(|(image, image_owner)| {
                pattern.matches(&image.name)
                    && owner.is_none_or(|o| image_owner.as_deref() == Some(o))
            })
            .map(|(image, _)| image.clone())
            .collect())
    }

    async fn run_instance(&self, request: &RunInstanceRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("run_instance {}", request.private_ip));
        state.run_requests.push(request.clone());
        Ok(state.new_id("i", Some(ResourceKind::Instance)))
    }

    async fn set_source_dest_check(&self, instance_id: &str, enabled: bool) -> Result<()> {
        self.record(format!("set_source_dest_check {instance_id} {enabled}"));
        Ok(())
    }

    async fn block_devices(&self, instance_id: &str) -> Result<Vec<BlockDevice>> {
        let mut state = self.state.lock().unwrap();
        let delay = state.block_device_delay;
        let polls = state
            .block_device_polls
            .entry(instance_id.to_string())
            .or_insert(0);
        *polls += 1;
        if *polls <= delay {
            return Ok(Vec::new());
        }
        Ok(vec![
            BlockDevice {
                device_name: "/dev/xvda".to_string(),
                volume_id: format!("vol-root-{instance_id}"),
            },
            BlockDevice {
                device_name: "/dev/xvdb".to_string(),
                volume_id: format!("vol-data-{instance_id}"),
            },
        ])
    }

    async fn create_security_group(&self, request: &SecurityGroupRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("create_security_group {}", request.group_name));
        state.sg_requests.push(request.clone());
        let id = state.new_id("sg", Some(ResourceKind::SecurityGroup));
        state.pending_visibility.remove(&id);
        state
            .tags
            .insert(id.clone(), vec![("Name".to_string(), request.name_tag.clone())]);
        Ok(id)
    }

    async fn db_subnet_group_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().db_subnet_groups.contains(name))
    }

    async fn create_db_subnet_group(&self, request: &DbSubnetGroupRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("create_db_subnet_group {}", request.name));
        state.db_subnet_groups.insert(request.name.clone());
        Ok(())
    }

    async fn db_instance_exists(&self, identifier: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().db_instances.contains(identifier))
    }

    async fn create_db_instance(&self, request: &DbInstanceRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("create_db_instance {}", request.identifier));
        state.db_instances.insert(request.identifier.clone());
        state.db_requests.push(request.clone());
        Ok(())
    }

    async fn load_balancer_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().load_balancers.contains(name))
    }

    async fn create_load_balancer(&self, request: &LoadBalancerRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("create_load_balancer {}", request.name));
        state.load_balancers.insert(request.name.clone());
        state.lb_requests.push(request.clone());
        Ok(())
    }

    async fn register_instance(&self, load_balancer: &str, instance_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("register_instance {load_balancer} {instance_id}"));
        state
            .registrations
            .push((load_balancer.to_string(), instance_id.to_string()));
        Ok(())
    }

    async fn list_instances(&self) -> Result<Vec<InstanceSummary>> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<&String> = state
            .kinds
            .iter()
            .filter(|(_, k)| **k == ResourceKind::Instance)
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .map(|id| InstanceSummary {
                id: id.clone(),
                name: state.name_of(id).map(str::to_string),
                instance_type: "t2.micro".to_string(),
                state: if state.terminated.contains(id) {
                    "terminated".to_string()
                } else {
                    "running".to_string()
                },
            })
            .collect())
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("terminate_instances {}", instance_ids.join(",")));
        state.terminated.extend(instance_ids.iter().cloned());
        Ok(())
    }

    async fn delete_db_instance(&self, identifier: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete_db_instance {identifier}"));
        state.db_instances.remove(identifier);
        Ok(())
    }
}

/// Hands out the same fake account for every profile
#[allow(dead_code)]
pub struct FakeRegistry {
    pub cloud: Arc<FakeCloud>,
}

#[allow(dead_code)]
impl FakeRegistry {
    pub fn new(cloud: FakeCloud) -> Self {
        Self {
            cloud: Arc::new(cloud),
        }
    }
}

#[async_trait]
impl CloudRegistry for FakeRegistry {
    async fn client(&self, _profile: &str) -> Result<Arc<dyn CloudApi>> {
        Ok(self.cloud.clone())
    }
}
