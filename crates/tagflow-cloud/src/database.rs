//! Managed database creation
//!
//! Databases get their own per-AZ subnets, a subnet group and their security
//! groups before the instance itself is created. Unlike compute instances no
//! tag confirmation follows the create call: the provider takes the tags as
//! part of the request.
//!
//! The root password is generated for the create call only. It is neither
//! logged nor written back to the desired state; operators reset or fetch it
//! through the provider console.

use crate::api::{
    DbInstanceRequest, DbSubnetGroupRequest, IngressRule, ParamValue, ResourceKind,
    SecurityGroupRequest,
};
use crate::context::ProvisionContext;
use crate::error::{CloudError, Result};
use crate::model::{
    AzGroup, DatabaseShape, InstanceSpec, NetworkDescriptor, SecurityGroupRef, Shape,
};
use crate::network::NetworkProvisioner;
use crate::report::ActionType;
use crate::tag_index::TagIndex;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Declared option key -> provider parameter name. Only keys present on the
/// declaration are forwarded.
pub const OPTIONAL_FIELDS: &[(&str, &str)] = &[
    ("maintenance", "PreferredMaintenanceWindow"),
    ("retention", "BackupRetentionPeriod"),
    ("backup", "PreferredBackupWindow"),
    ("multiaz", "MultiAZ"),
    ("autoupgrade", "AutoMinorVersionUpgrade"),
    ("iops", "Iops"),
    ("charset", "CharacterSetName"),
    ("storage", "StorageType"),
];

/// Optional provider parameters found among the extra keys of a declaration
pub fn optional_params(
    name: &str,
    extra: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, ParamValue>> {
    let mut params = BTreeMap::new();
    for (key, param) in OPTIONAL_FIELDS {
        let Some(value) = extra.get(*key) else {
            continue;
        };
        let value = match value {
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Int(i),
                None => ParamValue::Text(n.to_string()),
            },
            Value::String(s) => ParamValue::Text(s.clone()),
            _ => {
                return Err(CloudError::Config(format!(
                    "{name}: option '{key}' must be a scalar"
                )));
            }
        };
        params.insert((*param).to_string(), value);
    }
    Ok(params)
}

/// Subnet group of an AZ group: `foo-rds` -> `foords`
pub fn subnet_group_name(group: &str) -> String {
    group.replace('-', "")
}

pub fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Required fields merged with the optional-field table
pub fn build_request(
    spec: &InstanceSpec,
    db: &DatabaseShape,
    master_password: String,
    security_group_ids: Vec<String>,
    subnet_group: &str,
) -> Result<DbInstanceRequest> {
    Ok(DbInstanceRequest {
        identifier: spec.name.clone(),
        allocated_storage: db.storage_gib,
        instance_class: spec.instance_type.clone(),
        engine: db.engine.clone(),
        master_username: db.root_user.clone(),
        master_password,
        security_group_ids,
        subnet_group: subnet_group.to_string(),
        engine_version: db.version.clone(),
        options: optional_params(&spec.name, &spec.extra)?,
        tags: vec![
            ("Name".to_string(), spec.name.clone()),
            ("Customer".to_string(), spec.customer.clone()),
        ],
    })
}

pub struct DatabaseProvisioner<'c, 'a> {
    ctx: &'c ProvisionContext<'a>,
}

impl<'c, 'a> DatabaseProvisioner<'c, 'a> {
    pub fn new(ctx: &'c ProvisionContext<'a>) -> Self {
        Self { ctx }
    }

    pub async fn create_database(&self, spec: &InstanceSpec, group: &AzGroup) -> Result<()> {
        let Shape::Database(db) = &spec.shape else {
            return Err(CloudError::Config(format!(
                "{} is a compute instance, not a database",
                spec.name
            )));
        };
        let api = self.ctx.api;

        let network = NetworkProvisioner::new(self.ctx);
        let mut subnet_ids = Vec::with_capacity(db.subnets.len());
        for key in db.subnets.keys() {
            let descriptor = NetworkDescriptor::for_database(&group.name, key)?;
            subnet_ids.push(network.ensure_network(spec, &descriptor).await?);
        }

        let subnet_group = subnet_group_name(&group.name);
        if api.db_subnet_group_exists(&subnet_group).await? {
            self.ctx.reuse("db subnet group", &subnet_group, None);
        } else {
            let request = DbSubnetGroupRequest {
                name: subnet_group.clone(),
                description: format!("{} subnet group", group.name),
                subnet_ids,
                tags: vec![("Customer".to_string(), spec.customer.clone())],
            };
            api.create_db_subnet_group(&request).await?;
            tracing::info!(name = %subnet_group, "Created DB subnet group");
            self.ctx
                .record(ActionType::Created, "db subnet group", &subnet_group, None);
        }

        let mut security_group_ids = Vec::with_capacity(db.security_groups.len());
        for sg in &db.security_groups {
            security_group_ids.push(self.ensure_security_group(sg).await?);
        }

        if api.db_instance_exists(&spec.name).await? {
            self.ctx.reuse("db instance", &spec.name, None);
            return Ok(());
        }

        let password = generate_password(self.ctx.settings.db_password_length);
        let request = build_request(spec, db, password, security_group_ids, &subnet_group)?;
        api.create_db_instance(&request).await?;
        tracing::info!(
            name = %spec.name,
            engine = %db.engine,
            options = request.options.len(),
            "Created DB instance"
        );
        self.ctx.record(ActionType::Created, "db instance", &spec.name, None);
        Ok(())
    }

    /// Id of a named security group, or of an inline one created on first use
    async fn ensure_security_group(&self, sg: &SecurityGroupRef) -> Result<String> {
        let index = TagIndex::new(self.ctx.api);
        let decl = match sg {
            SecurityGroupRef::Named(name) => {
                return index.require(ResourceKind::SecurityGroup, name).await;
            }
            SecurityGroupRef::Inline(decl) => decl,
        };

        if let Some(id) = index.find(ResourceKind::SecurityGroup, &decl.tag).await? {
            self.ctx.reuse("security group", &decl.tag, Some(&id));
            return Ok(id);
        }

        let request = SecurityGroupRequest {
            vpc_id: self.ctx.vpc_id.clone(),
            group_name: decl.name.clone(),
            name_tag: decl.tag.clone(),
            description: decl.name.clone(),
            rules: decl
                .cidr
                .iter()
                .map(|cidr| IngressRule {
                    cidr: cidr.clone(),
                    port: decl.port,
                    protocol: decl.proto.clone(),
                })
                .collect(),
        };
        let id = self.ctx.api.create_security_group(&request).await?;
        tracing::info!(group = %id, name = %decl.tag, rules = request.rules.len(), "Created security group");
        self.ctx
            .record(ActionType::Created, "security group", &decl.tag, Some(&id));
        Ok(id)
    }
}
