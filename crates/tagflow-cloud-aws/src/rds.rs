//! RDS operations: subnet groups and DB instances

use crate::cloud::AwsCloud;
use crate::error::{DB_INSTANCE_NOT_FOUND, DB_SUBNET_GROUP_NOT_FOUND, sdk_error};
use aws_sdk_rds::error::ProvideErrorMetadata;
use aws_sdk_rds::operation::create_db_instance::builders::CreateDBInstanceFluentBuilder;
use aws_sdk_rds::types::Tag;
use tagflow_cloud::{CloudError, DbInstanceRequest, DbSubnetGroupRequest, ParamValue, Result};

fn tags(pairs: &[(String, String)]) -> Vec<Tag> {
    pairs
        .iter()
        .map(|(k, v)| Tag::builder().key(k).value(v).build())
        .collect()
}

fn invalid(param: &str, value: &ParamValue) -> CloudError {
    CloudError::Config(format!("{param}: unsupported value '{}'", value.as_text()))
}

fn int_param(param: &str, value: &ParamValue) -> Result<i32> {
    value
        .as_int()
        .and_then(|i| i32::try_from(i).ok())
        .ok_or_else(|| invalid(param, value))
}

fn bool_param(param: &str, value: &ParamValue) -> Result<bool> {
    value.as_bool().ok_or_else(|| invalid(param, value))
}

/// Apply one optional provider parameter to a create call
fn apply_option(
    builder: CreateDBInstanceFluentBuilder,
    param: &str,
    value: &ParamValue,
) -> Result<CreateDBInstanceFluentBuilder> {
    let builder = match param {
        "PreferredMaintenanceWindow" => builder.preferred_maintenance_window(value.as_text()),
        "BackupRetentionPeriod" => builder.backup_retention_period(int_param(param, value)?),
        "PreferredBackupWindow" => builder.preferred_backup_window(value.as_text()),
        "MultiAZ" => builder.multi_az(bool_param(param, value)?),
        "AutoMinorVersionUpgrade" => builder.auto_minor_version_upgrade(bool_param(param, value)?),
        "Iops" => builder.iops(int_param(param, value)?),
        "CharacterSetName" => builder.character_set_name(value.as_text()),
        "StorageType" => builder.storage_type(value.as_text()),
        other => {
            return Err(CloudError::Config(format!(
                "unknown DB instance parameter {other}"
            )));
        }
    };
    Ok(builder)
}

impl AwsCloud {
    pub(crate) async fn rds_db_subnet_group_exists(&self, name: &str) -> Result<bool> {
        match self
            .rds
            .describe_db_subnet_groups()
            .db_subnet_group_name(name)
            .send()
            .await
        {
            Ok(out) => Ok(!out.db_subnet_groups().is_empty()),
            Err(e) if e.code() == Some(DB_SUBNET_GROUP_NOT_FOUND) => Ok(false),
            Err(e) => Err(sdk_error("DescribeDBSubnetGroups", e)),
        }
    }

    pub(crate) async fn rds_create_db_subnet_group(
        &self,
        request: &DbSubnetGroupRequest,
    ) -> Result<()> {
        self.rds
            .create_db_subnet_group()
            .db_subnet_group_name(&request.name)
            .db_subnet_group_description(&request.description)
            .set_subnet_ids(Some(request.subnet_ids.clone()))
            .set_tags(Some(tags(&request.tags)))
            .send()
            .await
            .map_err(|e| sdk_error("CreateDBSubnetGroup", e))?;
        Ok(())
    }

    pub(crate) async fn rds_db_instance_exists(&self, identifier: &str) -> Result<bool> {
        match self
            .rds
            .describe_db_instances()
            .db_instance_identifier(identifier)
            .send()
            .await
        {
            Ok(out) => Ok(!out.db_instances().is_empty()),
            Err(e) if e.code() == Some(DB_INSTANCE_NOT_FOUND) => Ok(false),
            Err(e) => Err(sdk_error("DescribeDBInstances", e)),
        }
    }

    pub(crate) async fn rds_create_db_instance(&self, request: &DbInstanceRequest) -> Result<()> {
        let mut builder = self
            .rds
            .create_db_instance()
            .db_instance_identifier(&request.identifier)
            .allocated_storage(request.allocated_storage)
            .db_instance_class(&request.instance_class)
            .engine(&request.engine)
            .master_username(&request.master_username)
            .master_user_password(&request.master_password)
            .set_vpc_security_group_ids(Some(request.security_group_ids.clone()))
            .db_subnet_group_name(&request.subnet_group)
            .engine_version(&request.engine_version)
            .set_tags(Some(tags(&request.tags)));

        for (param, value) in &request.options {
            builder = apply_option(builder, param, value)?;
        }

        builder
            .send()
            .await
            .map_err(|e| sdk_error("CreateDBInstance", e))?;
        Ok(())
    }

    pub(crate) async fn rds_delete_db_instance(&self, identifier: &str) -> Result<()> {
        self.rds
            .delete_db_instance()
            .db_instance_identifier(identifier)
            .skip_final_snapshot(true)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteDBInstance", e))?;
        Ok(())
    }
}
