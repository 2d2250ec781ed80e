//! Compute instance creation and post-creation steps

use crate::api::{BlockDeviceSpec, ImageInfo, ResourceKind, RunInstanceRequest};
use crate::balancer::LoadBalancerBinder;
use crate::context::ProvisionContext;
use crate::error::{CloudError, Result};
use crate::model::{AzGroup, ComputeShape, InstanceSpec, Shape};
use crate::report::ActionType;
use crate::tag_index::TagIndex;
use crate::wait::{confirm_tag, poll_until, title_case};

/// Device name of the extra data volume
pub const DATA_DEVICE: &str = "/dev/xvdb";

/// Image globs containing this marker go through the fixed-distribution path
const DEBIAN_MARKER: &str = "debian";

/// Image with the latest creation date
pub fn select_latest(images: Vec<ImageInfo>) -> Option<ImageInfo> {
    images
        .into_iter()
        .max_by(|a, b| a.creation_date.cmp(&b.creation_date))
}

/// Block-device mapping, only when an extra disk is declared
pub fn block_device_mapping(compute: &ComputeShape) -> Vec<BlockDeviceSpec> {
    compute
        .extra_disk_gib
        .map(|size_gib| BlockDeviceSpec {
            device_name: DATA_DEVICE.to_string(),
            size_gib,
            delete_on_termination: true,
        })
        .into_iter()
        .collect()
}

/// `/dev/xvdb` of `foo-www-1` -> `xvdb_foo-www-1`
pub fn volume_name(device_name: &str, instance_name: &str) -> String {
    let device = device_name.strip_prefix("/dev/").unwrap_or(device_name);
    format!("{device}_{instance_name}")
}

fn compute_shape(spec: &InstanceSpec) -> Result<&ComputeShape> {
    match &spec.shape {
        Shape::Compute(compute) => Ok(compute),
        Shape::Database(_) => Err(CloudError::Config(format!(
            "{} is a database, not a compute instance",
            spec.name
        ))),
    }
}

pub struct ComputeProvisioner<'c, 'a> {
    ctx: &'c ProvisionContext<'a>,
}

impl<'c, 'a> ComputeProvisioner<'c, 'a> {
    pub fn new(ctx: &'c ProvisionContext<'a>) -> Self {
        Self { ctx }
    }

    /// Latest image matching `glob`
    pub async fn resolve_image(&self, glob: &str) -> Result<String> {
        let owner = glob
            .to_lowercase()
            .contains(DEBIAN_MARKER)
            .then_some(self.ctx.settings.debian_image_owner.as_str());

        let images = self.ctx.api.list_images(glob, owner).await?;
        let image = select_latest(images)
            .ok_or_else(|| CloudError::Config(format!("no image matches '{glob}'")))?;
        tracing::info!(image = %image.id, name = %image.name, created = %image.creation_date, "Resolved image");
        Ok(image.id)
    }

    /// Launch one instance into `subnet_id` and tag it. Returns the instance id.
    ///
    /// There is no existence check here: the caller skips this step for
    /// specs that already carry a discovered id.
    pub async fn launch(&self, spec: &InstanceSpec, subnet_id: &str) -> Result<String> {
        let api = self.ctx.api;
        let compute = compute_shape(spec)?;

        let image_id = self.resolve_image(&compute.image).await?;
        let security_group_ids = TagIndex::new(api)
            .require_all(ResourceKind::SecurityGroup, &compute.security_groups)
            .await?;

        let user_data = self
            .ctx
            .settings
            .userdata
            .render(
                &compute.userdata,
                api.profile(),
                &spec.name,
                &compute.network_block(),
            )
            .await?;

        let request = RunInstanceRequest {
            image_id,
            instance_type: spec.instance_type.clone(),
            key_name: compute.key.clone(),
            subnet_id: subnet_id.to_string(),
            security_group_ids,
            private_ip: compute.private_ip.to_string(),
            associate_public_ip: spec.public_ip,
            user_data,
            block_devices: block_device_mapping(compute),
        };

        let instance_id = api.run_instance(&request).await?;
        tracing::info!(instance = %instance_id, name = %spec.name, "Created instance");
        self.ctx
            .record(ActionType::Created, "instance", &spec.name, Some(&instance_id));

        // One tag per call: batch tagging of a just-launched instance is
        // unreliable on the provider side.
        for (key, value) in self.instance_tags(spec) {
            confirm_tag(api, &self.ctx.settings.wait, &instance_id, &key, &value).await?;
        }

        Ok(instance_id)
    }

    /// Name, Customer and the configured extra fields, keys title-cased
    pub fn instance_tags(&self, spec: &InstanceSpec) -> Vec<(String, String)> {
        let mut tags = vec![
            ("Name".to_string(), spec.name.clone()),
            ("Customer".to_string(), spec.customer.clone()),
        ];
        for field in &self.ctx.settings.extra_tag_fields {
            match spec.field_as_tag(field) {
                Some(value) => tags.push((title_case(field), value)),
                None => tracing::debug!(field = %field, name = %spec.name, "Tag field not set"),
            }
        }
        tags
    }

    /// Source/destination check, load balancer registration, volume tags
    pub async fn finish(
        &self,
        spec: &InstanceSpec,
        instance_id: &str,
        groups: &[AzGroup],
        current: &AzGroup,
    ) -> Result<()> {
        let api = self.ctx.api;
        let compute = compute_shape(spec)?;

        if let Some(enabled) = spec.source_dest_check {
            api.set_source_dest_check(instance_id, enabled).await?;
            tracing::info!(instance = %instance_id, enabled, "Applied source/destination check");
        }

        if spec.load_balancer.is_some() {
            LoadBalancerBinder::new(self.ctx)
                .ensure_and_register(spec, instance_id, groups, current)
                .await?;
        }

        if compute.extra_disk_gib.is_some() {
            self.tag_volumes(spec, instance_id).await?;
        }

        Ok(())
    }

    async fn tag_volumes(&self, spec: &InstanceSpec, instance_id: &str) -> Result<()> {
        let api = self.ctx.api;
        let devices = poll_until(
            &self.ctx.settings.wait,
            &format!("block devices of {instance_id}"),
            move || async move {
                let devices = api.block_devices(instance_id).await?;
                if devices.is_empty() {
                    tracing::warn!(instance = %instance_id, "Waiting for block devices to rise");
                    Ok(None)
                } else {
                    Ok(Some(devices))
                }
            },
        )
        .await?;

        for device in devices {
            let name = volume_name(&device.device_name, &spec.name);
            let tags = vec![
                ("Name".to_string(), name.clone()),
                ("Customer".to_string(), spec.customer.clone()),
            ];
            api.create_tags(&device.volume_id, &tags).await?;
            tracing::info!(volume = %device.volume_id, name = %name, "Tagged volume");
            self.ctx
                .record(ActionType::Registered, "volume tags", &name, Some(&device.volume_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, created: &str) -> ImageInfo {
        ImageInfo {
            id: id.to_string(),
            name: format!("debian-{id}"),
            creation_date: created.to_string(),
        }
    }

    #[test]
    fn test_select_latest() {
        let images = vec![
            image("ami-a", "2020-01-01T00:00:00.000Z"),
            image("ami-b", "2021-06-01T00:00:00.000Z"),
        ];
        assert_eq!(select_latest(images).unwrap().id, "ami-b");
        assert_eq!(select_latest(Vec::new()), None);
    }

    #[test]
    fn test_block_device_mapping_only_with_extra_disk() {
        let mut compute = ComputeShape {
            image: "img".to_string(),
            key: "k".to_string(),
            private_ip: "10.1.1.2".parse().unwrap(),
            security_groups: vec![],
            userdata: vec![],
            extra_disk_gib: None,
        };
        assert!(block_device_mapping(&compute).is_empty());

        compute.extra_disk_gib = Some(50);
        let mapping = block_device_mapping(&compute);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping[0].device_name, "/dev/xvdb");
        assert_eq!(mapping[0].size_gib, 50);
    }

    #[test]
    fn test_volume_name() {
        assert_eq!(volume_name("/dev/xvdb", "foo-www-1"), "xvdb_foo-www-1");
        assert_eq!(volume_name("sda1", "foo-www-1"), "sda1_foo-www-1");
    }
}
