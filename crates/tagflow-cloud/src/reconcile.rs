//! Top-level walk over a desired-state document
//!
//! Regions, AZ groups and instances are processed strictly in declaration
//! order, one at a time: a NAT instance created early in a run has to be
//! visible when a later subnet picks its default route.

use crate::api::{CloudApi, CloudRegistry, ResourceKind};
use crate::compute::ComputeProvisioner;
use crate::confirm::Confirm;
use crate::context::{ProvisionContext, ReconcileSettings};
use crate::database::DatabaseProvisioner;
use crate::error::{CloudError, Result};
use crate::model::{AzGroup, DesiredState, InstanceSpec, NetworkDescriptor, RegionStep};
use crate::network::NetworkProvisioner;
use crate::report::{ActionType, ReconcileReport};
use crate::state::DesiredStateStore;
use crate::tag_index::TagIndex;
use std::time::Instant;

pub struct ReconcileDriver<'a> {
    registry: &'a dyn CloudRegistry,
    settings: &'a ReconcileSettings,
    confirm: &'a dyn Confirm,
    store: &'a DesiredStateStore,
}

impl<'a> ReconcileDriver<'a> {
    pub fn new(
        registry: &'a dyn CloudRegistry,
        settings: &'a ReconcileSettings,
        confirm: &'a dyn Confirm,
        store: &'a DesiredStateStore,
    ) -> Self {
        Self {
            registry,
            settings,
            confirm,
            store,
        }
    }

    /// Reconcile every region of `state`, writing discovered ids back to the store
    pub async fn run(&self, state: &mut DesiredState) -> Result<ReconcileReport> {
        let start = Instant::now();
        let mut report = ReconcileReport::new();

        for region in state.regions() {
            tracing::info!(region = %region, "Reconciling region");
            let api = self.registry.client(&region).await?;
            report.merge(self.run_region(api.as_ref(), &region, state).await?);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    async fn run_region(
        &self,
        api: &dyn CloudApi,
        region: &str,
        state: &mut DesiredState,
    ) -> Result<ReconcileReport> {
        let steps = state.region_steps(region)?;
        let groups: Vec<AzGroup> = steps
            .iter()
            .filter_map(|step| match step {
                RegionStep::Group(group) => Some(group.clone()),
                RegionStep::SelectVpc(_) => None,
            })
            .collect();

        let mut report = ReconcileReport::new();
        let mut vpc_id: Option<String> = None;

        for step in steps {
            let group = match step {
                RegionStep::SelectVpc(name) => {
                    let id = TagIndex::new(api).require(ResourceKind::Vpc, &name).await?;
                    tracing::info!(vpc = %id, name = %name, "Selected VPC");
                    vpc_id = Some(id);
                    continue;
                }
                RegionStep::Group(group) => group,
            };

            let vpc = match &vpc_id {
                Some(id) => id.clone(),
                None => {
                    let id = api.default_vpc().await?.ok_or_else(|| {
                        CloudError::Config(format!("no VPC available in {region}"))
                    })?;
                    tracing::info!(vpc = %id, "Using default VPC");
                    vpc_id = Some(id.clone());
                    id
                }
            };

            let ctx = ProvisionContext::new(api, vpc, self.settings, self.confirm);
            for (index, value) in group.instances.iter().enumerate() {
                let spec = InstanceSpec::from_value(value)?;
                tracing::info!(name = %spec.name, group = %group.name, "Reconciling instance");
                if spec.is_database() {
                    DatabaseProvisioner::new(&ctx)
                        .create_database(&spec, &group)
                        .await?;
                } else {
                    self.reconcile_compute(&ctx, region, state, &groups, &group, index, &spec)
                        .await?;
                }
            }
            report.merge(ctx.into_report());
        }

        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn reconcile_compute(
        &self,
        ctx: &ProvisionContext<'_>,
        region: &str,
        state: &mut DesiredState,
        groups: &[AzGroup],
        group: &AzGroup,
        index: usize,
        spec: &InstanceSpec,
    ) -> Result<()> {
        let descriptor = NetworkDescriptor::for_compute(&group.name)?;
        let subnet_id = NetworkProvisioner::new(ctx)
            .ensure_network(spec, &descriptor)
            .await?;

        let compute = ComputeProvisioner::new(ctx);
        let instance_id = match &spec.discovered_id {
            Some(id) => {
                tracing::info!(name = %spec.name, instance = %id, "Instance already created, skipping launch");
                ctx.record(ActionType::Skipped, "instance", &spec.name, Some(id));
                id.clone()
            }
            None => {
                let id = compute.launch(spec, &subnet_id).await?;
                state.set_discovered_id(region, group, index, &id)?;
                self.store.save(state).await?;
                id
            }
        };

        compute.finish(spec, &instance_id, groups, group).await
    }
}
