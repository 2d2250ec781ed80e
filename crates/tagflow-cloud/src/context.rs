//! Shared state of the provisioners for one region

use crate::api::CloudApi;
use crate::confirm::Confirm;
use crate::report::{ActionType, ReconcileReport};
use crate::userdata::UserDataSource;
use crate::wait::WaitConfig;
use std::sync::Mutex;

/// Account owning the official Debian images
pub const DEFAULT_DEBIAN_IMAGE_OWNER: &str = "136693071363";

/// Default NAT instance Name pattern, `{customer}` is substituted
pub const DEFAULT_NAT_INSTANCE_NAME: &str = "{customer}-nat*";

/// Length of generated database root passwords
pub const DEFAULT_DB_PASSWORD_LENGTH: usize = 20;

/// Tunables of a reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Tag-confirmation and block-device polling
    pub wait: WaitConfig,

    /// NAT instance Name pattern
    pub nat_instance_name: String,

    pub userdata: UserDataSource,

    /// Extra instance fields copied into instance tags
    pub extra_tag_fields: Vec<String>,

    /// Owner of images selected through the fixed-distribution path
    pub debian_image_owner: String,

    /// Length of generated database root passwords
    pub db_password_length: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            wait: WaitConfig::default(),
            nat_instance_name: DEFAULT_NAT_INSTANCE_NAME.to_string(),
            userdata: UserDataSource::new("userdata"),
            extra_tag_fields: Vec::new(),
            debian_image_owner: DEFAULT_DEBIAN_IMAGE_OWNER.to_string(),
            db_password_length: DEFAULT_DB_PASSWORD_LENGTH,
        }
    }
}

impl ReconcileSettings {
    /// NAT instance Name pattern for one customer
    pub fn nat_instance_name_for(&self, customer: &str) -> String {
        self.nat_instance_name.replace("{customer}", customer)
    }
}

/// Everything a provisioner needs while working inside one VPC
pub struct ProvisionContext<'a> {
    pub api: &'a dyn CloudApi,
    pub vpc_id: String,
    pub settings: &'a ReconcileSettings,
    pub confirm: &'a dyn Confirm,
    report: Mutex<ReconcileReport>,
}

impl<'a> ProvisionContext<'a> {
    pub fn new(
        api: &'a dyn CloudApi,
        vpc_id: impl Into<String>,
        settings: &'a ReconcileSettings,
        confirm: &'a dyn Confirm,
    ) -> Self {
        Self {
            api,
            vpc_id: vpc_id.into(),
            settings,
            confirm,
            report: Mutex::new(ReconcileReport::new()),
        }
    }

    pub fn record(
        &self,
        action_type: ActionType,
        resource_type: &str,
        name: &str,
        id: Option<&str>,
    ) {
        if let Ok(mut report) = self.report.lock() {
            report.record(action_type, resource_type, name, id.map(str::to_string));
        }
    }

    /// Reuse notice shared by every get-or-create step
    pub fn reuse(&self, resource_type: &str, name: &str, id: Option<&str>) {
        tracing::info!(resource = %resource_type, name = %name, "{} already available, continuing", name);
        self.record(ActionType::Reused, resource_type, name, id);
    }

    pub fn into_report(self) -> ReconcileReport {
        self.report.into_inner().unwrap_or_default()
    }
}
