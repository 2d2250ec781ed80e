//! Shared AWS configuration context
//!
//! One `AwsContext` per profile: credentials and region come from the named
//! profile of the shared AWS config files, and every service client of the
//! run is created from the same loaded config.

use aws_config::{BehaviorVersion, SdkConfig};
use std::sync::Arc;

#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    profile: String,
}

impl AwsContext {
    /// Load AWS configuration for a named profile
    pub async fn for_profile(profile: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .load()
            .await;

        Self {
            config: Arc::new(config),
            profile: profile.to_string(),
        }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn region(&self) -> Option<&str> {
        self.config.region().map(|r| r.as_ref())
    }

    pub fn ec2_client(&self) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(self.sdk_config())
    }

    pub fn rds_client(&self) -> aws_sdk_rds::Client {
        aws_sdk_rds::Client::new(self.sdk_config())
    }

    pub fn elb_client(&self) -> aws_sdk_elasticloadbalancing::Client {
        aws_sdk_elasticloadbalancing::Client::new(self.sdk_config())
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("profile", &self.profile)
            .field("region", &self.region())
            .finish_non_exhaustive()
    }
}
