//! Profile-keyed client cache

use crate::cloud::AwsCloud;
use crate::context::AwsContext;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tagflow_cloud::{CloudApi, CloudRegistry, Result};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Builds one [`AwsCloud`] per profile and hands out the same client for the
/// rest of the run
#[derive(Default)]
pub struct AwsRegistry {
    clients: Mutex<HashMap<String, Arc<AwsCloud>>>,
}

impl AwsRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CloudRegistry for AwsRegistry {
    async fn client(&self, profile: &str) -> Result<Arc<dyn CloudApi>> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(profile) {
            debug!(profile, "Reusing AWS client");
            let client: Arc<dyn CloudApi> = client.clone();
            return Ok(client);
        }

        let context = AwsContext::for_profile(profile).await;
        info!(profile, region = ?context.region(), "Loaded AWS profile");
        let client = Arc::new(AwsCloud::from_context(&context));
        clients.insert(profile.to_string(), client.clone());
        let client: Arc<dyn CloudApi> = client;
        Ok(client)
    }
}
