//! Name-tag based resource lookup
//!
//! The provider has no "get or create by name" primitive, so identity is the
//! `Name` tag. Nothing is cached: every lookup is a live filtered query, which
//! keeps it consistent with whatever earlier steps of the same run created.

use crate::api::{CloudApi, ResourceKind};
use crate::error::{CloudError, Result};

pub struct TagIndex<'a> {
    api: &'a dyn CloudApi,
}

impl<'a> TagIndex<'a> {
    pub fn new(api: &'a dyn CloudApi) -> Self {
        Self { api }
    }

    /// Id of the first `kind` resource tagged `Name=name`
    pub async fn find(&self, kind: ResourceKind, name: &str) -> Result<Option<String>> {
        let found = self.api.find_by_name_tag(kind, name).await?;
        tracing::debug!(kind = %kind, name = %name, found = ?found, "Name tag lookup");
        Ok(found)
    }

    /// Like [`find`](Self::find), but a miss is a configuration error
    pub async fn require(&self, kind: ResourceKind, name: &str) -> Result<String> {
        self.find(kind, name)
            .await?
            .ok_or_else(|| CloudError::Config(format!("no {kind} tagged Name={name}")))
    }

    /// Resolve each name in order
    pub async fn require_all(&self, kind: ResourceKind, names: &[String]) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            ids.push(self.require(kind, name).await?);
        }
        Ok(ids)
    }
}
