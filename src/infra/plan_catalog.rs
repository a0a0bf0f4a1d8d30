use std::path::PathBuf;

use async_trait::async_trait;
use tracing::error;

use crate::{
    application::use_cases::subscription::PlanCatalog,
    domain::entities::subscription_plan::SubscriptionPlan,
};

/// Plans read from a JSON array on disk. The file is re-read on every call so
/// edits apply without a restart.
#[derive(Debug, Clone)]
pub struct JsonFilePlanCatalog {
    path: PathBuf,
}

impl JsonFilePlanCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PlanCatalog for JsonFilePlanCatalog {
    async fn list_plans(&self) -> Vec<SubscriptionPlan> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to read subscription plans");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(plans) => plans,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to parse subscription plans");
                Vec::new()
            }
        }
    }
}
