//! 서버 헬스 체크.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApiClient, ApiResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "ok" | "healthy")
    }
}

impl ApiClient {
    pub async fn health(&self) -> ApiResult<HealthStatus> {
        self.get(&["health"]).await
    }
}

pub mod keys {
    use crate::QueryKey;

    pub fn health() -> QueryKey {
        QueryKey::new(["health"])
    }
}
