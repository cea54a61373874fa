//! 교사 프로필.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApiClient, ApiResult, ClassRoom};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    pub auth_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTeacherRequest {
    pub auth_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
}

impl ApiClient {
    pub async fn create_teacher(&self, request: &CreateTeacherRequest) -> ApiResult<Teacher> {
        self.post(&["api", "teachers"], request).await
    }

    pub async fn get_teacher(&self, teacher_id: &str) -> ApiResult<Teacher> {
        self.get(&["api", "teachers", teacher_id]).await
    }

    /// 교사가 담당하는 반 목록.
    pub async fn get_teacher_classes(&self, teacher_id: &str) -> ApiResult<Vec<ClassRoom>> {
        self.get(&["api", "teachers", teacher_id, "classes"])
            .await
    }
}

pub mod keys {
    use crate::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::new(["teachers"])
    }

    pub fn detail(teacher_id: &str) -> QueryKey {
        all().child(teacher_id)
    }

    pub fn classes(teacher_id: &str) -> QueryKey {
        detail(teacher_id).child("classes")
    }
}
