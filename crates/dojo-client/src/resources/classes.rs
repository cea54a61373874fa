//! 반(학급) 관리.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApiClient, ApiResult, Student};

/// 반.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRoom {
    pub id: String,
    pub name: String,
    pub teacher_id: String,
    /// 학생이 참여할 때 입력하는 코드
    pub class_code: String,
    #[serde(default)]
    pub student_count: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateClassRequest {
    pub name: String,
    pub teacher_id: String,
}

/// 반 코드로 참여.
#[derive(Debug, Clone, Serialize)]
pub struct JoinClassRequest {
    pub class_code: String,
    pub student_id: String,
}

impl ApiClient {
    pub async fn create_class(&self, request: &CreateClassRequest) -> ApiResult<ClassRoom> {
        self.post(&["api", "classes"], request).await
    }

    pub async fn get_class(&self, class_id: &str) -> ApiResult<ClassRoom> {
        self.get(&["api", "classes", class_id]).await
    }

    /// 반 명단.
    pub async fn get_class_students(&self, class_id: &str) -> ApiResult<Vec<Student>> {
        self.get(&["api", "classes", class_id, "students"])
            .await
    }

    pub async fn join_class(&self, request: &JoinClassRequest) -> ApiResult<ClassRoom> {
        self.post(&["api", "classes", "join"], request).await
    }
}

pub mod keys {
    use crate::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::new(["classes"])
    }

    pub fn detail(class_id: &str) -> QueryKey {
        all().child(class_id)
    }

    pub fn students(class_id: &str) -> QueryKey {
        detail(class_id).child("students")
    }
}
