//! 학생 프로필과 방 꾸미기.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ApiClient, ApiResult};

/// 학생 프로필.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    /// 신원 제공자의 subject 식별자
    pub auth_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub class_id: Option<String>,
    /// 코인 잔액
    pub balance: Decimal,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// 학생 프로필 생성 요청.
#[derive(Debug, Clone, Serialize)]
pub struct CreateStudentRequest {
    pub auth_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// 가입과 동시에 참여할 반 코드
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_code: Option<String>,
}

/// 학생 프로필 부분 수정.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StudentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// 방에 배치된 아이템.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedItem {
    pub item_id: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub rotation: i32,
}

/// 학생 방 배치.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomLayout {
    #[serde(default)]
    pub items: Vec<PlacedItem>,
    #[serde(default)]
    pub wallpaper: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
}

impl ApiClient {
    pub async fn create_student(&self, request: &CreateStudentRequest) -> ApiResult<Student> {
        self.post(&["api", "students"], request).await
    }

    pub async fn get_student(&self, student_id: &str) -> ApiResult<Student> {
        self.get(&["api", "students", student_id]).await
    }

    pub async fn update_student(
        &self,
        student_id: &str,
        update: &StudentUpdate,
    ) -> ApiResult<Student> {
        self.put(&["api", "students", student_id], update)
            .await
    }

    pub async fn get_student_room(&self, student_id: &str) -> ApiResult<RoomLayout> {
        self.get(&["api", "students", student_id, "room"])
            .await
    }

    pub async fn update_student_room(
        &self,
        student_id: &str,
        layout: &RoomLayout,
    ) -> ApiResult<RoomLayout> {
        self.put(&["api", "students", student_id, "room"], layout)
            .await
    }
}

/// 학생 쿼리 키.
pub mod keys {
    use crate::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::new(["students"])
    }

    pub fn detail(student_id: &str) -> QueryKey {
        all().child(student_id)
    }

    pub fn room(student_id: &str) -> QueryKey {
        detail(student_id).child("room")
    }
}
