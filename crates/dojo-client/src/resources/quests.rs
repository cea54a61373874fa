//! 퀘스트 (교사가 만들고 학생이 완료하면 코인 보상).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ApiClient, ApiResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub class_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 완료 보상 코인
    pub reward: Decimal,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_by: Vec<String>,
}

impl Quest {
    /// 학생이 이미 완료했는지 확인.
    pub fn is_completed_by(&self, student_id: &str) -> bool {
        self.completed_by.iter().any(|id| id == student_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateQuestRequest {
    pub class_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub reward: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteQuestRequest {
    pub student_id: String,
}

/// 퀘스트 완료 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestCompletion {
    pub quest_id: String,
    pub student_id: String,
    pub reward: Decimal,
    pub new_balance: Decimal,
}

impl ApiClient {
    /// 반의 퀘스트 목록.
    pub async fn list_quests(&self, class_id: &str) -> ApiResult<Vec<Quest>> {
        self.get_with_query(&["api", "quests"], &[("class_id", class_id)])
            .await
    }

    pub async fn create_quest(&self, request: &CreateQuestRequest) -> ApiResult<Quest> {
        self.post(&["api", "quests"], request).await
    }

    pub async fn complete_quest(
        &self,
        quest_id: &str,
        request: &CompleteQuestRequest,
    ) -> ApiResult<QuestCompletion> {
        self.post(&["api", "quests", quest_id, "complete"], request)
            .await
    }
}

pub mod keys {
    use crate::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::new(["quests"])
    }

    pub fn for_class(class_id: &str) -> QueryKey {
        all().child(class_id)
    }
}
