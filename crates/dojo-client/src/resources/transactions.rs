//! 코인 거래 내역.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ApiClient, ApiResult};

/// 거래 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    QuestReward,
    Purchase,
    Deposit,
    Withdrawal,
    /// 교사가 직접 지급/차감
    Adjustment,
    #[serde(other)]
    Other,
}

impl TransactionKind {
    /// 잔액이 줄어드는 거래인지 여부.
    pub fn is_debit(&self) -> bool {
        matches!(self, TransactionKind::Purchase | TransactionKind::Withdrawal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub student_id: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTransactionRequest {
    pub student_id: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ApiClient {
    /// 학생의 거래 내역.
    pub async fn get_transactions(&self, student_id: &str) -> ApiResult<Vec<Transaction>> {
        self.get(&["api", "transactions", student_id])
            .await
    }

    pub async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> ApiResult<Transaction> {
        self.post(&["api", "transactions"], request).await
    }
}

pub mod keys {
    use crate::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::new(["transactions"])
    }

    pub fn for_student(student_id: &str) -> QueryKey {
        all().child(student_id)
    }
}
