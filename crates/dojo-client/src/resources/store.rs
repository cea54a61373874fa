//! 상점과 인벤토리.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ApiClient, ApiResult};

/// 아이템 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Furniture,
    Wallpaper,
    Floor,
    Decoration,
    Avatar,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub category: ItemCategory,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequest {
    pub student_id: String,
    pub item_id: String,
}

/// 구매 영수증.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub item_id: String,
    pub student_id: String,
    pub price: Decimal,
    pub new_balance: Decimal,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// 학생이 보유한 아이템.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_id: String,
    pub name: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub acquired_at: Option<DateTime<Utc>>,
}

impl ApiClient {
    pub async fn list_store_items(&self) -> ApiResult<Vec<StoreItem>> {
        self.get(&["api", "store", "items"]).await
    }

    /// 아이템 구매. 잔액이 부족하면 서버가 4xx로 거부합니다.
    pub async fn purchase_item(&self, request: &PurchaseRequest) -> ApiResult<PurchaseReceipt> {
        self.post(&["api", "store", "purchase"], request).await
    }

    pub async fn get_inventory(&self, student_id: &str) -> ApiResult<Vec<InventoryItem>> {
        self.get(&["api", "store", "inventory", student_id])
            .await
    }
}

pub mod keys {
    use crate::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::new(["store"])
    }

    pub fn items() -> QueryKey {
        all().child("items")
    }

    pub fn inventory(student_id: &str) -> QueryKey {
        all().child("inventory").child(student_id)
    }
}
