//! 리소스별 모델과 엔드포인트.
//!
//! 각 모듈은 직렬화 모델, [`crate::ApiClient`] 엔드포인트 메서드,
//! 그리고 해당 리소스의 쿼리 키(`keys`)를 제공합니다.

pub mod classes;
pub mod health;
pub mod quests;
pub mod store;
pub mod students;
pub mod teachers;
pub mod transactions;

pub use classes::{ClassRoom, CreateClassRequest, JoinClassRequest};
pub use health::HealthStatus;
pub use quests::{CompleteQuestRequest, CreateQuestRequest, Quest, QuestCompletion};
pub use store::{InventoryItem, ItemCategory, PurchaseReceipt, PurchaseRequest, StoreItem};
pub use students::{CreateStudentRequest, PlacedItem, RoomLayout, Student, StudentUpdate};
pub use teachers::{CreateTeacherRequest, Teacher};
pub use transactions::{CreateTransactionRequest, Transaction, TransactionKind};
