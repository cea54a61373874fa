//! 리소스별 조회/변경 바인딩.
//!
//! 조회 바인딩은 식별자가 없으면 비활성 상태로 `Ok(None)`을 반환합니다.
//! 변경 바인딩은 성공 후 영향을 받는 쿼리 키를 명시적으로 무효화합니다.
//!
//! | 변경 | 무효화 키 |
//! |---|---|
//! | 학생 생성 | `students` |
//! | 학생 수정 | `students/{id}` |
//! | 방 배치 수정 | `students/{id}/room` |
//! | 교사 생성 | `teachers` |
//! | 반 생성 | `classes`, `teachers/{teacher}/classes` |
//! | 반 참여 | `classes`, `students/{id}` |
//! | 퀘스트 생성 | `quests/{class}` |
//! | 퀘스트 완료 | `quests`, `students/{id}`, `transactions/{id}` |
//! | 아이템 구매 | `students/{id}`, `store/inventory/{id}`, `transactions/{id}` |
//! | 거래 생성 | `transactions/{id}`, `students/{id}` |

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dojo_core::ApiConfig;

use crate::resources::{classes, health, quests, store, students, teachers, transactions};
use crate::{
    ApiClient, ApiResult, ClassRoom, CompleteQuestRequest, CreateClassRequest,
    CreateQuestRequest, CreateStudentRequest, CreateTeacherRequest, CreateTransactionRequest,
    HealthStatus, InventoryItem, JoinClassRequest, PurchaseReceipt, PurchaseRequest, QueryClient,
    QueryKey, QueryOptions, QueryPoll, Quest, QuestCompletion, RoomLayout, StoreItem, Student,
    StudentUpdate, Teacher, Transaction,
};

/// 상점 아이템 목록은 자주 바뀌지 않으므로 잠시 캐시를 재사용.
const STORE_ITEMS_STALE_TIME: Duration = Duration::from_secs(60);

/// BankDojo 쿼리 바인딩 모음.
#[derive(Clone)]
pub struct DojoQueries {
    api: Arc<ApiClient>,
    cache: Arc<QueryClient>,
    defaults: QueryOptions,
    health_interval: Duration,
}

impl DojoQueries {
    pub fn new(api: Arc<ApiClient>, cache: Arc<QueryClient>) -> Self {
        Self {
            api,
            cache,
            defaults: QueryOptions::default(),
            health_interval: Duration::from_secs(ApiConfig::default().health_poll_secs),
        }
    }

    /// 설정의 헬스 폴링 주기 적용.
    pub fn with_config(mut self, config: &ApiConfig) -> Self {
        self.health_interval = Duration::from_secs(config.health_poll_secs);
        self
    }

    /// 모든 조회에 적용할 기본 옵션.
    pub fn with_defaults(mut self, defaults: QueryOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn cache(&self) -> &Arc<QueryClient> {
        &self.cache
    }

    async fn read<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> ApiResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.cache.fetch(&key, &options, fetcher).await
    }

    fn options_for(&self, id: Option<&str>) -> QueryOptions {
        self.defaults.clone().enabled(id.is_some())
    }

    // ========================================
    // 조회
    // ========================================

    /// 학생 정보. ID가 없으면 조회하지 않습니다.
    pub async fn student(&self, student_id: Option<&str>) -> ApiResult<Option<Student>> {
        let id = student_id.unwrap_or_default();
        self.read(students::keys::detail(id), self.options_for(student_id), || {
            self.api.get_student(id)
        })
        .await
    }

    /// 학생 방 배치.
    pub async fn student_room(&self, student_id: Option<&str>) -> ApiResult<Option<RoomLayout>> {
        let id = student_id.unwrap_or_default();
        self.read(students::keys::room(id), self.options_for(student_id), || {
            self.api.get_student_room(id)
        })
        .await
    }

    /// 교사 정보.
    pub async fn teacher(&self, teacher_id: Option<&str>) -> ApiResult<Option<Teacher>> {
        let id = teacher_id.unwrap_or_default();
        self.read(teachers::keys::detail(id), self.options_for(teacher_id), || {
            self.api.get_teacher(id)
        })
        .await
    }

    /// 교사가 담당하는 반 목록.
    pub async fn teacher_classes(
        &self,
        teacher_id: Option<&str>,
    ) -> ApiResult<Option<Vec<ClassRoom>>> {
        let id = teacher_id.unwrap_or_default();
        self.read(teachers::keys::classes(id), self.options_for(teacher_id), || {
            self.api.get_teacher_classes(id)
        })
        .await
    }

    /// 반 정보.
    pub async fn class(&self, class_id: Option<&str>) -> ApiResult<Option<ClassRoom>> {
        let id = class_id.unwrap_or_default();
        self.read(classes::keys::detail(id), self.options_for(class_id), || {
            self.api.get_class(id)
        })
        .await
    }

    /// 반 소속 학생 목록.
    pub async fn class_students(&self, class_id: Option<&str>) -> ApiResult<Option<Vec<Student>>> {
        let id = class_id.unwrap_or_default();
        self.read(classes::keys::students(id), self.options_for(class_id), || {
            self.api.get_class_students(id)
        })
        .await
    }

    /// 반의 퀘스트 목록.
    pub async fn quests(&self, class_id: Option<&str>) -> ApiResult<Option<Vec<Quest>>> {
        let id = class_id.unwrap_or_default();
        self.read(quests::keys::for_class(id), self.options_for(class_id), || {
            self.api.list_quests(id)
        })
        .await
    }

    /// 상점 아이템 목록 (60초 동안 캐시).
    pub async fn store_items(&self) -> ApiResult<Option<Vec<StoreItem>>> {
        let options = self.defaults.clone().stale_time(STORE_ITEMS_STALE_TIME);
        self.read(store::keys::items(), options, || self.api.list_store_items())
            .await
    }

    /// 학생 보유 아이템.
    pub async fn inventory(
        &self,
        student_id: Option<&str>,
    ) -> ApiResult<Option<Vec<InventoryItem>>> {
        let id = student_id.unwrap_or_default();
        self.read(store::keys::inventory(id), self.options_for(student_id), || {
            self.api.get_inventory(id)
        })
        .await
    }

    /// 학생 거래 내역.
    pub async fn transactions(
        &self,
        student_id: Option<&str>,
    ) -> ApiResult<Option<Vec<Transaction>>> {
        let id = student_id.unwrap_or_default();
        self.read(
            transactions::keys::for_student(id),
            self.options_for(student_id),
            || self.api.get_transactions(id),
        )
        .await
    }

    /// 서버 상태 한 번 조회.
    pub async fn health(&self) -> ApiResult<Option<HealthStatus>> {
        self.read(health::keys::health(), self.defaults.clone(), || {
            self.api.health()
        })
        .await
    }

    /// 헬스 체크 주기적 폴링.
    pub fn watch_health(&self) -> QueryPoll<HealthStatus> {
        let api = Arc::clone(&self.api);
        let options = self.defaults.clone().refetch_interval(self.health_interval);
        self.cache.poll(
            health::keys::health(),
            options,
            move || {
                let api = Arc::clone(&api);
                async move { api.health().await }
            },
        )
    }

    // ========================================
    // 변경
    // ========================================

    pub async fn create_student(&self, request: &CreateStudentRequest) -> ApiResult<Student> {
        self.cache
            .mutate(&[students::keys::all()], self.api.create_student(request))
            .await
    }

    pub async fn update_student(
        &self,
        student_id: &str,
        update: &StudentUpdate,
    ) -> ApiResult<Student> {
        self.cache
            .mutate(
                &[students::keys::detail(student_id)],
                self.api.update_student(student_id, update),
            )
            .await
    }

    pub async fn update_room(&self, student_id: &str, layout: &RoomLayout) -> ApiResult<RoomLayout> {
        self.cache
            .mutate(
                &[students::keys::room(student_id)],
                self.api.update_student_room(student_id, layout),
            )
            .await
    }

    pub async fn create_teacher(&self, request: &CreateTeacherRequest) -> ApiResult<Teacher> {
        self.cache
            .mutate(&[teachers::keys::all()], self.api.create_teacher(request))
            .await
    }

    pub async fn create_class(&self, request: &CreateClassRequest) -> ApiResult<ClassRoom> {
        self.cache
            .mutate(
                &[
                    classes::keys::all(),
                    teachers::keys::classes(&request.teacher_id),
                ],
                self.api.create_class(request),
            )
            .await
    }

    pub async fn join_class(&self, request: &JoinClassRequest) -> ApiResult<ClassRoom> {
        self.cache
            .mutate(
                &[
                    classes::keys::all(),
                    students::keys::detail(&request.student_id),
                ],
                self.api.join_class(request),
            )
            .await
    }

    pub async fn create_quest(&self, request: &CreateQuestRequest) -> ApiResult<Quest> {
        self.cache
            .mutate(
                &[quests::keys::for_class(&request.class_id)],
                self.api.create_quest(request),
            )
            .await
    }

    /// 퀘스트 완료. 보상이 잔액과 거래 내역에 반영되므로 함께 무효화합니다.
    pub async fn complete_quest(
        &self,
        quest_id: &str,
        student_id: &str,
    ) -> ApiResult<QuestCompletion> {
        let request = CompleteQuestRequest {
            student_id: student_id.to_string(),
        };
        self.cache
            .mutate(
                &[
                    quests::keys::all(),
                    students::keys::detail(student_id),
                    transactions::keys::for_student(student_id),
                ],
                self.api.complete_quest(quest_id, &request),
            )
            .await
    }

    pub async fn purchase_item(&self, request: &PurchaseRequest) -> ApiResult<PurchaseReceipt> {
        let student_id = request.student_id.as_str();
        self.cache
            .mutate(
                &[
                    students::keys::detail(student_id),
                    store::keys::inventory(student_id),
                    transactions::keys::for_student(student_id),
                ],
                self.api.purchase_item(request),
            )
            .await
    }

    pub async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> ApiResult<Transaction> {
        let student_id = request.student_id.as_str();
        self.cache
            .mutate(
                &[
                    transactions::keys::for_student(student_id),
                    students::keys::detail(student_id),
                ],
                self.api.create_transaction(request),
            )
            .await
    }
}
