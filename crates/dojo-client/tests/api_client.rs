//! Integration tests for the API client and query bindings against a mock server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dojo_client::{
    ApiClient, ApiError, DojoQueries, PurchaseRequest, QueryClient, QueryOptions, StudentUpdate,
};
use dojo_core::{AccessToken, ApiConfig, CoreError, CoreResult, TokenSource};
use mockito::Matcher;
use rust_decimal_macros::dec;
use serde_json::json;

enum TokenBehavior {
    Issue(&'static str),
    Fail,
    SignedOut,
}

struct FakeTokens {
    behavior: TokenBehavior,
    requests: AtomicU32,
}

impl FakeTokens {
    fn new(behavior: TokenBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            requests: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl TokenSource for FakeTokens {
    fn is_authenticated(&self) -> bool {
        !matches!(self.behavior, TokenBehavior::SignedOut)
    }

    async fn access_token(&self) -> CoreResult<Option<AccessToken>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            TokenBehavior::Issue(token) => Ok(Some(AccessToken::new(token, None))),
            TokenBehavior::Fail => Err(CoreError::TokenUnavailable("consent required".to_string())),
            TokenBehavior::SignedOut => Ok(None),
        }
    }
}

fn client(server: &mockito::Server, tokens: Arc<FakeTokens>) -> ApiClient {
    let config = ApiConfig {
        base_url: server.url(),
        timeout_secs: 5,
        ..Default::default()
    };
    ApiClient::new(&config).unwrap().with_token_source(tokens)
}

fn student_body(balance: &str) -> String {
    json!({
        "id": "s-1",
        "auth_id": "auth0|kid",
        "name": "Mina",
        "class_id": "c-1",
        "balance": balance,
    })
    .to_string()
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/students/s-1")
        .match_header("authorization", "Bearer tok-123")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_body(student_body("42"))
        .create_async()
        .await;

    let api = client(&server, FakeTokens::new(TokenBehavior::Issue("tok-123")));
    let student = api.get_student("s-1").await.unwrap();

    assert_eq!(student.name, "Mina");
    assert_eq!(student.balance, dec!(42));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_identifier_is_a_single_path_segment() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/students/kid%2Fone/room")
        .with_status(200)
        .with_body(r#"{"items":[]}"#)
        .create_async()
        .await;

    let api = client(&server, FakeTokens::new(TokenBehavior::Issue("t")));
    api.get_student_room("kid/one").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_token_failure_sends_request_without_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/health")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;

    let tokens = FakeTokens::new(TokenBehavior::Fail);
    let api = client(&server, tokens.clone());
    let health = api.health().await.unwrap();

    assert!(health.is_healthy());
    assert_eq!(tokens.requests.load(Ordering::SeqCst), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_signed_out_never_asks_for_token() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/store/items")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let tokens = FakeTokens::new(TokenBehavior::SignedOut);
    let api = client(&server, tokens.clone());
    assert!(api.list_store_items().await.unwrap().is_empty());
    assert_eq!(tokens.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_status_classification() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/students/a")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("GET", "/api/students/b")
        .with_status(403)
        .with_body(r#"{"error":"teachers only"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/students/c")
        .with_status(500)
        .with_body(r#"{"error":"boom"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/students/d")
        .with_status(503)
        .with_body("Service Unavailable")
        .create_async()
        .await;

    let api = client(&server, FakeTokens::new(TokenBehavior::Issue("t")));

    assert_eq!(
        api.get_student("a").await.unwrap_err(),
        ApiError::AuthenticationRequired
    );
    assert_eq!(
        api.get_student("b").await.unwrap_err(),
        ApiError::PermissionDenied
    );
    assert_eq!(
        api.get_student("c").await.unwrap_err(),
        ApiError::RequestFailed {
            status: 500,
            message: "boom".to_string()
        }
    );
    assert_eq!(
        api.get_student("d").await.unwrap_err(),
        ApiError::RequestFailed {
            status: 503,
            message: "Request failed with status 503".to_string()
        }
    );
}

#[tokio::test]
async fn test_put_sends_json_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/api/students/s-1")
        .match_body(Matcher::Json(json!({ "name": "Mina K." })))
        .with_status(200)
        .with_body(student_body("42"))
        .create_async()
        .await;

    let api = client(&server, FakeTokens::new(TokenBehavior::Issue("t")));
    let update = StudentUpdate {
        name: Some("Mina K.".to_string()),
        ..Default::default()
    };
    api.update_student("s-1", &update).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_quests_use_class_query_parameter() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/quests")
        .match_query(Matcher::UrlEncoded("class_id".into(), "c-1".into()))
        .with_status(200)
        .with_body(
            json!([{
                "id": "q-1",
                "class_id": "c-1",
                "title": "Read a book",
                "reward": "10",
                "completed_by": ["s-2"],
            }])
            .to_string(),
        )
        .create_async()
        .await;

    let api = client(&server, FakeTokens::new(TokenBehavior::Issue("t")));
    let quests = api.list_quests("c-1").await.unwrap();

    assert_eq!(quests.len(), 1);
    assert!(quests[0].is_completed_by("s-2"));
    assert!(!quests[0].is_completed_by("s-1"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_identifier_disables_query() {
    let server = mockito::Server::new_async().await;
    let api = Arc::new(client(&server, FakeTokens::new(TokenBehavior::Issue("t"))));
    let queries = DojoQueries::new(api, Arc::new(QueryClient::new()));

    assert_eq!(queries.student(None).await.unwrap(), None);
    assert_eq!(queries.transactions(None).await.unwrap(), None);
    assert!(queries.cache().is_empty());
}

#[tokio::test]
async fn test_purchase_refreshes_balance() {
    let mut server = mockito::Server::new_async().await;
    let before = server
        .mock("GET", "/api/students/s-1")
        .with_status(200)
        .with_body(student_body("100"))
        .expect(1)
        .create_async()
        .await;

    let api = Arc::new(client(&server, FakeTokens::new(TokenBehavior::Issue("t"))));
    let queries = DojoQueries::new(api, Arc::new(QueryClient::new()))
        .with_defaults(QueryOptions::default().stale_time(std::time::Duration::from_secs(60)));

    let student = queries.student(Some("s-1")).await.unwrap().unwrap();
    assert_eq!(student.balance, dec!(100));

    // 신선한 캐시는 다시 요청하지 않음
    queries.student(Some("s-1")).await.unwrap();
    before.assert_async().await;
    before.remove_async().await;

    server
        .mock("POST", "/api/store/purchase")
        .match_body(Matcher::Json(json!({ "student_id": "s-1", "item_id": "lamp" })))
        .with_status(200)
        .with_body(
            json!({
                "item_id": "lamp",
                "student_id": "s-1",
                "price": "15",
                "new_balance": "85",
            })
            .to_string(),
        )
        .create_async()
        .await;
    let after = server
        .mock("GET", "/api/students/s-1")
        .with_status(200)
        .with_body(student_body("85"))
        .expect(1)
        .create_async()
        .await;

    let receipt = queries
        .purchase_item(&PurchaseRequest {
            student_id: "s-1".to_string(),
            item_id: "lamp".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(receipt.new_balance, dec!(85));

    let student = queries.student(Some("s-1")).await.unwrap().unwrap();
    assert_eq!(student.balance, dec!(85));
    after.assert_async().await;
}

#[tokio::test]
async fn test_failed_purchase_keeps_cache() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/students/s-1")
        .with_status(200)
        .with_body(student_body("5"))
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/api/store/purchase")
        .with_status(400)
        .with_body(r#"{"error":{"message":"Insufficient balance"}}"#)
        .create_async()
        .await;

    let api = Arc::new(client(&server, FakeTokens::new(TokenBehavior::Issue("t"))));
    let queries = DojoQueries::new(api, Arc::new(QueryClient::new()))
        .with_defaults(QueryOptions::default().stale_time(std::time::Duration::from_secs(60)));

    queries.student(Some("s-1")).await.unwrap();

    let err = queries
        .purchase_item(&PurchaseRequest {
            student_id: "s-1".to_string(),
            item_id: "castle".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::RequestFailed {
            status: 400,
            message: "Insufficient balance".to_string()
        }
    );

    let key = dojo_client::students::keys::detail("s-1");
    assert!(!queries.cache().is_stale(&key));
}
