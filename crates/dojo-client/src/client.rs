//! BankDojo Jr. REST API 클라이언트.
//!
//! 모든 요청은 JSON으로 주고받으며, 세션이 인증 상태일 때만 Bearer 토큰을
//! 붙입니다. 토큰 획득에 실패하면 경고만 남기고 토큰 없이 요청합니다.
//!
//! 경로는 세그먼트 목록으로 받으며, 각 세그먼트는 퍼센트 인코딩됩니다.
//! (`&["api", "students", id]` → `/api/students/<id>`)
//!
//! # 응답 처리
//!
//! - 401 → [`ApiError::AuthenticationRequired`]
//! - 403 → [`ApiError::PermissionDenied`]
//! - 그 외 2xx가 아닌 응답 → [`ApiError::RequestFailed`]
//! - 2xx → 본문을 타입으로 역직렬화 (빈 본문은 `null`로 취급)

use dojo_core::{ApiConfig, TokenSource};
use reqwest::{header, Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ApiError, ApiResult};

/// 인증 API 클라이언트.
///
/// `TokenSource`를 `Arc`로 공유하므로 여러 클라이언트가 같은 세션의 토큰을
/// 사용할 수 있습니다.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    base: Url,
    client: Client,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_token_source", &self.tokens.is_some())
            .finish()
    }
}

impl ApiClient {
    /// 설정으로 토큰 없는 클라이언트 생성.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|e| ApiError::Config(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Config(format!("Invalid base URL {}", base_url)));
        }

        Ok(Self {
            base_url,
            base,
            client,
            tokens: None,
        })
    }

    /// 토큰 공급자 연결.
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// API 기본 URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET 요청.
    pub async fn get<T: DeserializeOwned>(&self, path: &[&str]) -> ApiResult<T> {
        self.request::<T, ()>(Method::GET, path, &[], None).await
    }

    /// 쿼리 파라미터를 붙인 GET.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        self.request::<T, ()>(Method::GET, path, query, None).await
    }

    /// POST 요청 (생성/동작).
    pub async fn post<T, B>(&self, path: &[&str], body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    /// PUT 요청 (필드 수정).
    pub async fn put<T, B>(&self, path: &[&str], body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, &[], Some(body)).await
    }

    /// DELETE 요청.
    pub async fn delete<T: DeserializeOwned>(&self, path: &[&str]) -> ApiResult<T> {
        self.request::<T, ()>(Method::DELETE, path, &[], None).await
    }

    /// 기본 URL 뒤에 경로 세그먼트를 인코딩해 붙인 URL.
    pub fn url_for(&self, path: &[&str]) -> ApiResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("Invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    /// 공통 요청 처리.
    ///
    /// # 인자
    /// * `method` - HTTP 메서드
    /// * `path` - 경로 세그먼트 (예: `&["api", "students", id]`)
    /// * `query` - 쿼리 파라미터
    /// * `body` - JSON 본문 (없으면 본문 없이 전송)
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url_for(path)?;
        let endpoint = url.path().to_string();

        let mut builder = self
            .client
            .request(method.clone(), url)
            .header(header::CONTENT_TYPE, "application/json");

        if !query.is_empty() {
            builder = builder.query(query);
        }

        if let Some(bearer) = self.bearer().await {
            builder = builder.header(header::AUTHORIZATION, bearer);
        }

        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(%method, endpoint, status = status.as_u16(), "API request failed");
            return Err(ApiError::from_status(status, &text));
        }

        debug!(%method, endpoint, status = status.as_u16(), "API request succeeded");

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ApiError::Parse(format!("Failed to parse response from {}: {}", endpoint, e))
        })
    }

    /// 인증 상태일 때 Authorization 헤더 값 획득.
    async fn bearer(&self) -> Option<String> {
        let tokens = self.tokens.as_ref()?;
        if !tokens.is_authenticated() {
            return None;
        }

        match tokens.access_token().await {
            Ok(Some(token)) => Some(token.bearer_header()),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to get access token, sending request without it");
                None
            }
        }
    }
}
