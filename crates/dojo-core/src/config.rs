//! 설정 관리.
//!
//! 기본값 → 설정 파일(선택) → 환경 변수 순으로 덮어씁니다.
//! 환경 변수는 `BANKDOJO` 접두어와 `__` 구분자를 사용합니다
//! (예: `BANKDOJO__API__BASE_URL`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{CoreError, CoreResult};

/// 환경 변수 접두어.
pub const ENV_PREFIX: &str = "BANKDOJO";

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_FILE: &str = "bankdojo.toml";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 백엔드 API 설정
    #[serde(default)]
    pub api: ApiConfig,
    /// 신원 제공자 및 역할 설정
    #[serde(default)]
    pub auth: AuthConfig,
    /// 라우트 가드 경로 설정
    #[serde(default)]
    pub routes: RoutesConfig,
    /// 로컬 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 백엔드 API 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// REST API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 헬스 체크 폴링 간격 (초)
    pub health_poll_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            timeout_secs: 30,
            health_poll_secs: 30,
        }
    }
}

/// 신원 제공자 및 역할 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// 제공자 도메인 (예: "https://bankdojo.us.auth0.com")
    pub domain: String,
    /// OAuth 클라이언트 ID
    pub client_id: String,
    /// API audience (선택)
    #[serde(default)]
    pub audience: Option<String>,
    /// 로그인 후 돌아올 URI
    pub redirect_uri: String,
    /// 로그아웃 후 돌아올 URI
    pub logout_return_uri: String,
    /// 역할 메타데이터 클레임 네임스페이스
    pub claims_namespace: String,
    /// 역할을 저장하는 키
    pub role_storage_key: String,
    /// 학생 로그인 후 이동할 경로
    pub student_home: String,
    /// 교사 로그인 후 이동할 경로
    pub teacher_home: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain: "https://bankdojo.us.auth0.com".to_string(),
            client_id: String::new(),
            audience: None,
            redirect_uri: "http://localhost:5173/callback".to_string(),
            logout_return_uri: "http://localhost:5173".to_string(),
            claims_namespace: "https://bankdojo.com".to_string(),
            role_storage_key: "user_role".to_string(),
            student_home: "/student-dashboard".to_string(),
            teacher_home: "/teacher-dashboard".to_string(),
        }
    }
}

impl AuthConfig {
    /// 앱 수준 메타데이터 클레임 키.
    pub fn app_metadata_claim(&self) -> String {
        format!("{}/app_metadata", self.claims_namespace.trim_end_matches('/'))
    }

    /// 사용자 수준 메타데이터 클레임 키.
    pub fn user_metadata_claim(&self) -> String {
        format!("{}/user_metadata", self.claims_namespace.trim_end_matches('/'))
    }
}

/// 라우트 가드 경로 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutesConfig {
    /// 역할 선택 페이지 경로
    pub role_setup_path: String,
    /// 접근 거부 시 돌아갈 경로
    pub fallback_path: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            role_setup_path: "/role-selection".to_string(),
            fallback_path: "/".to_string(),
        }
    }
}

/// 로컬 저장소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// 저장소 파일 경로
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".bankdojo/storage.json"),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl AppConfig {
    /// 기본값, 설정 파일, 환경 변수에서 설정을 로드합니다.
    ///
    /// `path`가 `None`이면 [`DEFAULT_CONFIG_FILE`]을 찾되, 없어도 에러가
    /// 아닙니다. 명시한 파일은 반드시 존재해야 합니다.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        // .env 파일이 있으면 환경 변수로 로드
        dotenvy::dotenv().ok();

        let file_source = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = config::Config::builder()
            // 기본값으로 시작
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 파일에서 로드
            .add_source(file_source)
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// 설정 값 검증.
    pub fn validate(&self) -> CoreResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(CoreError::Config("api.base_url이 비어 있습니다".to_string()));
        }
        if self.auth.role_storage_key.trim().is_empty() {
            return Err(CoreError::Config(
                "auth.role_storage_key가 비어 있습니다".to_string(),
            ));
        }
        if self.api.health_poll_secs == 0 {
            return Err(CoreError::Config(
                "api.health_poll_secs는 0보다 커야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}
