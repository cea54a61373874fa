//! 명령 실행 컨텍스트.
//!
//! 설정으로부터 저장소, 신원 제공자, 역할 해석기, 라우트 가드, API 바인딩을
//! 한 번에 조립합니다. 제공자 세션은 파일 저장소에 보관되어 다음 실행에서
//! 복원됩니다.

use std::sync::Arc;

use anyhow::{Context, Result};
use dojo_auth::{GuardOutcome, OidcConfig, OidcProvider, PersistedSession, RoleResolver, RouteGuard};
use dojo_client::{ApiClient, DojoQueries, QueryClient};
use dojo_core::{AppConfig, FileStore, KeyValueStore, Role, RoleNotifier};
use tracing::{debug, error, warn};

/// 제공자 세션을 저장하는 키.
pub const SESSION_KEY: &str = "auth_session";

/// 명령 실행 컨텍스트.
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<FileStore>,
    pub provider: Arc<OidcProvider>,
    pub resolver: Arc<RoleResolver>,
    pub guard: RouteGuard,
    pub queries: DojoQueries,
}

impl AppContext {
    /// 설정으로 컨텍스트 조립.
    pub fn build(config: AppConfig) -> Result<Self> {
        let store = Arc::new(FileStore::open(&config.storage.path));

        let provider = Arc::new(
            OidcProvider::new(OidcConfig::from_auth_config(
                &config.auth,
                config.api.timeout_secs,
            ))
            .context("Failed to create identity provider")?,
        );
        restore_session(&store, &provider);

        let resolver = Arc::new(RoleResolver::new(
            provider.clone(),
            store.clone(),
            RoleNotifier::new(),
            config.auth.clone(),
        ));

        let api = ApiClient::new(&config.api)
            .context("Failed to create API client")?
            .with_token_source(resolver.clone());
        let queries = DojoQueries::new(Arc::new(api), Arc::new(QueryClient::new()))
            .with_config(&config.api);

        let guard = RouteGuard::new(&config.routes);

        Ok(Self {
            config,
            store,
            provider,
            resolver,
            guard,
            queries,
        })
    }

    /// 제공자 세션 저장 (로그아웃 상태면 삭제).
    pub fn persist_session(&self) -> Result<()> {
        match self.provider.export_session() {
            Some(session) => {
                let json = serde_json::to_string(&session)?;
                self.store.set(SESSION_KEY, &json)?;
                debug!("provider session persisted");
            }
            None => {
                self.store.remove(SESSION_KEY)?;
            }
        }
        Ok(())
    }

    /// 명령 종료 처리.
    ///
    /// 명령이 실패했더라도 토큰 갱신으로 리프레시 토큰이 바뀌었을 수 있으므로,
    /// 인증 상태라면 항상 세션을 저장한 뒤 명령 결과를 그대로 돌려줍니다.
    pub fn finish<T>(&self, outcome: Result<T>) -> Result<T> {
        if !self.resolver.session().is_authenticated {
            return outcome;
        }
        match (outcome, self.persist_session()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(persist)) => {
                error!(error = %persist, "failed to save session after command error");
                Err(e)
            }
        }
    }

    /// 경로에 대한 가드 평가.
    pub fn check(&self, required: Option<Role>, path: &str) -> GuardOutcome {
        self.guard.check(&self.resolver, required, path)
    }

    /// 학생 명령에 사용할 학생 ID.
    ///
    /// 명시하지 않으면 로그인한 사용자의 subject ID를 사용합니다.
    pub fn student_id(&self, explicit: Option<String>) -> Option<String> {
        explicit.or_else(|| self.resolver.session().subject_id().map(str::to_string))
    }

    /// 역할별 홈 경로.
    pub fn home_for(&self, role: Role) -> &str {
        match role {
            Role::Student => &self.config.auth.student_home,
            Role::Teacher => &self.config.auth.teacher_home,
        }
    }
}

fn restore_session(store: &FileStore, provider: &OidcProvider) {
    let raw = match store.get(SESSION_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "failed to read saved session");
            return;
        }
    };

    let restored = serde_json::from_str::<PersistedSession>(&raw)
        .map_err(|e| e.to_string())
        .and_then(|session| provider.restore_session(session).map_err(|e| e.to_string()));

    if let Err(e) = restored {
        warn!(error = %e, "discarding unreadable saved session");
        let _ = store.remove(SESSION_KEY);
    }
}
