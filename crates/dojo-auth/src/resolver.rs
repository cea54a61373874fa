//! 세션/역할 해석기.
//!
//! 신원 제공자 메타데이터와 로컬 저장소 값으로부터 애플리케이션 역할을
//! 도출하고, 역할별 로그인/로그아웃과 토큰 획득을 제공합니다.
//!
//! # 역할 해석 순서
//!
//! 1. 로컬 저장소 값 (`"student"` 또는 `"teacher"`일 때만)
//! 2. 제공자 앱 수준 메타데이터의 `role`
//! 3. 제공자 사용자 수준 메타데이터의 `role`
//! 4. 없음 (역할 선택 필요)
//!
//! 2, 3에서 역할을 얻으면 반환하기 전에 로컬 저장소에 기록합니다.
//! 이후로는 명시적으로 덮어쓰기 전까지 로컬 저장소가 우선합니다.
//!
//! # 캐시 무효화
//!
//! 해석 결과는 사용자 주체 ID별로 캐시됩니다. 다음 신호가 도착하면 캐시를
//! 버리고 다음 [`RoleResolver::current_role`] 호출에서 다시 해석합니다.
//! - 같은 프로세스의 [`RoleAssignmentEvent`]
//! - 다른 컨텍스트의 역할 키 [`StorageEvent`]
//!
//! 두 신호 모두 중복 전달될 수 있으며, 재해석은 멱등합니다. 여러 컨텍스트의
//! 동시 쓰기는 마지막 쓰기가 이깁니다.

use async_trait::async_trait;
use dojo_core::{
    AccessToken, AuthConfig, CoreError, CoreResult, Identity, KeyValueStore, Role,
    RoleAssignmentEvent, RoleNotifier, Session, StorageEvent, TokenSource,
};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::provider::{IdentityProvider, LoginOptions, LoginRedirect, LogoutOptions, LogoutRedirect, AppState};
use crate::{AuthError, AuthResult};

/// 세션과 파생 역할 상태의 스냅샷.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    /// 세션
    pub session: Session,
    /// 해석된 역할
    pub role: Option<Role>,
    /// 역할 선택이 필요한지 여부
    pub needs_role_selection: bool,
}

#[derive(Debug, Clone)]
struct CachedRole {
    subject: Option<String>,
    role: Option<Role>,
}

struct Signals {
    roles: broadcast::Receiver<RoleAssignmentEvent>,
    storage: broadcast::Receiver<StorageEvent>,
}

/// 세션/역할 해석기.
pub struct RoleResolver {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn KeyValueStore>,
    notifier: RoleNotifier,
    config: AuthConfig,
    cache: Mutex<Option<CachedRole>>,
    signals: Mutex<Signals>,
}

impl RoleResolver {
    /// 새 해석기 생성.
    ///
    /// 생성 시점부터 역할 변경 알림과 저장소 변경 알림을 구독합니다.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn KeyValueStore>,
        notifier: RoleNotifier,
        config: AuthConfig,
    ) -> Self {
        let signals = Signals {
            roles: notifier.subscribe(),
            storage: store.subscribe(),
        };
        Self {
            provider,
            store,
            notifier,
            config,
            cache: Mutex::new(None),
            signals: Mutex::new(signals),
        }
    }

    /// 현재 세션 스냅샷.
    pub fn session(&self) -> Session {
        self.provider.session()
    }

    /// 역할 알림 발행자.
    pub fn notifier(&self) -> &RoleNotifier {
        &self.notifier
    }

    /// 현재 역할.
    pub fn current_role(&self) -> Option<Role> {
        self.drain_signals();

        let session = self.provider.session();
        let subject = session.subject_id().map(str::to_string);

        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(cached) = cache.as_ref() {
            if cached.subject == subject {
                return cached.role;
            }
        }

        let role = self.resolve(&session);
        *cache = Some(CachedRole { subject, role });
        role
    }

    /// 학생 역할인지 여부.
    pub fn is_student(&self) -> bool {
        self.current_role() == Some(Role::Student)
    }

    /// 교사 역할인지 여부.
    pub fn is_teacher(&self) -> bool {
        self.current_role() == Some(Role::Teacher)
    }

    /// 인증되었고 신원이 있지만 역할이 없는지 여부.
    pub fn needs_role_selection(&self) -> bool {
        let session = self.provider.session();
        session.is_authenticated && session.identity.is_some() && self.current_role().is_none()
    }

    /// 세션과 파생 상태를 한 번에 조회.
    pub fn snapshot(&self) -> AuthSnapshot {
        let session = self.provider.session();
        let role = self.current_role();
        let needs_role_selection =
            session.is_authenticated && session.identity.is_some() && role.is_none();
        AuthSnapshot {
            session,
            role,
            needs_role_selection,
        }
    }

    /// 역할 지정.
    ///
    /// 로컬 저장소에 기록하고 [`RoleAssignmentEvent`]를 동기적으로 발행합니다.
    /// 반응형 UI 밖의 호출자는 이후 [`current_role`](Self::current_role)을
    /// 다시 호출해 새 값을 읽어야 합니다.
    pub fn set_role(&self, role: Role) -> AuthResult<()> {
        self.store.set(&self.config.role_storage_key, role.as_str())?;
        self.invalidate();
        self.notifier.publish(role);
        info!(role = %role, "role assigned");
        Ok(())
    }

    /// 역할 변경 구독.
    pub fn subscribe(&self) -> broadcast::Receiver<RoleAssignmentEvent> {
        self.notifier.subscribe()
    }

    /// 학생 로그인 시작.
    pub async fn login_as_student(&self) -> AuthResult<LoginRedirect> {
        self.login_as(Role::Student).await
    }

    /// 교사 로그인 시작.
    pub async fn login_as_teacher(&self) -> AuthResult<LoginRedirect> {
        self.login_as(Role::Teacher).await
    }

    /// 역할별 목적지로 로그인 시작. 역할 자체는 지정하지 않습니다.
    async fn login_as(&self, role: Role) -> AuthResult<LoginRedirect> {
        let return_to = match role {
            Role::Student => self.config.student_home.clone(),
            Role::Teacher => self.config.teacher_home.clone(),
        };
        self.provider
            .login_with_redirect(LoginOptions {
                redirect_uri: self.config.redirect_uri.clone(),
                app_state: AppState {
                    return_to: Some(return_to),
                    intended_role: Some(role),
                },
            })
            .await
    }

    /// 로그인 후 `return_to`로 돌아오도록 로그인 시작.
    pub async fn login(&self, return_to: &str) -> AuthResult<LoginRedirect> {
        self.provider
            .login_with_redirect(LoginOptions {
                redirect_uri: self.config.redirect_uri.clone(),
                app_state: AppState {
                    return_to: Some(return_to.to_string()),
                    intended_role: None,
                },
            })
            .await
    }

    /// 로그인 콜백 처리. 로그인 후 이동할 경로를 반환합니다.
    pub async fn handle_redirect_callback(&self, callback_url: &str) -> AuthResult<String> {
        let app_state = self.provider.handle_redirect_callback(callback_url).await?;
        self.invalidate();
        Ok(app_state.return_to.unwrap_or_else(|| "/".to_string()))
    }

    /// 로그아웃. 저장된 역할은 지우지 않습니다.
    pub async fn logout(&self) -> AuthResult<LogoutRedirect> {
        let redirect = self
            .provider
            .logout(LogoutOptions {
                return_to: self.config.logout_return_uri.clone(),
            })
            .await?;
        self.invalidate();
        Ok(redirect)
    }

    /// 접근 토큰을 조용히 요청합니다.
    ///
    /// 실패하면 `None`을 반환하며, 호출자는 인증 없이 진행합니다.
    pub async fn get_access_token(&self) -> Option<AccessToken> {
        match self.provider.get_access_token_silently().await {
            Ok(token) => Some(token),
            Err(AuthError::LoginRequired) => {
                debug!("no session for silent token request");
                None
            }
            Err(e) => {
                warn!(error = %e, "silent token acquisition failed, continuing without token");
                None
            }
        }
    }

    fn invalidate(&self) {
        *self.cache.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    /// 대기 중인 신호를 모두 소비하고, 하나라도 있으면 캐시를 버립니다.
    fn drain_signals(&self) {
        let mut signals = self.signals.lock().unwrap_or_else(|p| p.into_inner());
        let mut stale = false;

        loop {
            match signals.roles.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => stale = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        loop {
            match signals.storage.try_recv() {
                Ok(event) => {
                    let relevant = event
                        .key
                        .as_deref()
                        .map_or(true, |k| k == self.config.role_storage_key);
                    stale |= relevant;
                }
                Err(TryRecvError::Lagged(_)) => stale = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if stale {
            debug!("role cache invalidated");
            self.invalidate();
        }
    }

    fn resolve(&self, session: &Session) -> Option<Role> {
        let key = &self.config.role_storage_key;

        match self.store.get(key) {
            Ok(Some(value)) => match Role::parse(&value) {
                Some(role) => return Some(role),
                None => debug!(value = %value, "ignoring invalid stored role"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read stored role"),
        }

        let identity = session.identity.as_ref()?;
        let (role, source) = metadata_role(identity, &self.config.app_metadata_claim())
            .map(|r| (r, "app_metadata"))
            .or_else(|| {
                metadata_role(identity, &self.config.user_metadata_claim())
                    .map(|r| (r, "user_metadata"))
            })?;

        // 메타데이터 역할을 로컬 저장소에 반영
        if let Err(e) = self.store.set(key, role.as_str()) {
            warn!(error = %e, "failed to mirror metadata role into storage");
        }
        info!(role = %role, source, "role resolved from provider metadata");
        Some(role)
    }
}

/// 메타데이터 클레임 객체의 `role` 값.
fn metadata_role(identity: &Identity, claim: &str) -> Option<Role> {
    identity
        .claim(claim)
        .and_then(|metadata| metadata.get("role"))
        .and_then(|role| role.as_str())
        .and_then(Role::parse)
}

#[async_trait]
impl TokenSource for RoleResolver {
    fn is_authenticated(&self) -> bool {
        self.provider.session().is_authenticated
    }

    async fn access_token(&self) -> CoreResult<Option<AccessToken>> {
        match self.provider.get_access_token_silently().await {
            Ok(token) => Ok(Some(token)),
            Err(AuthError::LoginRequired) => Ok(None),
            Err(e) => Err(CoreError::TokenUnavailable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{InMemoryProvider, TokenScript};
    use dojo_core::MemoryStore;
    use serde_json::json;

    const APP_META: &str = "https://bankdojo.com/app_metadata";
    const USER_META: &str = "https://bankdojo.com/user_metadata";

    fn setup(session: Session) -> (Arc<InMemoryProvider>, Arc<MemoryStore>, RoleResolver) {
        let provider = Arc::new(InMemoryProvider::new(session));
        let store = Arc::new(MemoryStore::new());
        let resolver = RoleResolver::new(
            provider.clone(),
            store.clone(),
            RoleNotifier::new(),
            AuthConfig::default(),
        );
        (provider, store, resolver)
    }

    fn kid(subject: &str) -> Identity {
        Identity::new(subject, "Kid")
    }

    #[test]
    fn test_no_sources_means_no_role() {
        let (_, _, resolver) = setup(Session::authenticated(kid("u1")));
        assert_eq!(resolver.current_role(), None);
        assert!(resolver.needs_role_selection());
    }

    #[test]
    fn test_storage_wins_over_metadata() {
        let identity = kid("u1").with_claim(APP_META, json!({ "role": "student" }));
        let (_, store, resolver) = setup(Session::authenticated(identity));
        store.set("user_role", "teacher").unwrap();

        assert_eq!(resolver.current_role(), Some(Role::Teacher));
        assert!(resolver.is_teacher());
        assert!(!resolver.needs_role_selection());
    }

    #[test]
    fn test_app_metadata_is_mirrored_into_storage() {
        let identity = kid("u1").with_claim(APP_META, json!({ "role": "teacher" }));
        let (_, store, resolver) = setup(Session::authenticated(identity));

        assert_eq!(resolver.current_role(), Some(Role::Teacher));
        assert_eq!(store.get("user_role").unwrap().as_deref(), Some("teacher"));
    }

    #[test]
    fn test_app_metadata_precedes_user_metadata() {
        let identity = kid("u1")
            .with_claim(APP_META, json!({ "role": "teacher" }))
            .with_claim(USER_META, json!({ "role": "student" }));
        let (_, _, resolver) = setup(Session::authenticated(identity));
        assert_eq!(resolver.current_role(), Some(Role::Teacher));
    }

    #[test]
    fn test_user_metadata_used_when_app_metadata_missing() {
        let identity = kid("u1").with_claim(USER_META, json!({ "role": "student" }));
        let (_, store, resolver) = setup(Session::authenticated(identity));
        assert_eq!(resolver.current_role(), Some(Role::Student));
        assert_eq!(store.get("user_role").unwrap().as_deref(), Some("student"));
    }

    #[test]
    fn test_invalid_stored_value_falls_through() {
        let identity = kid("u1").with_claim(APP_META, json!({ "role": "student" }));
        let (_, store, resolver) = setup(Session::authenticated(identity));
        store.set("user_role", "admin").unwrap();

        assert_eq!(resolver.current_role(), Some(Role::Student));
        // 유효한 값으로 덮어씀
        assert_eq!(store.get("user_role").unwrap().as_deref(), Some("student"));
    }

    #[test]
    fn test_current_role_is_idempotent() {
        let identity = kid("u1").with_claim(APP_META, json!({ "role": "student" }));
        let (_, _, resolver) = setup(Session::authenticated(identity));
        let first = resolver.current_role();
        assert_eq!(first, resolver.current_role());
    }

    #[test]
    fn test_set_role_is_visible_immediately() {
        let (_, _, resolver) = setup(Session::authenticated(kid("u1")));
        let mut rx = resolver.subscribe();
        assert_eq!(resolver.current_role(), None);

        resolver.set_role(Role::Student).unwrap();

        assert_eq!(resolver.current_role(), Some(Role::Student));
        assert_eq!(rx.try_recv().unwrap().role, Role::Student);
    }

    #[test]
    fn test_storage_change_from_other_context_invalidates_cache() {
        let provider = Arc::new(InMemoryProvider::new(Session::authenticated(kid("u1"))));
        let tab_a = MemoryStore::new();
        let tab_b = Arc::new(tab_a.open_context());
        let resolver = RoleResolver::new(
            provider,
            tab_b,
            RoleNotifier::new(),
            AuthConfig::default(),
        );

        assert_eq!(resolver.current_role(), None);
        tab_a.set("user_role", "teacher").unwrap();
        assert_eq!(resolver.current_role(), Some(Role::Teacher));
    }

    #[test]
    fn test_switching_user_re_resolves() {
        let (provider, store, resolver) = setup(Session::authenticated(kid("u1")));
        assert_eq!(resolver.current_role(), None);

        // 같은 컨텍스트에서 직접 기록된 값은 신호가 없지만, 사용자가 바뀌면 다시 해석
        store.set("user_role", "student").unwrap();
        provider.set_session(Session::authenticated(kid("u2")));
        assert_eq!(resolver.current_role(), Some(Role::Student));
    }

    #[tokio::test]
    async fn test_logout_keeps_persisted_role() {
        let (provider, store, resolver) = setup(Session::authenticated(kid("u1")));
        resolver.set_role(Role::Teacher).unwrap();

        resolver.logout().await.unwrap();

        assert!(!resolver.session().is_authenticated);
        assert_eq!(store.get("user_role").unwrap().as_deref(), Some("teacher"));
        assert_eq!(provider.logout_requests()[0].return_to, "http://localhost:5173");
    }

    #[tokio::test]
    async fn test_role_specific_login_destinations() {
        let (provider, _, resolver) = setup(Session::anonymous());
        resolver.login_as_student().await.unwrap();
        resolver.login_as_teacher().await.unwrap();

        let logins = provider.login_requests();
        assert_eq!(logins[0].app_state.return_to.as_deref(), Some("/student-dashboard"));
        assert_eq!(logins[0].app_state.intended_role, Some(Role::Student));
        assert_eq!(logins[1].app_state.return_to.as_deref(), Some("/teacher-dashboard"));
        // 로그인 시작만으로 역할이 지정되지는 않음
        assert_eq!(resolver.current_role(), None);
    }

    #[tokio::test]
    async fn test_token_failure_returns_none() {
        let (provider, _, resolver) = setup(Session::authenticated(kid("u1")));
        provider.set_token(TokenScript::Fail("refresh expired".to_string()));
        assert!(resolver.get_access_token().await.is_none());

        provider.set_token(TokenScript::Issue(AccessToken::new("tok", None)));
        assert_eq!(resolver.get_access_token().await.unwrap().expose(), "tok");
    }
}
