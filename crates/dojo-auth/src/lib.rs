//! 인증 및 역할 기반 접근 제어.
//!
//! 신원 제공자가 공급하는 세션 위에 애플리케이션 역할(학생/교사)을 얹고,
//! 보호된 페이지의 렌더링 여부를 결정합니다.
//!
//! # 구성 요소
//!
//! - [`IdentityProvider`]: 외부 신원 제공자 경계 (OIDC, 메모리)
//! - [`RoleResolver`]: 역할 해석, 역할 지정, 로그인/로그아웃, 토큰 획득
//! - [`RouteGuard`]: 세션과 역할로부터 페이지 접근 결과 결정
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! let resolver = RoleResolver::new(provider, store, RoleNotifier::new(), config.auth.clone());
//! let guard = RouteGuard::new(&config.routes);
//!
//! match guard.check(&resolver, Some(Role::Teacher), "/teacher-dashboard") {
//!     GuardOutcome::Granted => render_dashboard(),
//!     other => render_placeholder(other),
//! }
//! ```

pub mod error;
pub mod guard;
pub mod provider;
pub mod resolver;

pub use error::{AuthError, AuthResult};
pub use guard::{GuardAction, GuardOutcome, RouteGuard};
pub use provider::{
    AppState, IdentityProvider, InMemoryProvider, LoginOptions, LoginRedirect, LogoutOptions,
    LogoutRedirect, OidcConfig, OidcProvider, PersistedSession, TokenScript,
};
pub use resolver::{AuthSnapshot, RoleResolver};
