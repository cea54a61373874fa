//! # Dojo Core
//!
//! BankDojo Jr. 클라이언트의 핵심 도메인 타입과 공통 인프라를 제공합니다.
//!
//! 이 크레이트는 다른 크레이트 전반에서 사용되는 기본 요소를 제공합니다:
//! - 역할(학생/교사) 및 세션/신원 모델
//! - 접근 토큰 및 토큰 공급자 trait
//! - 키-값 영속 저장소 경계 (메모리/파일)
//! - 역할 변경 알림 채널
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod notifier;
pub mod storage;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use notifier::*;
pub use storage::*;
