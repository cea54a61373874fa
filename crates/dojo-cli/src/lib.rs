//! BankDojo Jr. 터미널 프런트엔드.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 역할별 로그인/로그아웃과 역할 선택
//! - 라우트 가드 평가 결과 표시
//! - 상점, 퀘스트, 거래 내역, 방 꾸미기 명령
//! - 서버 상태 확인

pub mod commands;
pub mod context;
pub mod render;

pub use context::AppContext;
