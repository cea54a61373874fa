//! 애플리케이션 역할.
//!
//! 인증 신원과 별개인 권한 계층 (학생/교사).

use serde::{Deserialize, Serialize};

/// 사용자 역할.
///
/// 세션당 하나의 값만 가집니다. 역할이 없는 상태(미지정)는 `Option<Role>`의
/// `None`으로 표현합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 학생 - 퀘스트 수행, 상점 구매, 방 꾸미기
    Student,
    /// 교사 - 반 관리, 퀘스트 생성
    Teacher,
}

impl Role {
    /// 모든 역할.
    pub const ALL: [Role; 2] = [Role::Student, Role::Teacher];

    /// 저장소/전송용 문자열 반환.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    /// 화면 표시용 이름 반환.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
        }
    }

    /// 문자열에서 역할 파싱.
    ///
    /// 저장소 값은 정확히 `"student"` 또는 `"teacher"`여야 하며, 그 외 값은
    /// 역할이 없는 것으로 취급합니다.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(&s.to_lowercase()).ok_or_else(|| format!("Unknown role: {}", s))
    }
}

/// 역할 변경 알림.
///
/// 같은 실행 컨텍스트의 다른 구성 요소가 파생 상태를 다시 계산하도록
/// 새 역할만 싣고 전파됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignmentEvent {
    /// 새로 지정된 역할
    pub role: Role,
}
