//! 역할 변경 알림 채널.
//!
//! 같은 프로세스의 구독자에게 [`RoleAssignmentEvent`]를 전파합니다.
//! 알림은 중복 전달될 수 있으므로 구독자는 재계산을 멱등하게 처리해야 합니다.

use tokio::sync::broadcast;
use tracing::debug;

use crate::{Role, RoleAssignmentEvent};

/// 기본 채널 버퍼 크기.
const DEFAULT_CAPACITY: usize = 16;

/// 역할 변경 발행자.
///
/// 복제본은 같은 채널을 공유합니다.
#[derive(Debug, Clone)]
pub struct RoleNotifier {
    tx: broadcast::Sender<RoleAssignmentEvent>,
}

impl RoleNotifier {
    /// 새 알림 채널 생성.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { tx }
    }

    /// 역할 변경 발행.
    ///
    /// 수신자 수를 반환합니다. 구독자가 없어도 실패가 아닙니다.
    pub fn publish(&self, role: Role) -> usize {
        let delivered = self.tx.send(RoleAssignmentEvent { role }).unwrap_or(0);
        debug!(role = %role, receivers = delivered, "role assignment published");
        delivered
    }

    /// 역할 변경 구독.
    pub fn subscribe(&self) -> broadcast::Receiver<RoleAssignmentEvent> {
        self.tx.subscribe()
    }

    /// 현재 구독자 수.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}
