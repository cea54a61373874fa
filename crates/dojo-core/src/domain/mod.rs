//! 도메인 모델.

mod role;
mod session;
mod token;

pub use role::{Role, RoleAssignmentEvent};
pub use session::{ErrorInfo, Identity, Session};
pub use token::{AccessToken, TokenSource};
