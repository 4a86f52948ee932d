//! Identity gateway contract.
//!
//! Authentication happens outside the engine. The engine only asks whether
//! an already-authenticated principal is known and whether it holds the
//! administrator role.

use crate::PrincipalId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IdentityError {
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

pub trait IdentityGateway: Send + Sync {
    fn exists(&self, principal: &PrincipalId) -> Result<bool, IdentityError>;
    fn is_admin(&self, principal: &PrincipalId) -> Result<bool, IdentityError>;
}
