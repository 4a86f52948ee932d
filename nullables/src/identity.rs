//! Nullable identity gateway.

use roadwatch_types::{IdentityError, IdentityGateway, PrincipalId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// In-memory identity gateway.
///
/// Either permissive (every principal exists) or restricted to an explicit
/// set. Admins are always explicit. Can be switched to fail every lookup.
pub struct NullIdentity {
    permissive: bool,
    principals: RwLock<HashSet<String>>,
    admins: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
}

impl NullIdentity {
    /// Every principal resolves; nobody is an admin.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            principals: RwLock::new(HashSet::new()),
            admins: RwLock::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Only the listed principals resolve.
    pub fn with_principals(ids: &[&str]) -> Self {
        Self {
            permissive: false,
            principals: RwLock::new(ids.iter().map(|s| s.to_string()).collect()),
            admins: RwLock::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn add_principal(&self, id: &str) {
        self.principals.write().unwrap().insert(id.to_string());
    }

    /// Grant the admin role. Admins always resolve.
    pub fn add_admin(&self, id: &str) {
        self.admins.write().unwrap().insert(id.to_string());
        self.add_principal(id);
    }

    /// Make every lookup fail with [`IdentityError::Unavailable`].
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn check_up(&self) -> Result<(), IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(IdentityError::Unavailable("null identity switched off".into()))
        } else {
            Ok(())
        }
    }
}

impl IdentityGateway for NullIdentity {
    fn exists(&self, principal: &PrincipalId) -> Result<bool, IdentityError> {
        self.check_up()?;
        Ok(self.permissive || self.principals.read().unwrap().contains(principal.as_str()))
    }

    fn is_admin(&self, principal: &PrincipalId) -> Result<bool, IdentityError> {
        self.check_up()?;
        Ok(self.admins.read().unwrap().contains(principal.as_str()))
    }
}
