//! Identity gateway backed by the `[identity]` config section.

use crate::config::IdentityConfig;
use roadwatch_types::{IdentityError, IdentityGateway, PrincipalId};
use std::collections::HashSet;

/// Fixed principal and admin lists read at startup.
pub struct StaticIdentityGateway {
    permissive: bool,
    principals: HashSet<String>,
    admins: HashSet<String>,
}

impl StaticIdentityGateway {
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self {
            permissive: config.permissive,
            principals: config.principals.iter().map(|p| p.trim().to_string()).collect(),
            admins: config.admins.iter().map(|p| p.trim().to_string()).collect(),
        }
    }
}

impl IdentityGateway for StaticIdentityGateway {
    fn exists(&self, principal: &PrincipalId) -> Result<bool, IdentityError> {
        let id = principal.as_str();
        Ok(self.permissive || self.principals.contains(id) || self.admins.contains(id))
    }

    fn is_admin(&self, principal: &PrincipalId) -> Result<bool, IdentityError> {
        Ok(self.admins.contains(principal.as_str()))
    }
}
