//! Access decisions
//!
//! One rule governs every protected operation: admins pass, everyone else
//! needs a role tag in common with the allow-list for the operation.

use crate::auth::Claims;
use crate::db::schemas::ContentTypeDoc;
use crate::types::{FolioError, Result};

/// Verified identity of the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// User id (hex)
    pub subject: String,
    pub username: String,
    pub roles: Vec<String>,
    pub admin: bool,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            username: claims.username,
            roles: claims.roles,
            admin: claims.admin,
        }
    }
}

impl Caller {
    fn shares_role(&self, allowed: &[String]) -> bool {
        self.roles.iter().any(|role| allowed.contains(role))
    }
}

/// Admin bypass, else role-list intersection
pub struct AccessGate;

impl AccessGate {
    /// Whether `caller` may invoke `method` on content of `content_type`
    pub fn allow(caller: &Caller, method: &str, content_type: &ContentTypeDoc) -> bool {
        caller.admin || caller.shares_role(content_type.roles_for(method))
    }

    /// [`AccessGate::allow`] as a `Result`
    pub fn authorize(caller: &Caller, method: &str, content_type: &ContentTypeDoc) -> Result<()> {
        if Self::allow(caller, method, content_type) {
            Ok(())
        } else {
            Err(FolioError::Unauthorized(format!(
                "{} may not {} {}",
                caller.username,
                method.to_ascii_uppercase(),
                content_type.collection
            )))
        }
    }

    /// Only admins
    pub fn require_admin(caller: &Caller) -> Result<()> {
        if caller.admin {
            Ok(())
        } else {
            Err(FolioError::Unauthorized("admin role required".into()))
        }
    }

    /// The user identified by `target_id`, or an admin
    pub fn require_self_or_admin(caller: &Caller, target_id: &str) -> Result<()> {
        if caller.admin || caller.subject == target_id {
            Ok(())
        } else {
            Err(FolioError::Unauthorized(
                "only the account owner or an admin may do this".into(),
            ))
        }
    }
}
