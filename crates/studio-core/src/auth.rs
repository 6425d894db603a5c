//! # Capabilities
//!
//! Roles and the permission object handed to every command handler.
//!
//! There is no ambient "current user": callers build a [`Capabilities`]
//! from the authenticated session and pass it in explicitly. The tenant in
//! it scopes every read and write the handler performs.
//!
//! ```text
//! Role           can_edit   is_admin
//! ─────────────  ─────────  ─────────
//! Admin          ✓          ✓
//! Operator       ✓
//! Viewer
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// A role granted to a user inside a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access, including cost configuration and materials.
    Admin,
    /// Day-to-day operation: orders, status, stock.
    #[serde(rename = "OPERADOR")]
    Operator,
    /// Read-only.
    #[serde(rename = "VISUALIZADOR")]
    Viewer,
}

/// What the calling user may do, and in which tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Capabilities {
    pub user_id: String,
    pub tenant_id: String,
    pub roles: Vec<Role>,
}

impl Capabilities {
    pub fn new(user_id: impl Into<String>, tenant_id: impl Into<String>, roles: Vec<Role>) -> Self {
        Capabilities {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            roles,
        }
    }

    #[inline]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Admins and operators may edit.
    #[inline]
    pub fn can_edit(&self) -> bool {
        self.is_admin() || self.has_role(Role::Operator)
    }

    /// Fails with [`CoreError::Forbidden`] unless the user may edit.
    pub fn require_edit(&self, action: &str) -> CoreResult<()> {
        if self.can_edit() {
            Ok(())
        } else {
            Err(CoreError::forbidden(&self.user_id, action))
        }
    }

    /// Fails with [`CoreError::Forbidden`] unless the user is an admin.
    pub fn require_admin(&self, action: &str) -> CoreResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::forbidden(&self.user_id, action))
        }
    }
}
