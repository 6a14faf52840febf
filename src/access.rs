//! Read access to stored files.
//!
//! Public files are readable by anyone. Private files need the permission
//! named in `[files] private_permission`. Derivatives are checked against
//! their **original**: an account that cannot read the original cannot read
//! any of its styles either.

use crate::config::FilesConfig;
use crate::file::FileUri;
use std::collections::BTreeSet;

/// The requester, reduced to what access checks need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    name: Option<String>,
    permissions: BTreeSet<String>,
}

impl Account {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Decides whether an account may read a file.
pub trait FileAccess: Sync {
    fn can_read(&self, uri: &FileUri, account: &Account) -> bool;
}

/// Schemes that require authorization need one permission; others are open.
#[derive(Debug, Clone)]
pub struct PermissionAccess {
    permission: String,
}

impl PermissionAccess {
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }

    pub fn from_config(files: &FilesConfig) -> Self {
        Self::new(files.private_permission.clone())
    }
}

impl FileAccess for PermissionAccess {
    fn can_read(&self, uri: &FileUri, account: &Account) -> bool {
        !uri.scheme().requires_authorization() || account.has_permission(&self.permission)
    }
}
