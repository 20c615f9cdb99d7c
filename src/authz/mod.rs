//! Authorization: typed permissions, the role -> permission store and the gate.
//!
//! Permissions are an explicit enum so an unknown capability can never reach a
//! check at runtime. The store is loaded from the `roles`/`permissions` tables
//! once at startup and rejects permission names it does not recognise.

mod actor;
mod gate;
mod store;

pub use actor::Actor;
pub use gate::Gate;
pub use store::{PermissionStore, PolicyEvaluator};

use std::fmt;
use std::str::FromStr;

/// Authorization enforcement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthzMode {
    /// No permission checks (development mode)
    Off,
    /// Log denials but allow requests
    Advisory,
    /// Enforce 403 on denied requests
    #[default]
    Strict,
}

impl AuthzMode {
    pub fn from_env() -> Self {
        match std::env::var("AUTHZ_MODE").unwrap_or_default().to_lowercase().as_str() {
            "off" => AuthzMode::Off,
            "advisory" => AuthzMode::Advisory,
            _ => AuthzMode::Strict,
        }
    }
}

/// Well-known role names
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const MANAGER: &str = "manager";
    pub const USER: &str = "user";
}

/// A named capability granted to roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    AccessUsers,
    CreateUsers,
    EditUsers,
    DeleteUsers,
    AccessClients,
    CreateClients,
    EditClients,
    DeleteClients,
    AccessProjects,
    CreateProjects,
    EditProjects,
    DeleteProjects,
    AccessTasks,
    CreateTasks,
    EditTasks,
    DeleteTasks,
}

impl Permission {
    pub const ALL: [Permission; 16] = [
        Permission::AccessUsers,
        Permission::CreateUsers,
        Permission::EditUsers,
        Permission::DeleteUsers,
        Permission::AccessClients,
        Permission::CreateClients,
        Permission::EditClients,
        Permission::DeleteClients,
        Permission::AccessProjects,
        Permission::CreateProjects,
        Permission::EditProjects,
        Permission::DeleteProjects,
        Permission::AccessTasks,
        Permission::CreateTasks,
        Permission::EditTasks,
        Permission::DeleteTasks,
    ];

    /// The catalog name stored in the `permissions` table.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::AccessUsers => "access users",
            Permission::CreateUsers => "create users",
            Permission::EditUsers => "edit users",
            Permission::DeleteUsers => "delete users",
            Permission::AccessClients => "access clients",
            Permission::CreateClients => "create clients",
            Permission::EditClients => "edit clients",
            Permission::DeleteClients => "delete clients",
            Permission::AccessProjects => "access projects",
            Permission::CreateProjects => "create projects",
            Permission::EditProjects => "edit projects",
            Permission::DeleteProjects => "delete projects",
            Permission::AccessTasks => "access tasks",
            Permission::CreateTasks => "create tasks",
            Permission::EditTasks => "edit tasks",
            Permission::DeleteTasks => "delete tasks",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|permission| permission.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}
