use std::collections::{HashMap, HashSet};

use sqlx::{Row, SqlitePool};

use super::{Actor, Permission};
use crate::errors::{AppError, AppResult};

/// Pluggable capability check used by the [`Gate`](super::Gate).
pub trait PolicyEvaluator: Send + Sync {
    /// Whether the actor holds the permission through any of its roles.
    fn can(&self, actor: &Actor, permission: Permission) -> bool;
}

/// Precomputed role -> permission set mapping.
#[derive(Debug, Clone, Default)]
pub struct PermissionStore {
    grants: HashMap<String, HashSet<Permission>>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by tests and seeding to describe a catalog in code.
    pub fn grant(mut self, role: &str, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.grants
            .entry(role.to_string())
            .or_default()
            .extend(permissions);
        self
    }

    /// Load the catalog from the database.
    ///
    /// Fails with a configuration error when a stored permission name has no
    /// [`Permission`] variant, or when a variant is missing from the catalog.
    pub async fn load(pool: &SqlitePool) -> AppResult<Self> {
        let catalog: Vec<String> = sqlx::query_scalar("SELECT name FROM permissions ORDER BY id")
            .fetch_all(pool)
            .await?;

        let mut known = HashSet::new();
        for name in &catalog {
            let permission = name
                .parse::<Permission>()
                .map_err(|err| AppError::configuration(err.to_string()))?;
            known.insert(permission);
        }
        if let Some(missing) = Permission::ALL.iter().find(|p| !known.contains(p)) {
            return Err(AppError::configuration(format!(
                "permission '{}' is missing from the permission catalog",
                missing
            )));
        }

        let rows = sqlx::query(
            r#"
            SELECT r.name AS role, p.name AS permission
            FROM roles r
            LEFT JOIN role_permissions rp ON rp.role_id = r.id
            LEFT JOIN permissions p ON p.id = rp.permission_id
            ORDER BY r.id
            "#,
        )
        .fetch_all(pool)
        .await?;

        let mut store = PermissionStore::new();
        for row in rows {
            let role: String = row.try_get("role")?;
            let permission: Option<String> = row.try_get("permission")?;
            let entry = store.grants.entry(role).or_default();
            if let Some(name) = permission {
                let permission = name
                    .parse::<Permission>()
                    .map_err(|err| AppError::configuration(err.to_string()))?;
                entry.insert(permission);
            }
        }

        tracing::info!(roles = store.grants.len(), "permission store loaded");
        Ok(store)
    }

    pub fn role_grants(&self, role: &str, permission: Permission) -> bool {
        self.grants
            .get(role)
            .map(|set| set.contains(&permission))
            .unwrap_or(false)
    }

    /// Typed capability check: true iff any of the actor's roles grants it.
    /// Roles the store does not know grant nothing.
    pub fn actor_has_permission(&self, actor: &Actor, permission: Permission) -> bool {
        actor.roles.iter().any(|role| self.role_grants(role, permission))
    }
}

impl PolicyEvaluator for PermissionStore {
    fn can(&self, actor: &Actor, permission: Permission) -> bool {
        self.actor_has_permission(actor, permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PermissionStore {
        PermissionStore::new()
            .grant("admin", Permission::ALL)
            .grant(
                "manager",
                [Permission::AccessClients, Permission::EditClients],
            )
            .grant("user", [Permission::AccessProjects])
    }

    #[test]
    fn permission_resolves_through_any_role() {
        let store = catalog();
        let actor = Actor::new(1).with_roles(["user", "manager"]);

        assert!(store.actor_has_permission(&actor, Permission::EditClients));
        assert!(!store.actor_has_permission(&actor, Permission::DeleteClients));
    }

    #[test]
    fn admin_holds_every_permission() {
        let store = catalog();
        let actor = Actor::new(1).with_roles(["admin"]);

        for permission in Permission::ALL {
            assert!(store.can(&actor, permission));
        }
    }

    #[test]
    fn unknown_role_and_no_role_grant_nothing() {
        let store = catalog();

        assert!(!store.actor_has_permission(&Actor::new(1), Permission::AccessUsers));
        let ghost = Actor::new(2).with_roles(["ghost"]);
        assert!(!store.actor_has_permission(&ghost, Permission::AccessUsers));
    }
}
