use std::sync::Arc;

use super::{Actor, AuthzMode, Permission, PolicyEvaluator};
use crate::errors::{AppError, AppResult};

/// Answers allow/deny for an actor and a permission.
///
/// The gate only reads the precomputed role -> permission mapping, so a denial
/// always happens before a handler touches storage.
#[derive(Clone)]
pub struct Gate {
    evaluator: Arc<dyn PolicyEvaluator>,
    mode: AuthzMode,
}

impl Gate {
    pub fn new(evaluator: impl PolicyEvaluator + 'static, mode: AuthzMode) -> Self {
        Self {
            evaluator: Arc::new(evaluator),
            mode,
        }
    }

    pub fn allows(&self, actor: &Actor, permission: Permission) -> bool {
        let granted = self.evaluator.can(actor, permission);

        match self.mode {
            AuthzMode::Off => true,
            AuthzMode::Advisory => {
                if !granted {
                    tracing::warn!(
                        actor_id = actor.user_id,
                        %permission,
                        "permission denied (advisory mode, request allowed)"
                    );
                }
                true
            }
            AuthzMode::Strict => {
                if !granted {
                    tracing::debug!(actor_id = actor.user_id, %permission, "permission denied");
                }
                granted
            }
        }
    }

    /// Returns `Forbidden` when the actor lacks the permission.
    pub fn authorize(&self, actor: &Actor, permission: Permission) -> AppResult<()> {
        if self.allows(actor, permission) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("missing permission '{}'", permission)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::PermissionStore;

    fn store() -> PermissionStore {
        PermissionStore::new()
            .grant("admin", Permission::ALL)
            .grant("manager", [Permission::AccessClients])
    }

    #[test]
    fn strict_mode_denies_missing_permission() {
        let gate = Gate::new(store(), AuthzMode::Strict);
        let manager = Actor::new(3).with_roles(["manager"]);

        assert!(gate.authorize(&manager, Permission::AccessClients).is_ok());
        let err = gate.authorize(&manager, Permission::DeleteUsers).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn advisory_mode_allows_but_evaluates() {
        let gate = Gate::new(store(), AuthzMode::Advisory);
        let nobody = Actor::new(4);

        assert!(gate.authorize(&nobody, Permission::DeleteUsers).is_ok());
    }

    #[test]
    fn off_mode_allows_everything() {
        let gate = Gate::new(PermissionStore::new(), AuthzMode::Off);
        assert!(gate.allows(&Actor::new(5), Permission::EditUsers));
    }
}
