use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

use crate::auth::{
    middleware::AuthenticatedUser, models::Role, models::UserResponse, password::PasswordService,
    repository::UserStore,
};
use crate::error::ApiError;
use crate::users::models::UpdateUserRequest;
use crate::validation::normalize_email;

fn user_not_found(id: i32) -> ApiError {
    debug!("User with id {} not found", id);
    ApiError::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// Service layer for user management
///
/// Every operation takes the acting identity. Ownership is checked before the
/// target is looked up, so a non-admin learns nothing about other ids.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    password_service: PasswordService,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, password_service: PasswordService) -> Self {
        Self {
            store,
            password_service,
        }
    }

    /// List all users (admin only)
    pub async fn list_users(&self, actor: &AuthenticatedUser) -> Result<Vec<UserResponse>, ApiError> {
        actor.require_role(Role::Admin)?;

        let users = self.store.list().await?;
        debug!("Retrieved {} users", users.len());
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn get_user(&self, actor: &AuthenticatedUser, id: i32) -> Result<UserResponse, ApiError> {
        actor.ensure_self_or_admin(id)?;

        self.store
            .find_by_id(id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| user_not_found(id))
    }

    /// Update email and/or password
    ///
    /// A new password is strength-checked and re-hashed; the stored hash is
    /// the only thing persisted.
    pub async fn update_user(
        &self,
        actor: &AuthenticatedUser,
        id: i32,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ApiError> {
        actor.ensure_self_or_admin(id)?;
        request.validate()?;

        if request.is_empty() {
            return self.get_user(actor, id).await;
        }

        let password_hash = match request.password {
            Some(password) => {
                PasswordService::validate_password_strength(&password)?;
                Some(self.password_service.hash_password_async(password).await?)
            }
            None => None,
        };
        let email = request.email.as_deref().map(normalize_email);

        let updated = self
            .store
            .update_credentials(id, email, password_hash)
            .await?
            .ok_or_else(|| user_not_found(id))?;

        info!("User {} updated by user {}", id, actor.user_id);
        Ok(updated.into())
    }

    pub async fn delete_user(&self, actor: &AuthenticatedUser, id: i32) -> Result<(), ApiError> {
        actor.ensure_self_or_admin(id)?;

        if !self.store.delete(id).await? {
            return Err(user_not_found(id));
        }

        info!("User {} deleted by user {}", id, actor.user_id);
        Ok(())
    }

    /// Assign a role (admin only)
    ///
    /// Tokens already issued to the target keep their old role until they
    /// expire; the new role appears from the next sign-in.
    pub async fn set_role(
        &self,
        actor: &AuthenticatedUser,
        id: i32,
        role: Role,
    ) -> Result<UserResponse, ApiError> {
        actor.require_role(Role::Admin)?;

        let updated = self
            .store
            .update_role(id, role)
            .await?
            .ok_or_else(|| user_not_found(id))?;

        info!("User {} assigned role '{}' by admin {}", id, role, actor.user_id);
        Ok(updated.into())
    }
}
