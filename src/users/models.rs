// Request DTOs for user management

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::models::Role;
use crate::validation::validate_not_blank;

/// Partial update of a user's own credentials. Omitted fields are kept.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128), custom = "validate_not_blank")]
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

/// Role assignment, admin only
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}
