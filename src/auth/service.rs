// Authentication service - business logic layer

use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::auth::{
    error::AuthError,
    middleware::AuthenticatedUser,
    models::{NewUser, Role, SignInRequest, SignUpRequest, UserResponse},
    password::PasswordService,
    repository::UserStore,
    token::{IssuedToken, TokenService},
};
use crate::validation::normalize_email;

/// Result of a successful sign-up or sign-in
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: UserResponse,
    pub token: IssuedToken,
}

/// Authentication service coordinating all auth operations
pub struct AuthService {
    store: Arc<dyn UserStore>,
    password_service: PasswordService,
    token_service: Arc<TokenService>,
    // Verified against when the email is unknown so both sign-in failures cost the same
    dummy_hash: String,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        store: Arc<dyn UserStore>,
        password_service: PasswordService,
        token_service: Arc<TokenService>,
    ) -> Result<Self, AuthError> {
        let dummy_hash = password_service.hash_password("dummy-password-for-timing")?;

        Ok(Self {
            store,
            password_service,
            token_service,
            dummy_hash,
        })
    }

    /// Register a new user
    ///
    /// Always creates a `user`-role record; a requested role is ignored.
    /// Performs exactly one store write, and none when the email is taken or
    /// hashing fails.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<AuthOutcome, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        PasswordService::validate_password_strength(&request.password)?;

        if let Some(requested) = request.role {
            if requested != Role::User {
                warn!("Sign-up requested role '{}'; assigning '{}'", requested, Role::User);
            }
        }

        let email = normalize_email(&request.email);
        if self.store.find_by_email(&email).await?.is_some() {
            warn!("Sign-up rejected: identifier already registered");
            return Err(AuthError::DuplicateIdentifier);
        }

        let password_hash = self
            .password_service
            .hash_password_async(request.password)
            .await?;

        // The store's uniqueness constraint still decides races between concurrent sign-ups
        let user = self
            .store
            .insert(NewUser {
                email,
                password_hash,
                role: Role::User,
            })
            .await
            .map_err(|e| {
                if matches!(e, AuthError::DuplicateIdentifier) {
                    warn!("Sign-up rejected by store: identifier already registered");
                }
                e
            })?;

        let token = self.token_service.issue(user.id, user.role)?;
        info!("User {} signed up", user.id);

        Ok(AuthOutcome {
            user: user.into(),
            token,
        })
    }

    /// Login a user
    ///
    /// Unknown email and wrong password both return `InvalidCredentials`, and
    /// both run one Argon2 verification. Read-only.
    pub async fn sign_in(&self, request: SignInRequest) -> Result<AuthOutcome, AuthError> {
        request
            .validate()
            .map_err(|_| AuthError::InvalidCredentials)?;

        let email = normalize_email(&request.email);
        let user = self.store.find_by_email(&email).await?;

        let hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let password_matches = self
            .password_service
            .verify_password_async(request.password, hash)
            .await;

        let user = match user {
            Some(user) if password_matches => user,
            Some(user) => {
                debug!("Sign-in failed for user {}: wrong password", user.id);
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                debug!("Sign-in failed: unknown identifier");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = self.token_service.issue(user.id, user.role)?;
        info!("User {} signed in", user.id);

        Ok(AuthOutcome {
            user: user.into(),
            token,
        })
    }

    /// Sign out
    ///
    /// Tokens are stateless, so there is nothing to revoke server-side. The
    /// caller clears the session cookie; a copied token stays valid until it
    /// expires.
    pub fn sign_out(&self, identity: Option<&AuthenticatedUser>) {
        match identity {
            Some(user) => info!("User {} signed out", user.user_id),
            None => debug!("Sign-out without an active session"),
        }
    }

    /// Get current user information
    ///
    /// A valid token whose user no longer exists is treated as unauthenticated.
    pub async fn current_user(&self, user_id: i32) -> Result<UserResponse, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| {
                warn!("Token subject {} no longer exists", user_id);
                AuthError::Unauthenticated
            })
    }

    /// Make sure `email` exists with the admin role, creating it if needed.
    ///
    /// Used at startup to seed the first administrator; this is the only path
    /// besides an admin's role change that produces an admin account.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<UserResponse, AuthError> {
        PasswordService::validate_password_strength(password)?;
        let email = normalize_email(email);

        let user = match self.store.find_by_email(&email).await? {
            Some(existing) if existing.role == Role::Admin => existing,
            Some(existing) => self
                .store
                .update_role(existing.id, Role::Admin)
                .await?
                .ok_or_else(|| {
                    AuthError::StoreUnavailable(format!("user {} vanished during promotion", existing.id))
                })?,
            None => {
                let password_hash = self
                    .password_service
                    .hash_password_async(password.to_string())
                    .await?;
                self.store
                    .insert(NewUser {
                        email,
                        password_hash,
                        role: Role::Admin,
                    })
                    .await?
            }
        };

        info!("Administrator account {} is ready", user.id);
        Ok(user.into())
    }
}
