// Authentication middleware and authorization guards for protected routes

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{cookie::SessionCookies, error::AuthError, models::Role, token::TokenService};

/// Identity attached to a request after its session verified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub role: Role,
}

impl AuthenticatedUser {
    /// Succeeds only when the identity holds exactly `expected`
    pub fn require_role(&self, expected: Role) -> Result<(), AuthError> {
        if self.role != expected {
            return Err(AuthError::Forbidden {
                required: expected,
                actual: self.role,
            });
        }
        Ok(())
    }

    /// Succeeds when the identity owns the resource or is an admin
    pub fn ensure_self_or_admin(&self, owner_id: i32) -> Result<(), AuthError> {
        if self.user_id == owner_id || self.role == Role::Admin {
            return Ok(());
        }
        warn!(
            "User {} denied access to resource owned by user {}",
            self.user_id, owner_id
        );
        Err(AuthError::Forbidden {
            required: Role::Admin,
            actual: self.role,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Result of resolving a request's session
#[derive(Debug)]
pub enum GateOutcome {
    /// No session cookie was presented
    NoToken,
    Verified(AuthenticatedUser),
    /// A session was presented but did not check out
    Rejected(AuthError),
}

/// Turns the session cookie into an identity: cookie MAC first, then token.
#[derive(Clone)]
pub struct SessionGate {
    cookies: Arc<SessionCookies>,
    tokens: Arc<TokenService>,
}

impl SessionGate {
    pub fn new(cookies: Arc<SessionCookies>, tokens: Arc<TokenService>) -> Self {
        Self { cookies, tokens }
    }

    pub fn resolve(&self, headers: &HeaderMap) -> GateOutcome {
        let token = match self.cookies.extract(headers) {
            Ok(Some(token)) => token,
            Ok(None) => return GateOutcome::NoToken,
            Err(e) => return GateOutcome::Rejected(e),
        };

        match self.tokens.verify(&token) {
            Ok(claims) => GateOutcome::Verified(AuthenticatedUser {
                user_id: claims.sub,
                role: claims.role,
            }),
            Err(e) => GateOutcome::Rejected(e.into()),
        }
    }
}

/// Attach the caller's identity to the request when its session verifies.
///
/// Never rejects on its own: a missing or bad session leaves the request
/// unauthenticated and the route's guards decide what that means.
pub async fn authenticate(
    State(gate): State<SessionGate>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match gate.resolve(request.headers()) {
        GateOutcome::Verified(user) => {
            debug!("Request authenticated as user {} ({})", user.user_id, user.role);
            request.extensions_mut().insert(user);
        }
        GateOutcome::Rejected(reason) => {
            warn!(
                "Rejected session on {} {}: {}",
                request.method(),
                request.uri().path(),
                reason
            );
        }
        GateOutcome::NoToken => {}
    }

    next.run(request).await
}

/// Authorization middleware that requires a specific role
///
/// Must run after [`authenticate`]. No identity is a 401, a different role a 403.
#[derive(Debug, Clone)]
pub struct RequireRole {
    required_role: Role,
}

impl RequireRole {
    /// Create a new RequireRole middleware with the specified role requirement
    pub fn new(required_role: Role) -> Self {
        Self { required_role }
    }

    /// Create a middleware that requires Admin role
    pub fn admin() -> Self {
        Self::new(Role::Admin)
    }

    /// Middleware function that validates role-based access
    pub async fn middleware(
        self,
        request: Request<Body>,
        next: Next,
    ) -> Result<Response, AuthError> {
        let endpoint = request.uri().path().to_string();

        let user = request
            .extensions()
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or_else(|| {
                debug!("Unauthenticated request to protected endpoint: {}", endpoint);
                AuthError::Unauthenticated
            })?;

        if let Err(e) = user.require_role(self.required_role) {
            warn!(
                "Authorization failed: user_id={}, required_role={}, actual_role={}, endpoint={}",
                user.user_id, self.required_role, user.role, endpoint
            );
            return Err(e);
        }

        debug!(
            "Authorization successful: user_id={}, role={}, endpoint={}",
            user.user_id, user.role, endpoint
        );
        Ok(next.run(request).await)
    }
}
