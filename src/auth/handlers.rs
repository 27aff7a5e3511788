// HTTP handlers for authentication endpoints

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::auth::{
    error::AuthError,
    middleware::AuthenticatedUser,
    models::{SessionResponse, SignInRequest, SignUpRequest, UserResponse},
    service::AuthOutcome,
};
use crate::error::ErrorResponse;
use crate::AppState;

/// Bind the issued token to the client and build the response body
fn session_response(
    state: &AppState,
    outcome: AuthOutcome,
) -> Result<(HeaderMap, Json<SessionResponse>), AuthError> {
    let mut headers = HeaderMap::new();
    state.cookies.attach(&mut headers, &outcome.token.token)?;

    let body = SessionResponse {
        expires_at: outcome.token.claims.expires_at(),
        user: outcome.user,
    };
    Ok((headers, Json(body)))
}

/// Register a new user
/// POST /auth/sign-up
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created, session cookie set", body = SessionResponse),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn sign_up_handler(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, HeaderMap, Json<SessionResponse>), AuthError> {
    let outcome = state.auth_service.sign_up(request).await?;
    let (headers, body) = session_response(&state, outcome)?;

    Ok((StatusCode::CREATED, headers, body))
}

/// Login a user
/// POST /auth/sign-in
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in, session cookie set", body = SessionResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn sign_in_handler(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<(HeaderMap, Json<SessionResponse>), AuthError> {
    let outcome = state.auth_service.sign_in(request).await?;
    session_response(&state, outcome)
}

/// Clear the session cookie. Succeeds with or without a session.
/// POST /auth/sign-out
#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "auth"
)]
pub async fn sign_out_handler(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
) -> (StatusCode, HeaderMap) {
    state.auth_service.sign_out(user.as_ref());

    let mut headers = HeaderMap::new();
    state.cookies.clear(&mut headers);
    (StatusCode::NO_CONTENT, headers)
}

/// Get current user information (protected endpoint)
/// GET /auth/me
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The signed-in user", body = UserResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, AuthError> {
    let me = state.auth_service.current_user(user.user_id).await?;
    Ok(Json(me))
}
