pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod users;
pub mod validation;

use axum::{
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    authenticate, AuthError, AuthService, PasswordService, RequireRole, SessionCookies,
    SessionGate, TokenService, UserStore,
};
use config::AppConfig;
use users::UserService;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::sign_up_handler,
        auth::handlers::sign_in_handler,
        auth::handlers::sign_out_handler,
        auth::handlers::me_handler,
        users::handlers::list_users_handler,
        users::handlers::get_user_handler,
        users::handlers::update_user_handler,
        users::handlers::delete_user_handler,
        users::handlers::set_role_handler,
    ),
    components(
        schemas(
            auth::Role,
            auth::SignUpRequest,
            auth::SignInRequest,
            auth::SessionResponse,
            auth::UserResponse,
            users::UpdateUserRequest,
            users::UpdateRoleRequest,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "auth", description = "Sign-up, sign-in and session endpoints"),
        (name = "users", description = "User management behind role checks")
    ),
    info(
        title = "User API",
        version = "1.0.0",
        description = "User registration, cookie sessions and role-based access control"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub cookies: Arc<SessionCookies>,
    pub gate: SessionGate,
}

impl AppState {
    /// Wire the services around one user store
    pub fn new(
        store: Arc<dyn UserStore>,
        password_service: PasswordService,
        tokens: Arc<TokenService>,
        cookies: Arc<SessionCookies>,
    ) -> Result<Self, AuthError> {
        let auth_service = AuthService::new(store.clone(), password_service.clone(), tokens.clone())?;
        let user_service = UserService::new(store, password_service);

        Ok(Self {
            auth_service: Arc::new(auth_service),
            user_service: Arc::new(user_service),
            gate: SessionGate::new(cookies.clone(), tokens),
            cookies,
        })
    }

    pub fn from_config(config: &AppConfig, store: Arc<dyn UserStore>) -> Result<Self, AuthError> {
        let tokens = Arc::new(TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl));
        // The cookie lives exactly as long as the token it carries
        let cookies = Arc::new(SessionCookies::new(
            config.cookie_secret.as_bytes(),
            tokens.ttl(),
            config.secure_cookies(),
        )?);

        Self::new(store, PasswordService::new(), tokens, cookies)
    }
}

/// GET /health
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Creates and configures the application router
///
/// Every request passes through `authenticate`, which attaches an identity
/// when the session cookie verifies. Admin-only routes add `RequireRole`;
/// the rest decide per handler.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes: Router<AppState> = Router::new()
        .route("/auth/sign-up", post(auth::sign_up_handler))
        .route("/auth/sign-in", post(auth::sign_in_handler))
        .route("/auth/sign-out", post(auth::sign_out_handler))
        .route("/auth/me", get(auth::me_handler));

    let admin_routes: Router<AppState> = Router::new()
        .route("/users", get(users::list_users_handler))
        .route("/users/:id/role", put(users::set_role_handler))
        .route_layer(middleware::from_fn(|req: Request<Body>, next: Next| {
            RequireRole::admin().middleware(req, next)
        }));

    let user_routes: Router<AppState> = Router::new().route(
        "/users/:id",
        get(users::get_user_handler)
            .put(users::update_user_handler)
            .delete(users::delete_user_handler),
    );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(admin_routes)
        .merge(user_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(state.gate.clone(), authenticate)),
        )
        .with_state(state)
}
