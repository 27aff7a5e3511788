// Authentication module
// Argon2 password hashing, HS256 identity tokens carried in a signed session
// cookie, and role-based guards for protected routes

pub mod cookie;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use cookie::SessionCookies;
pub use error::AuthError;
pub use handlers::{me_handler, sign_in_handler, sign_out_handler, sign_up_handler};
pub use middleware::{authenticate, AuthenticatedUser, GateOutcome, RequireRole, SessionGate};
pub use models::{Role, SessionResponse, SignInRequest, SignUpRequest, User, UserResponse};
pub use password::PasswordService;
pub use repository::{InMemoryUserStore, PgUserStore, UserStore};
pub use service::{AuthOutcome, AuthService};
pub use token::{Claims, TokenError, TokenService};
