// User management: CRUD over stored users behind role checks

pub mod handlers;
pub mod models;
pub mod service;

pub use handlers::*;
pub use models::{UpdateRoleRequest, UpdateUserRequest};
pub use service::UserService;
