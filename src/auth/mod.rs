//! Authentication
//!
//! - Password hashing and verification (bcrypt)
//! - Opaque bearer tokens, stored server-side as SHA-256 hashes
//! - Middleware resolving the bearer header to the current user, plus role guards
//! - Login / logout handlers

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod tokens;

pub use middleware::{authenticate, require_admin, require_user, AdminUser, AuthUser, CurrentUser};
pub use password::{hash_password, verify_password};
pub use tokens::{generate_token, hash_token, SCOPE_AUTHENTICATION};
