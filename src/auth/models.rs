//! Authentication request/response models

use crate::db::models::Token;
use serde::{Deserialize, Serialize};

/// Body of POST /tokens/authentication
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthTokenResponse {
    pub auth_token: Token,
}
