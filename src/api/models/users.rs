use crate::core::error::{AppError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

pub const MAX_USERNAME_LEN: usize = 50;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

fn invalid(message: &str) -> AppError {
    AppError::ValidationError(message.to_string())
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(invalid("username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(invalid("username cannot be greater than 50 characters"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(invalid("email is required"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(invalid("invalid email format"));
    }
    Ok(())
}

/// Body for POST /users and POST /admins
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterUserRequest {
    pub fn validate(&self) -> Result<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(invalid("password is required"));
        }
        Ok(())
    }
}

/// Body for PATCH /me
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// `?username=` query of GET /users
#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: Option<String>,
}
