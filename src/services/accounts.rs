//! Account registration and login.
//!
//! Thin stateless functions over the user repository. Identity tokens are
//! minted elsewhere; this module only establishes who the credentials
//! belong to.

use serde::Deserialize;

use crate::api::{NewUser, Role, User, UserId};
use crate::db::repository::{RepositoryError, UserRepository};
use crate::services::password;

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// Registration payload as received from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub name: String,
}

/// A successful login, ready to hand to the identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub user_id: UserId,
    pub role: Role,
    pub name: String,
}

/// Errors produced by the accounts service.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Malformed registration input (HTTP 400).
    #[error("validation error: {0}")]
    Validation(String),

    /// The email is already registered (HTTP 409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unknown email or wrong password (HTTP 401). Deliberately does not
    /// say which.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Storage failure.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { .. } => AccountError::Conflict(err.to_string()),
            RepositoryError::Validation { .. } => AccountError::Validation(err.to_string()),
            other => AccountError::Repository(other),
        }
    }
}

/// Register a new account.
///
/// Emails are normalized to lowercase; uniqueness is enforced by the
/// repository.
pub async fn register(
    repository: &dyn UserRepository,
    request: RegisterRequest,
) -> Result<User, AccountError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AccountError::Validation(format!(
            "'{}' is not a valid email address",
            request.email
        )));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AccountError::Validation("name must not be empty".to_string()));
    }

    let user = repository
        .create_user(NewUser {
            email,
            password_hash: password::hash_password(&request.password),
            role: request.role,
            name: name.to_string(),
        })
        .await?;

    log::info!("registered {} account {} ({})", user.role, user.id, user.email);
    Ok(user)
}

/// Check credentials and return the account they belong to.
pub async fn login(
    repository: &dyn UserRepository,
    email: &str,
    password_plain: &str,
) -> Result<LoginOutcome, AccountError> {
    let email = email.trim().to_lowercase();
    let user = repository
        .find_user_by_email(&email)
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

    if !password::verify_password(password_plain, &user.password_hash) {
        return Err(AccountError::InvalidCredentials);
    }

    Ok(LoginOutcome {
        user_id: user.id,
        role: user.role,
        name: user.name,
    })
}
