//! Password login stub and form validation.
//!
//! There is no server: a password login succeeds whenever the form is valid
//! and yields a stand-in token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TokenLockError};
use crate::session::SessionToken;

/// Per-field problems with the login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginFieldError {
    UsernameRequired,
    PasswordRequired,
    PasswordTooShort { min_length: usize },
}

impl From<LoginFieldError> for TokenLockError {
    fn from(err: LoginFieldError) -> Self {
        match err {
            LoginFieldError::UsernameRequired => TokenLockError::UsernameRequired,
            LoginFieldError::PasswordRequired => TokenLockError::PasswordRequired,
            LoginFieldError::PasswordTooShort { min_length } => {
                TokenLockError::PasswordTooShort(min_length)
            }
        }
    }
}

/// State of the login form after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LoginFormState {
    Valid,
    #[serde(rename_all = "camelCase")]
    Invalid {
        username_error: Option<LoginFieldError>,
        password_error: Option<LoginFieldError>,
    },
}

impl LoginFormState {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

pub fn validate_login_form(username: &str, password: &str, min_password_length: usize) -> LoginFormState {
    let username_error = username
        .trim()
        .is_empty()
        .then_some(LoginFieldError::UsernameRequired);

    let password_error = if password.is_empty() {
        Some(LoginFieldError::PasswordRequired)
    } else if password.chars().count() < min_password_length {
        Some(LoginFieldError::PasswordTooShort {
            min_length: min_password_length,
        })
    } else {
        None
    };

    if username_error.is_none() && password_error.is_none() {
        LoginFormState::Valid
    } else {
        LoginFormState::Invalid {
            username_error,
            password_error,
        }
    }
}

/// Check credentials and issue a stand-in token.
///
/// # Errors
/// The password error wins over the username error when both fields are bad.
pub fn authenticate_password(
    username: &str,
    password: &str,
    min_password_length: usize,
) -> Result<SessionToken> {
    match validate_login_form(username, password, min_password_length) {
        LoginFormState::Valid => Ok(issue_stand_in_token()),
        LoginFormState::Invalid {
            password_error: Some(err),
            ..
        }
        | LoginFormState::Invalid {
            username_error: Some(err),
            ..
        } => Err(err.into()),
        LoginFormState::Invalid { .. } => Err(TokenLockError::UsernameRequired),
    }
}

/// A random token standing in for what a real server would return.
pub fn issue_stand_in_token() -> SessionToken {
    SessionToken::new(Uuid::new_v4().to_string())
}
