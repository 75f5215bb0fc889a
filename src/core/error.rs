//! Errors returned across the repository boundary.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DealError {
    #[error("No user logged in")]
    Unauthenticated,

    #[error("Invalid deal: {0}")]
    Invalid(String),

    #[error("{0}")]
    Store(String),
}

impl DealError {
    /// Flattens a provider error chain into a store failure message.
    pub fn store(err: &anyhow::Error) -> Self {
        DealError::Store(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, DealError>;

/// Sign-in and sign-up failures the CLI reports to the user.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("This email is already registered, please sign in")]
    AlreadyRegistered,

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Request(#[from] anyhow::Error),
}
