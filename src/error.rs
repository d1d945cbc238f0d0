//! Crate-level error
//!
//! Wraps the failures of the one-call entry points that look a schema up by
//! name before validating.

use thiserror::Error;

use crate::schema::SchemaError;
use crate::settings::SettingsError;
use crate::validate::ValidationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Schema(e) => e.code(),
            Error::Validation(_) => "AERO_VALIDATION_FAILED",
            Error::Settings(e) => e.code(),
        }
    }

    /// Issues of a failed validation, if that is what this is
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(e) => Some(e),
            Error::Settings(SettingsError::Validation(e)) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
