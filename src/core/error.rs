//! Ingestion errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The parent device is switched off. Nothing gets created or updated.
    #[error("device `{0}` is disabled")]
    Disabled(String),

    /// The parent device or an entity has disappeared from the store.
    #[error("{0} is not found")]
    NotFound(String),

    /// A field is missing or does not hold a number. Only the affected sensor is skipped.
    #[error("could not convert `{field}`: {reason}")]
    Conversion { field: String, reason: String },

    #[error("store operation has failed: {0}")]
    Store(#[from] rusqlite::Error),
}

pub type Result<T = ()> = std::result::Result<T, Error>;

impl Error {
    pub fn conversion<F: Into<String>, R: ToString>(field: F, reason: R) -> Self {
        Self::Conversion {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    /// Tells whether the error is a parent-level condition that skips the whole ingestion cycle.
    pub fn skips_cycle(&self) -> bool {
        matches!(self, Self::Disabled(_) | Self::NotFound(_))
    }
}
