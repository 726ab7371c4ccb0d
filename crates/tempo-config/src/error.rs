//! Errors raised while loading Tempo settings.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A TOML file, `.env` entry or `TEMPO_*` variable could not be read into
    /// [`crate::TempoConfig`].
    #[error("Cannot load Tempo settings: {0}")]
    Figment(#[from] figment::Error),

    /// A setting parsed but is outside its accepted range.
    #[error("Tempo setting '{field}' rejected: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Dotted path of the rejected setting (`general.default_limit`), if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { field, .. } => Some(field),
            Self::Figment(_) => None,
        }
    }
}
