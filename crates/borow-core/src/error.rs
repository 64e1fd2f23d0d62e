//! Error types for Borow

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The expression naming the borrowed value is missing or blank.
    #[error("BOR404: variable '{expression}' has no personality")]
    NoPersonality { expression: String },

    /// The operand has no storage location (a literal or an expression result).
    /// Raised by call-site tooling before it ever reaches the runtime.
    #[error("BOR001: cannot borrow a temporary object; temporaries have no storage")]
    TemporaryObject,

    #[error("config error: {0}")]
    Config(String),

    #[error("global registry already configured")]
    AlreadyConfigured,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn no_personality(expression: impl Into<String>) -> Self {
        Self::NoPersonality {
            expression: expression.into(),
        }
    }

    pub fn temporary_object() -> Self {
        Self::TemporaryObject
    }

    /// Stable diagnostic code for the acquisition failures.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::NoPersonality { .. } => Some("BOR404"),
            Self::TemporaryObject => Some("BOR001"),
            _ => None,
        }
    }

    /// True for the two acquisition failures call-site tooling surfaces verbatim.
    pub fn is_taxonomy(&self) -> bool {
        self.code().is_some()
    }
}
