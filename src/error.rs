use std::{fmt, io};

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum BadgeError {
    #[error("Badge already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Badge is driven by a checker and cannot be set directly: {0}")]
    HasChecker(String),
    #[error("Checker failed: {0}")]
    Checker(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Badge Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl BadgeError {
    /// Configuration smells are reported but never stop the engine.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BadgeError::AlreadyRegistered(_) | BadgeError::Config(_) | BadgeError::HasChecker(_)
        )
    }
}

impl From<toml::de::Error> for BadgeError {
    fn from(src: toml::de::Error) -> BadgeError {
        BadgeError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for BadgeError {
    fn from(src: toml::ser::Error) -> BadgeError {
        BadgeError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for BadgeError {
    fn from(src: JsonError) -> BadgeError {
        BadgeError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for BadgeError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => BadgeError::NotFound(format!("{x}")),
            _ => BadgeError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for BadgeError {
    fn from(x: fmt::Error) -> Self {
        BadgeError::Serialization(format!("{x}"))
    }
}
