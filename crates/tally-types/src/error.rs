use thiserror::Error;

/// Errors produced by type construction and input validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("item name must not be empty")]
    EmptyName,

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("item id must not be empty")]
    EmptyId,
}
