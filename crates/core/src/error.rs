use std::fmt;

/// Failure taxonomy of the data-access boundary.
///
/// Nothing here is fatal to the process: `NotFound` on viewer linkage
/// degrades to deny-all at the scope layer, `Conflict` is surfaced to the
/// caller once (never retried), and `Transient` degrades reads to an empty,
/// safe result plus a visible error. There is no retry policy; the user
/// re-triggers the action.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    /// The uniqueness invariant `(specialist, date, time)` rejected a write.
    #[error("the requested slot is already booked")]
    Conflict,
    #[error("transient backend failure: {0}")]
    Transient(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StoreError {
    /// Stable machine-readable kind, used by API responses and logs.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound => ErrorKind::NotFound,
            StoreError::Conflict => ErrorKind::Conflict,
            StoreError::Transient(_) => ErrorKind::Transient,
            StoreError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Transient,
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Transient => "transient",
            ErrorKind::InvalidInput => "invalid_input",
        };
        write!(f, "{}", name)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
