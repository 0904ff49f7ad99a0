use std::fmt;

#[derive(Debug)]
pub enum UnsealError {
    /// Caller-supplied argument violates a precondition (empty key set,
    /// empty cleartext, ...).
    Invalid(String),
    /// No unseal key in the set could open the wrapped bytes.
    BadKey(String),
}

impl fmt::Display for UnsealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid argument: {}", msg),
            Self::BadKey(msg) => write!(f, "no unseal key matched: {}", msg),
        }
    }
}

impl std::error::Error for UnsealError {}
