use std::fmt;

/// Errors surfaced by the relay's ambient collaborators (config loading, the
/// wire codec, the back-office client). Actor loops resolve these locally;
/// none of them ever propagate across an actor's own task boundary.
#[derive(Debug)]
pub enum RelayError {
    Config(String),
    Decode(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Config(msg) => write!(f, "config error: {msg}"),
            RelayError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for RelayError {}
