//! Error types for shardis

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    // === Pool Errors ===
    #[error("Too many connections: cap of {max} reached")]
    CapacityExceeded { max: usize },

    #[error("Routing inconsistency: {0}")]
    RoutingInconsistency(String),

    #[error("Command {0} has no key to route on")]
    MissingKey(String),

    // === Network Errors ===
    #[error("Transport error: {0}")]
    Transport(String),

    // === Protocol Errors ===
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl Error {
    /// Did the connection die underneath the command?
    ///
    /// These are the only failures the executor answers with a reconnect and
    /// a second attempt.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Io(_))
    }

    /// Error reply from a node, as `CODE detail`.
    pub fn server(code: &str, detail: Option<&str>) -> Self {
        match detail {
            Some(detail) => Error::Server(format!("{} {}", code, detail)),
            None => Error::Server(code.to_string()),
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
        {
            return Error::Transport(e.to_string());
        }
        match e.kind() {
            redis::ErrorKind::TypeError => Error::Protocol(e.to_string()),
            redis::ErrorKind::InvalidClientConfig => Error::Configuration(e.to_string()),
            _ => match e.code() {
                Some(code) => Error::server(code, e.detail()),
                None => Error::Server(e.to_string()),
            },
        }
    }
}
