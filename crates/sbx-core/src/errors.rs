/// Core error type.
///
/// Adapter crates map their specific errors into this type so the router can
/// decide consistently between user-facing apologies, visible denials and
/// log-only warnings. Nothing here terminates the process after startup;
/// only `Config` is fatal, and only before the first event.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("delivery error: {0}")]
    Delivery(String),

    #[error("malformed action: {0}")]
    MalformedAction(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
