use thiserror::Error;

/// Crate-wide error taxonomy. Each variant corresponds to a category from the
/// pipeline's error taxonomy: `ConfigError` and `StoreError`/
/// `InvariantViolation` are fatal; `AdapterTransient`/`AdapterPermanent` and
/// `NotifierTransient`/`NotifierPermanent` are recovered at their stage
/// boundary and never propagate past it.
#[derive(Error, Debug)]
pub enum IceWatchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("adapter transient error ({source}): {message}")]
    AdapterTransient { source: String, message: String },

    #[error("adapter permanent error ({source}): {message}")]
    AdapterPermanent { source: String, message: String },

    #[error("notifier transient error: {0}")]
    NotifierTransient(String),

    #[error("notifier permanent error: {0}")]
    NotifierPermanent(String),

    #[error("correlator invariant violation: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl IceWatchError {
    /// Whether this error should terminate the process (fail-fast, per
    /// the propagation policy: invariant violations and store errors are
    /// the only fatal categories once the pipeline is running).
    pub fn is_fatal(&self) -> bool {
        matches!(self, IceWatchError::Store(_) | IceWatchError::InvariantViolation(_))
    }
}
