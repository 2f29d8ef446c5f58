use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The broker could not accept or hand out a message.
    #[error("delivery failed: {0}")]
    Delivery(String),
    /// The bus has been shut down.
    #[error("event bus closed")]
    Closed,
    /// A payload could not be encoded or decoded.
    #[error("event codec error: {0}")]
    Codec(String),
}

impl BusError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

impl From<serde_json::Error> for BusError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
