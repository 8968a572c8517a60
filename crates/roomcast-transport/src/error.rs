/// Errors that can occur in the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Establishing the underlying connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The subscribe request was rejected or never acknowledged.
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),

    /// Historical replay could not be completed.
    #[error("resend failed: {0}")]
    ResendFailed(String),

    /// Publishing a payload failed.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// The transport was closed.
    #[error("transport closed")]
    Closed,
}
