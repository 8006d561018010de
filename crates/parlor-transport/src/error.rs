/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer is gone; no further sends or receives are possible.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// A message could not be delivered to the peer.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading the next message from the peer failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or accepting a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The transport was shut down and accepts no new connections.
    #[error("transport shut down")]
    Shutdown,
}
