//! IPC client for talking to a running glassy daemon

use glassy_protocol::{ProtocolError, Request, Response, read_response, write_request};
use std::path::PathBuf;
use tokio::net::UnixStream;

/// IPC client for communicating with the daemon
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    /// Create a new IPC client with a custom socket path
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Connect to the daemon and send a request
    pub async fn send_request(&self, request: &Request) -> Result<Response, ProtocolError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        write_request(&mut writer, request).await?;
        let response = read_response(&mut reader).await?;

        Ok(response)
    }

    /// Check if the socket file exists (quick check without connecting)
    pub fn is_socket_available(&self) -> bool {
        self.socket_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_socket_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let client = IpcClient::with_socket_path(dir.path().join("glassy.sock"));
        assert!(!client.is_socket_available());
    }

    #[tokio::test]
    async fn test_send_to_missing_socket_fails() {
        let dir = tempfile::tempdir().unwrap();
        let client = IpcClient::with_socket_path(dir.path().join("glassy.sock"));
        let err = client.send_request(&Request::Ping).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Io(_)));
    }
}
