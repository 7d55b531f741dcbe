//! Socket transport for `host:port` device addresses, used by emulator and
//! network-attached devices.

use crate::infrastructure::transport::{Transport, TransportError, TransportKind};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::info;

pub struct SocketTransport {
    address: String,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
}

impl SocketTransport {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
            stream: None,
        }
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }
        info!("Connecting to socket device at {}", self.address);
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| {
                TransportError::ConnectionFailed(format!(
                    "timed out connecting to {}",
                    self.address
                ))
            })?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream.write_all(bytes).await?;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let n = stream.read(buf).await?;
        Ok(n)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            info!("Socket transport to {} closed", self.address);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn open_write_read_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            sock.read_exact(&mut buf).await.unwrap();
            sock.write_all(&buf).await.unwrap();
        });

        let mut transport = SocketTransport::new(addr.to_string(), Duration::from_secs(1));
        assert!(!transport.is_open());
        transport.open().await.unwrap();
        assert!(transport.is_open());

        transport.write(&[1, 2, 3, 4]).await.unwrap();
        let mut buf = [0u8; 4];
        let n = transport.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3, 4]);

        transport.close().await.unwrap();
        assert!(!transport.is_open());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn write_before_open_is_rejected() {
        let mut transport = SocketTransport::new("127.0.0.1:1", Duration::from_millis(100));
        let err = transport.write(&[0]).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn unreachable_host_fails_to_open() {
        // Port 1 is almost certainly closed.
        let mut transport = SocketTransport::new("127.0.0.1:1", Duration::from_millis(500));
        let err = transport.open().await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed(_)));
    }
}
