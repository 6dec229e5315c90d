//! Connection operations the banner protocol is written against.
//!
//! Waiting for readability is its own step rather than a side effect of a
//! blocking read, so each wait carries an explicit timeout.

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Size of a single banner read.
pub const BANNER_BUF_SIZE: usize = 4096;

/// An established connection the banner acquirer can drive.
#[async_trait]
pub trait ProbeStream: Send {
    /// Wait up to `limit` for data (or EOF) to become readable.
    async fn wait_readable(&mut self, limit: Duration) -> bool;

    /// Read whatever is available. `Ok(0)` means the peer closed.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write the full payload.
    async fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Run a TLS handshake over this connection, send `request`, and return
    /// up to one buffer of response bytes.
    ///
    /// A read that times out after a completed handshake yields an empty
    /// response, not an error. The underlying connection stays usable for a
    /// plain-text fallback when the handshake fails.
    async fn tls_exchange(
        &mut self,
        host: &str,
        request: &[u8],
        read_timeout: Duration,
        handshake_timeout: Duration,
    ) -> io::Result<Vec<u8>>;
}

#[async_trait]
impl ProbeStream for TcpStream {
    async fn wait_readable(&mut self, limit: Duration) -> bool {
        // `readable()` stays set after a read that drained the socket, so
        // wait on a one-byte peek instead; it re-arms on `WouldBlock`.
        // Errors count as readable so the next read reports them.
        let mut byte = [0u8; 1];
        timeout(limit, self.peek(&mut byte)).await.is_ok()
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.try_read(buf)
    }

    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data).await
    }

    async fn tls_exchange(
        &mut self,
        host: &str,
        request: &[u8],
        read_timeout: Duration,
        handshake_timeout: Duration,
    ) -> io::Result<Vec<u8>> {
        let connector = native_tls::TlsConnector::new().map_err(io::Error::other)?;
        let connector = tokio_native_tls::TlsConnector::from(connector);

        // Borrow the socket so a failed handshake leaves it with the caller.
        let mut tls = timeout(handshake_timeout, connector.connect(host, &mut *self))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out"))?
            .map_err(io::Error::other)?;

        tls.write_all(request).await?;

        let mut buf = vec![0u8; BANNER_BUF_SIZE];
        let n = match timeout(read_timeout, tls.read(&mut buf)).await {
            Ok(read) => read?,
            Err(_) => 0,
        };
        buf.truncate(n);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn test_wait_readable_times_out_on_silent_peer() {
        let (mut client, _server) = pair().await;
        assert!(!client.wait_readable(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_read_after_wait() {
        let (mut client, mut server) = pair().await;
        server.write_all(b"hello\r\n").await.unwrap();

        assert!(client.wait_readable(Duration::from_secs(2)).await);
        let mut buf = [0u8; 64];
        let n = client.read_chunk(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello\r\n");
    }

    #[tokio::test]
    async fn test_drained_socket_is_not_readable() {
        let (mut client, mut server) = pair().await;
        server.write_all(b"SSH-2.0").await.unwrap();

        assert!(client.wait_readable(Duration::from_secs(2)).await);
        let mut buf = [0u8; 64];
        assert_eq!(client.read_chunk(&mut buf).await.unwrap(), 7);

        assert!(!client.wait_readable(Duration::from_millis(50)).await);

        server.write_all(b"-OpenSSH_9.6\r\n").await.unwrap();
        assert!(client.wait_readable(Duration::from_secs(2)).await);
        let n = client.read_chunk(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"-OpenSSH_9.6\r\n");
    }

    #[tokio::test]
    async fn test_eof_is_readable() {
        let (mut client, server) = pair().await;
        drop(server);

        assert!(client.wait_readable(Duration::from_secs(2)).await);
        let mut buf = [0u8; 64];
        assert_eq!(client.read_chunk(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_handshake_keeps_socket_usable() {
        let (mut client, mut server) = pair().await;

        // Answer the ClientHello with plain text, which is not a TLS record.
        let peer = tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let _ = server.read(&mut buf).await;
            let _ = server.write_all(b"not tls at all\r\n").await;
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
        });

        let result = client
            .tls_exchange(
                "localhost",
                b"HEAD / HTTP/1.0\r\n\r\n",
                Duration::from_millis(200),
                Duration::from_secs(2),
            )
            .await;
        assert!(result.is_err());

        // The plain socket is still ours to use.
        tokio_test::assert_ok!(client.send(b"\r\n").await);
        drop(client);
        peer.await.unwrap();
    }
}
