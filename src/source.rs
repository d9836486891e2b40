//! Where tile bytes come from.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::FetchError;

const ZERO_DURATION: Duration = Duration::from_secs(0);

/// A remote the fetch workers download tiles from.
///
/// Implementations must map non-2xx answers to [`FetchError::Status`] and any
/// failure to obtain a complete response to [`FetchError::Transport`].
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// [`TileSource`] over HTTP(S).
#[derive(Clone, Debug)]
pub struct HttpTileSource {
    client: reqwest::Client,
}

impl HttpTileSource {
    /// Creates a source whose requests time out after `timeout`.
    ///
    /// Pass the zero duration to disable the timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if timeout > ZERO_DURATION {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_owned(),
            });
        }

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportKind;
    use crate::store::TileStore;
    use crate::tile::Tile;
    use crate::worker::{download, DownloadTask};
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::thread;

    // Reads one request head from `stream`.
    fn read_request(stream: &mut TcpStream) {
        let mut head = Vec::new();
        let mut buf = [0; 512];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }
    }

    // Accepts a single connection on a local port and hands it to `handle`.
    fn serve_once<F>(handle: F) -> SocketAddr
    where
        F: FnOnce(TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                handle(stream);
            }
        });
        addr
    }

    #[tokio::test]
    async fn not_found_is_a_status_error_and_writes_nothing() {
        let addr = serve_once(|mut stream| {
            read_request(&mut stream);
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
        });

        let dir = tempfile::tempdir().unwrap();
        let store = TileStore::new(dir.path(), "png");
        let task = DownloadTask {
            region: "r".into(),
            tile: Tile::new(1, 2, 3),
            url: format!("http://{}/3/1/2.png", addr),
        };
        let source = HttpTileSource::new(Duration::from_secs(5)).unwrap();

        let err = download(&task, &source, &store).await.unwrap_err();
        match err {
            FetchError::Status { status, reason } => {
                assert_eq!(status, 404);
                assert_eq!(reason, "Not Found");
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert!(!store.path("r", &task.tile).exists());
        assert!(!store.has("r", &task.tile).await);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let addr = serve_once(|mut stream| {
            read_request(&mut stream);
            thread::sleep(Duration::from_secs(2));
        });

        let source = HttpTileSource::new(Duration::from_millis(100)).unwrap();
        let err = source
            .fetch(&format!("http://{}/1/0/0.png", addr))
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                FetchError::Transport {
                    kind: TransportKind::Timeout,
                    ..
                }
            ),
            "expected timeout, got {:?}",
            err
        );
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        // bind and drop to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let source = HttpTileSource::new(Duration::from_secs(5)).unwrap();
        let err = source
            .fetch(&format!("http://127.0.0.1:{}/1/0/0.png?apikey=secret", port))
            .await
            .unwrap_err();

        match err {
            FetchError::Transport { kind, message } => {
                assert_eq!(kind, TransportKind::Connect);
                assert!(!message.contains("secret"));
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
