//! One-shot HTTP server for driving the clients over a real socket

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as it arrived on the wire
#[derive(Debug)]
pub struct Captured {
    pub head: String,
    pub body: String,
}

impl Captured {
    /// e.g. `POST /boot/10.0.0.1/rescue HTTP/1.1`
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

/// Answers exactly one request with a canned status and body
pub struct TestServer {
    pub url: String,
    handle: JoinHandle<Captured>,
}

impl TestServer {
    pub async fn respond(status: u16, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];

            let head_end = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before the headers ended");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let mut captured = Captured {
                head: String::from_utf8_lossy(&buf[..head_end]).into_owned(),
                body: String::new(),
            };
            let length: usize = captured
                .header("content-length")
                .and_then(|value| value.parse().ok())
                .unwrap_or(0);
            while buf.len() < head_end + length {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            captured.body = String::from_utf8_lossy(&buf[head_end..]).into_owned();

            let response = format!(
                "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            captured
        });

        Self { url, handle }
    }

    /// The request the server received
    pub async fn request(self) -> Captured {
        self.handle.await.unwrap()
    }
}
