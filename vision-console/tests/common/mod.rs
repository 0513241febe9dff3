#![allow(dead_code)]

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use vision_console::types::AnnotationResult;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Two objects and three labels, scores deliberately out of order.
pub fn sample_result() -> AnnotationResult {
    serde_json::from_value(json!({
        "localizedObjectAnnotations": [
            { "name": "Bicycle", "score": 0.7, "boundingPoly": { "normalizedVertices": [
                { "x": 0.5, "y": 0.5 }, { "x": 0.9, "y": 0.5 }, { "x": 0.9, "y": 0.9 }, { "x": 0.5, "y": 0.9 }
            ] } },
            { "name": "Person", "score": 0.9, "boundingPoly": { "normalizedVertices": [
                { "x": 0.1, "y": 0.2 }, { "x": 0.3, "y": 0.2 }, { "x": 0.3, "y": 0.6 }, { "x": 0.1, "y": 0.6 }
            ] } }
        ],
        "labelAnnotations": [
            { "description": "Wheel", "score": 0.8 },
            { "description": "Street", "score": 0.9 },
            { "description": "Tire", "score": 0.7 }
        ],
        "safeSearchAnnotation": { "adult": 1, "spoof": 2, "medical": 3, "violence": 4, "racy": 5 }
    }))
    .unwrap()
}

/// Raw request captured by [`serve_once`].
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

impl CapturedRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }
}

/// Answers exactly one HTTP request with a canned response.
pub async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
) -> (String, JoinHandle<CapturedRequest>) {
    serve(status, content_type, body, false).await
}

/// Like [`serve_once`], but streams the body chunked without announcing its length.
pub async fn serve_chunked_once(
    status: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
) -> (String, JoinHandle<CapturedRequest>) {
    serve(status, content_type, body, true).await
}

async fn serve(
    status: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
    chunked_response: bool,
) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let read = socket.read(&mut chunk).await.unwrap();
            assert!(read > 0, "connection closed before headers were complete");
            buffer.extend_from_slice(&chunk[..read]);
            if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
                break position + 4;
            }
        };

        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let lower = head.to_ascii_lowercase();
        let content_length = lower
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok());
        let chunked = lower.contains("transfer-encoding: chunked");

        loop {
            let body_so_far = &buffer[header_end..];
            let complete = match content_length {
                Some(length) => body_so_far.len() >= length,
                None if chunked => body_so_far.ends_with(b"0\r\n\r\n"),
                None => true,
            };
            if complete {
                break;
            }
            let read = socket.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
        }

        let framing = if chunked_response {
            "Transfer-Encoding: chunked".to_string()
        } else {
            format!("Content-Length: {}", body.len())
        };
        let response_head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\n{}\r\nConnection: close\r\n\r\n",
            status, content_type, framing
        );
        socket.write_all(response_head.as_bytes()).await.unwrap();

        // The client may hang up early once it has seen enough.
        if chunked_response {
            for piece in body.chunks(64 * 1024) {
                let mut frame = format!("{:x}\r\n", piece.len()).into_bytes();
                frame.extend_from_slice(piece);
                frame.extend_from_slice(b"\r\n");
                if socket.write_all(&frame).await.is_err() {
                    break;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        } else {
            let _ = socket.write_all(&body).await;
        }
        let _ = socket.shutdown().await;

        CapturedRequest {
            head,
            body: String::from_utf8_lossy(&buffer[header_end..]).to_string(),
        }
    });

    (format!("http://{}", address), handle)
}

pub fn json_body(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

/// A valid PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    let image = image::RgbImage::new(width, height);
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
