//! Test support: a minimal loopback HTTP/1.1 responder.
//!
//! Serves a fixed route table, one request per connection. Supports a
//! truncated-body mode for simulating mid-stream network failures.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
    /// When set, this value is written as Content-Length while only `body`
    /// is sent, after which the connection drops — a truncated transfer.
    pub declared_len: Option<usize>,
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            declared_len: None,
        }
    }

    pub fn truncated(body: impl Into<Vec<u8>>, declared_len: usize) -> Self {
        Self {
            status: 200,
            body: body.into(),
            declared_len: Some(declared_len),
        }
    }
}

/// Gzip `data` the way the release publishing pipeline would.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Start a responder for `routes` (keyed by request path) and return its
/// base URL. The server thread runs until the test process exits.
pub fn spawn_server(routes: HashMap<String, Response>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            handle(stream, &routes);
        }
    });

    format!("http://{addr}")
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Response>) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    // Read until end of headers; requests here are header-only GETs.
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&chunk[..n]),
        }
    }

    let request = String::from_utf8_lossy(&request);
    let path = request
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    match routes.get(&path) {
        Some(response) => {
            let declared = response.declared_len.unwrap_or(response.body.len());
            let _ = write!(
                stream,
                "HTTP/1.1 {} OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                response.status, declared
            );
            let _ = stream.write_all(&response.body);
        }
        None => {
            let _ = write!(
                stream,
                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
        }
    }
    let _ = stream.flush();
}
