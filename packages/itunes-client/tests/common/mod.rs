//! Scripted HTTP server for exercising the client against real sockets.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Responses are served in order; once the script runs out the last
/// response repeats.
#[derive(Default)]
pub struct Script {
    responses: Mutex<VecDeque<(u16, String)>>,
    delays: Mutex<VecDeque<Duration>>,
    hits: Mutex<Vec<Instant>>,
    queries: Mutex<Vec<HashMap<String, String>>>,
}

impl Script {
    pub fn new(responses: Vec<(u16, &str)>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| (status, body.to_string()))
                    .collect(),
            ),
            ..Default::default()
        })
    }

    /// Like `new`, but hit `n` first waits `delays[n]` before answering.
    pub fn with_delays(responses: Vec<(u16, &str)>, delays: Vec<Duration>) -> Arc<Self> {
        let script = Self::new(responses);
        *script.delays.lock().unwrap() = delays.into();
        script
    }

    pub fn hit_count(&self) -> usize {
        self.hits.lock().unwrap().len()
    }

    pub fn hit_times(&self) -> Vec<Instant> {
        self.hits.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<HashMap<String, String>> {
        self.queries.lock().unwrap().clone()
    }

    fn next(&self) -> (u16, String) {
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses
                .front()
                .cloned()
                .unwrap_or((500, "empty script".to_string()))
        }
    }
}

async fn scripted(
    State(script): State<Arc<Script>>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    script.hits.lock().unwrap().push(Instant::now());
    script.queries.lock().unwrap().push(query);
    let delay = script.delays.lock().unwrap().pop_front();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let (status, body) = script.next();
    (StatusCode::from_u16(status).unwrap(), body)
}

/// Serve `script` on an ephemeral port and return the base URL.
pub async fn serve(script: Arc<Script>) -> String {
    let app = Router::new()
        .route("/*path", get(scripted))
        .with_state(script);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Raw listener that reads each request, hangs up without answering on the
/// first `drops` connections, then answers `200` with `body`.
///
/// Returns the base URL and a counter of accepted connections.
pub async fn serve_dropping(drops: usize, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            read_request_head(&mut socket).await;
            if n < drops {
                drop(socket);
                continue;
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), accepted)
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}
