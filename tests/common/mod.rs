//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use subconverter::config::EnvOverrides;
use subconverter::convert::{BuiltinConverter, Converter};
use subconverter::ruleset::{FetchError, Fetcher};
use subconverter::{Collaborators, LaunchOptions, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A mock origin server. Counts every request it answers.
pub struct MockOrigin {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockOrigin {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a programmable origin; `f` maps the request path to (status, body).
pub async fn start_programmable_origin<F, Fut>(f: F) -> MockOrigin
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let f = Arc::new(f);

    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = Arc::clone(&f);
                    let counter = Arc::clone(&counter);
                    tokio::spawn(async move {
                        let path = read_request_path(&mut socket).await;
                        let (status, body) = f(path).await;
                        counter.fetch_add(1, Ordering::SeqCst);
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockOrigin { addr, hits }
}

/// Origin that answers every path with `body`.
pub async fn start_mock_origin(body: &'static str) -> MockOrigin {
    start_programmable_origin(move |_| async move { (200, body.to_string()) }).await
}

async fn read_request_path(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf)
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string()
}

/// Fetcher that never goes through a system proxy.
pub struct DirectFetcher {
    client: reqwest::Client,
}

impl DirectFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
        }
    }
}

impl Fetcher for DirectFetcher {
    fn fetch_remote<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|source| FetchError::Http {
                    url: url.to_string(),
                    source,
                })?;
            if !response.status().is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                });
            }
            response.text().await.map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })
        })
    }

    fn fetch_local<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| FetchError::Io {
                    path: path.to_path_buf(),
                    source,
                })
        })
    }
}

pub fn collaborators() -> Collaborators {
    collaborators_with(Arc::new(BuiltinConverter))
}

pub fn collaborators_with(converter: Arc<dyn Converter>) -> Collaborators {
    Collaborators {
        fetcher: Arc::new(DirectFetcher::new()),
        converter,
    }
}

/// Reserve a port by binding and releasing it.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Write a preference file listening on 127.0.0.1:`port`, followed by `extra`.
pub fn write_prefs(dir: &Path, port: u16, extra: &str) -> PathBuf {
    let path = dir.join("pref.toml");
    std::fs::write(
        &path,
        format!("[server]\nlisten = \"127.0.0.1\"\nport = {port}\n\n{extra}"),
    )
    .unwrap();
    path
}

pub async fn wait_until_listening(addr: SocketAddr) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("server never started listening on {addr}");
}

/// A backend running in-process via `subconverter::run`.
pub struct TestServer {
    pub addr: SocketAddr,
    pub dir: tempfile::TempDir,
    pub pref_path: PathBuf,
    pub shutdown: Shutdown,
    task: JoinHandle<i32>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and return the exit code.
    pub async fn stop(self) -> i32 {
        self.shutdown.trigger("test finished");
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("server did not stop")
            .unwrap()
    }
}

pub async fn start_server(extra_prefs: &str) -> TestServer {
    start_server_with(extra_prefs, &[], EnvOverrides::default(), collaborators()).await
}

pub async fn start_server_with(
    extra_prefs: &str,
    flags: &[&str],
    env: EnvOverrides,
    collaborators: Collaborators,
) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let port = env.port.unwrap_or_else(free_port);
    let file_port = if env.port.is_some() { free_port() } else { port };
    let pref_path = write_prefs(dir.path(), file_port, extra_prefs);

    let mut args = vec!["subconverter".to_string(), "-f".to_string(), pref_path.display().to_string()];
    args.extend(flags.iter().map(|f| f.to_string()));
    let options = LaunchOptions::parse_args(args).unwrap();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(subconverter::run(options, env, collaborators, shutdown.clone()));

    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    wait_until_listening(addr).await;

    TestServer {
        addr,
        dir,
        pref_path,
        shutdown,
        task,
    }
}
