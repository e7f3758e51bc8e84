//! Desktop stand-in for the SoftAP portal.
//!
//! There is no radio here: the "access point" is a TCP listener on a local
//! address, served by a current-thread tokio runtime on its own thread. It
//! speaks just enough HTTP/1.1 for a browser to load the page and call the
//! API, one request per connection.

use std::net::SocketAddr;

use bytes::{BufMut, BytesMut};
use http::{Method, Uri};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::{PendingRequest, Request, RequestTx, Response, Transport};
use crate::config::ApConfig;

const MAX_HEAD_LEN: usize = 4096;

pub struct HostPortal {
    addr: SocketAddr,
    bound: Option<SocketAddr>,
    _worker: Option<std::thread::JoinHandle<()>>,
}

impl HostPortal {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            bound: None,
            _worker: None,
        }
    }

    /// The address actually listened on, once serving. Differs from the
    /// requested one when port 0 was asked for.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound
    }
}

impl Transport for HostPortal {
    fn serve(
        &mut self,
        config: &ApConfig,
        _paths: &[&'static str],
        requests: RequestTx,
    ) -> anyhow::Result<()> {
        let listener = std::net::TcpListener::bind(self.addr)?;
        listener.set_nonblocking(true)?;
        let bound = listener.local_addr()?;
        log::info!("Simulating access point {:?} on http://{}", config.ssid, bound);

        let worker = std::thread::Builder::new()
            .name("http".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("Failed to build HTTP runtime: {:?}", e);
                        return;
                    }
                };
                if let Err(e) = rt.block_on(accept_loop(listener, requests)) {
                    log::error!("HTTP listener stopped: {:?}", e);
                }
            })?;

        self.bound = Some(bound);
        self._worker = Some(worker);
        Ok(())
    }

    fn url(&self) -> String {
        format!("http://{}", self.bound.unwrap_or(self.addr))
    }

    fn restart(&mut self) {
        log::warn!("Restart requested, exiting simulator");
        std::process::exit(0)
    }
}

async fn accept_loop(listener: std::net::TcpListener, requests: RequestTx) -> anyhow::Result<()> {
    let listener = TcpListener::from_std(listener)?;
    loop {
        let (stream, peer) = listener.accept().await?;
        let requests = requests.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, requests).await {
                log::debug!("connection from {} dropped: {:?}", peer, e);
            }
        });
    }
}

async fn serve_connection(mut stream: TcpStream, requests: RequestTx) -> anyhow::Result<()> {
    let head = read_head(&mut stream).await?;
    let response = match parse_request(&head) {
        Ok(request) => {
            let (pending, reply) = PendingRequest::new(request);
            match requests.send(pending).await {
                Ok(()) => reply.await.unwrap_or_else(|_| Response::unavailable()),
                Err(_) => Response::unavailable(),
            }
        }
        Err(e) => {
            log::warn!("Malformed request: {}", e);
            Response::invalid_request()
        }
    };

    stream.write_all(&encode_response(&response)).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn read_head(stream: &mut TcpStream) -> anyhow::Result<BytesMut> {
    let mut buf = BytesMut::with_capacity(1024);
    loop {
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return Ok(buf);
        }
        anyhow::ensure!(buf.len() < MAX_HEAD_LEN, "request head over {} bytes", MAX_HEAD_LEN);
        if stream.read_buf(&mut buf).await? == 0 {
            anyhow::bail!("connection closed mid-request");
        }
    }
}

/// Only the request line matters; headers and bodies are ignored.
fn parse_request(head: &[u8]) -> anyhow::Result<Request> {
    let head = std::str::from_utf8(head)?;
    let line = head.lines().next().unwrap_or_default();
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("bad request line {:?}", line);
    };
    anyhow::ensure!(version.starts_with("HTTP/1."), "unsupported version {}", version);

    let method = Method::from_bytes(method.as_bytes())?;
    let uri = target.parse::<Uri>()?;
    Ok(Request::new(method, uri))
}

fn encode_response(response: &Response) -> BytesMut {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status.as_u16(),
        response.status.canonical_reason().unwrap_or(""),
        response.content_type,
        response.body.len()
    );
    let mut out = BytesMut::with_capacity(head.len() + response.body.len());
    out.put_slice(head.as_bytes());
    out.put_slice(&response.body);
    out
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::time::Duration;

    use super::*;
    use crate::dashboard::{Dashboard, SystemDisplay, Views};

    #[test]
    fn test_parse_request_line() {
        let req = parse_request(b"GET /api/mode?mode=auto HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(*req.method(), Method::GET);
        assert_eq!(req.path(), "/api/mode");
        assert_eq!(req.arg("mode").as_deref(), Some("auto"));

        assert!(parse_request(b"GET\r\n\r\n").is_err());
        assert!(parse_request(b"GET / SPDY/3\r\n\r\n").is_err());
    }

    #[test]
    fn test_encode_response() {
        let out = encode_response(&Response::invalid_request());
        let text = std::str::from_utf8(&out).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.contains("Content-Length: 27\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"error\":\"Invalid request\"}"));
    }

    fn fetch(addr: SocketAddr, target: &str) -> std::thread::JoinHandle<String> {
        let target = target.to_string();
        std::thread::spawn(move || {
            let mut stream = std::net::TcpStream::connect(addr).unwrap();
            write!(stream, "GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", target).unwrap();
            let mut out = String::new();
            stream.read_to_string(&mut out).unwrap();
            out
        })
    }

    fn poll_until_done(
        dashboard: &mut Dashboard<HostPortal>,
        views: &Views<'_>,
        client: std::thread::JoinHandle<String>,
    ) -> String {
        while !client.is_finished() {
            dashboard.poll(views);
            std::thread::sleep(Duration::from_millis(5));
        }
        client.join().unwrap()
    }

    #[test]
    fn test_serves_dashboard_over_tcp() {
        let portal = HostPortal::new("127.0.0.1:0".parse().unwrap());
        let mut dashboard = Dashboard::attach("Simulator", "", portal);
        dashboard.start().unwrap();
        let addr = dashboard.transport().local_addr().unwrap();
        assert_eq!(dashboard.url(), format!("http://{}", addr));

        let system = SystemDisplay::new("Simulator", "v0.1");
        let views = Views::new().with_system(&system);

        let resp = poll_until_done(&mut dashboard, &views, fetch(addr, "/api/status"));
        assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(resp.ends_with(
            r#"{"system":{"name":"Simulator","version":"v0.1","mode":"auto","uptime":0}}"#
        ));

        let resp = poll_until_done(&mut dashboard, &views, fetch(addr, "/api/output1?state=1"));
        assert!(resp.starts_with("HTTP/1.1 400 Bad Request\r\n"));

        let resp = poll_until_done(&mut dashboard, &views, fetch(addr, "/nope"));
        assert!(resp.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }
}
