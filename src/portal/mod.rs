//! HTTP front ends for the dashboard.
//!
//! A transport owns the sockets and the network interface. It never touches
//! dashboard state: every request is wrapped in a [`PendingRequest`] and
//! pushed through a bounded channel, and the HTTP side waits for the
//! [`Response`] that `Dashboard::poll` sends back on the caller's thread.

use bytes::Bytes;
use http::{Method, StatusCode, Uri};
use tokio::sync::{mpsc, oneshot};

use crate::config::ApConfig;

#[cfg(target_os = "espidf")]
pub mod esp;
#[cfg(not(target_os = "espidf"))]
pub mod host;

/// Requests a transport may have in flight before it blocks.
pub const REQUEST_QUEUE: usize = 8;

pub const CONTENT_TYPE_HTML: &str = "text/html";
pub const CONTENT_TYPE_JSON: &str = "application/json";

const INVALID_REQUEST_BODY: &[u8] = br#"{"error":"Invalid request"}"#;
const NOT_FOUND_BODY: &[u8] = br#"{"error":"Not found"}"#;
const METHOD_NOT_ALLOWED_BODY: &[u8] = br#"{"error":"Method not allowed"}"#;
const UNAVAILABLE_BODY: &[u8] = br#"{"error":"Dashboard unavailable"}"#;
const INTERNAL_ERROR_BODY: &[u8] = br#"{"error":"Internal error"}"#;

pub type RequestTx = mpsc::Sender<PendingRequest>;
pub type RequestRx = mpsc::Receiver<PendingRequest>;

pub trait Transport {
    /// Brings up the network, binds `paths` and starts forwarding requests.
    fn serve(
        &mut self,
        config: &ApConfig,
        paths: &[&'static str],
        requests: RequestTx,
    ) -> anyhow::Result<()>;

    /// Base URL a browser should open.
    fn url(&self) -> String;

    /// Reboots the device. Does not return on hardware.
    fn restart(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    uri: Uri,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri }
    }

    /// Parses an origin-form target such as `/api/mode?mode=auto`.
    pub fn get(target: &str) -> anyhow::Result<Self> {
        let uri = target
            .parse::<Uri>()
            .map_err(|e| anyhow::anyhow!("invalid request target {:?}: {}", target, e))?;
        Ok(Self::new(Method::GET, uri))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.arg(name).is_some()
    }

    /// First value of query parameter `name`, percent-decoded. A bare key
    /// without `=` carries no value and is skipped.
    pub fn arg(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| decode_component(key) == name)
            .map(|(_, value)| decode_component(value))
    }
}

/// `application/x-www-form-urlencoded` decoding: `+` is a space, `%XX` a byte.
/// Malformed escapes are kept literally.
fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl Response {
    pub fn html(page: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: CONTENT_TYPE_HTML,
            body: Bytes::from_static(page.as_bytes()),
        }
    }

    pub fn json(status: StatusCode, body: Bytes) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON,
            body,
        }
    }

    pub fn invalid_request() -> Self {
        Self::json(StatusCode::BAD_REQUEST, Bytes::from_static(INVALID_REQUEST_BODY))
    }

    pub fn not_found() -> Self {
        Self::json(StatusCode::NOT_FOUND, Bytes::from_static(NOT_FOUND_BODY))
    }

    pub fn method_not_allowed() -> Self {
        Self::json(
            StatusCode::METHOD_NOT_ALLOWED,
            Bytes::from_static(METHOD_NOT_ALLOWED_BODY),
        )
    }

    pub fn unavailable() -> Self {
        Self::json(
            StatusCode::SERVICE_UNAVAILABLE,
            Bytes::from_static(UNAVAILABLE_BODY),
        )
    }

    pub fn internal_error() -> Self {
        Self::json(
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(INTERNAL_ERROR_BODY),
        )
    }
}

/// A request travelling from a transport to the poll loop.
#[derive(Debug)]
pub struct PendingRequest {
    pub request: Request,
    reply: oneshot::Sender<Response>,
}

impl PendingRequest {
    pub fn new(request: Request) -> (Self, oneshot::Receiver<Response>) {
        let (reply, rx) = oneshot::channel();
        (Self { request, reply }, rx)
    }

    pub fn respond(self, response: Response) {
        if self.reply.send(response).is_err() {
            log::warn!("client for {} went away before the reply", self.request.path());
        }
    }
}
