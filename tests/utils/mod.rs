//! Test utilities: a fake upstream GraphQL service and a proxy wired to it.
//!
//! The fake upstream records every request it receives and answers through a
//! replaceable handler, so tests can assert exactly what the proxy forwarded.

use assert_cmd::prelude::*;
use bytes::Bytes;
use holonet::proxy::{ForwardingProxy, HttpUpstream, ProxyServer, RunningServer};
use http_body_util::{BodyExt, Full};
use hyper::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use hyper::server::conn::http1;
use hyper::{Method, Request, Response, StatusCode, body::Incoming, service::service_fn};
use hyper_util::rt::TokioIo;
use std::io::ErrorKind;
use std::{
    collections::VecDeque,
    net::SocketAddr,
    process::Command,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

/// What the fake upstream saw for one request.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub user_agent: Option<String>,
    pub body: Bytes,
}

impl Captured {
    /// The request body parsed as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON.
    #[allow(dead_code, reason = "used only in some tests")]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("captured body is JSON")
    }
}

/// Shared handler invoked for each captured request.
pub type Handler = Arc<Mutex<Box<dyn FnMut(&Captured) -> Response<Full<Bytes>> + Send>>>;

/// Handle returned by [`start_upstream`] for inspecting and stopping the server.
pub struct FakeUpstream {
    pub addr: SocketAddr,
    pub handler: Handler,
    requests: Arc<Mutex<Vec<Captured>>>,
    join: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

impl FakeUpstream {
    /// URL of the fake GraphQL endpoint.
    pub fn url(&self) -> String {
        format!("http://{}/graphql", self.addr)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().expect("lock requests").clone()
    }

    /// Replace the response handler.
    pub fn respond_with(
        &self,
        handler: impl FnMut(&Captured) -> Response<Full<Bytes>> + Send + 'static,
    ) {
        *self.handler.lock().expect("lock handler") = Box::new(handler);
    }

    /// Answer successive requests with `bodies` in order.
    ///
    /// # Panics
    ///
    /// The handler panics when more requests arrive than bodies were given.
    #[allow(dead_code, reason = "used only in some tests")]
    pub fn set_sequential_responder(&self, bodies: impl Into<Vec<String>>) {
        let responses = Arc::new(Mutex::new(VecDeque::from(bodies.into())));
        self.respond_with(move |_req| {
            let body = responses
                .lock()
                .expect("lock responses")
                .pop_front()
                .expect("response");
            json_response(StatusCode::OK, body)
        });
    }

    /// Signal the server to stop and await shutdown.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        let _ = self.join.await;
    }
}

/// Build a JSON response with `status`.
///
/// # Panics
///
/// Panics if the response cannot be constructed.
pub fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(body.into()))
        .expect("build response")
}

fn header(req: &Request<Incoming>, name: hyper::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Start a fake upstream that records requests and answers `404` until a
/// handler is installed.
///
/// # Errors
///
/// Returns an error if the server fails to bind to a local port.
#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! uses % internally"
)]
pub async fn start_upstream() -> Result<FakeUpstream, std::io::Error> {
    let handler: Handler = Arc::new(Mutex::new(Box::new(|_req| {
        json_response(StatusCode::NOT_FOUND, r#"{"errors":[{"message":"No handler"}]}"#)
    })));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let handler_clone = Arc::clone(&handler);
    let requests_clone = Arc::clone(&requests);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, mut rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let builder = http1::Builder::new();
        loop {
            tokio::select! {
                res = listener.accept() => match res {
                    Ok((stream, _)) => {
                        let io = TokioIo::new(stream);
                        let h = Arc::clone(&handler_clone);
                        let log = Arc::clone(&requests_clone);
                        let service = service_fn(move |req: Request<Incoming>| {
                            let h = Arc::clone(&h);
                            let log = Arc::clone(&log);
                            async move {
                                let mut captured = Captured {
                                    method: req.method().clone(),
                                    path: req.uri().path().to_owned(),
                                    query: req.uri().query().map(str::to_owned),
                                    content_type: header(&req, CONTENT_TYPE),
                                    accept: header(&req, ACCEPT),
                                    user_agent: header(&req, USER_AGENT),
                                    body: Bytes::new(),
                                };
                                captured.body = req
                                    .into_body()
                                    .collect()
                                    .await
                                    .map(|b| b.to_bytes())
                                    .unwrap_or_default();
                                log.lock().expect("lock requests").push(captured.clone());
                                let mut f = h.lock().expect("lock handler in service");
                                let resp = (f)(&captured);
                                Ok::<_, std::convert::Infallible>(resp)
                            }
                        });
                        let conn = builder.serve_connection(io, service);
                        tokio::spawn(async move {
                            let _ = conn.await;
                        });
                    }
                    Err(e) => {
                        eprintln!("accept error: {e}");
                        match e.kind() {
                            ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                            | ErrorKind::Interrupted
                            | ErrorKind::WouldBlock => {}
                            _ => break,
                        }
                    }
                },
                _ = &mut rx => break,
            }
        }
    });

    Ok(FakeUpstream {
        addr,
        handler,
        requests,
        join,
        stop: tx,
    })
}

/// Run the real proxy on an ephemeral port, forwarding to `upstream` and
/// answering on `/proxy`.
///
/// # Panics
///
/// Panics if the proxy cannot be started.
pub async fn start_proxy(upstream: &str) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind proxy");
    let upstream = HttpUpstream::new(upstream).expect("upstream client");
    ProxyServer::new(ForwardingProxy::new(upstream), "/proxy")
        .spawn(listener)
        .expect("spawn proxy")
}

/// Create a `holonet` command with logging quietened and config isolated
/// in `dir`.
#[allow(
    dead_code,
    clippy::missing_panics_doc,
    reason = "helper for CLI tests only"
)]
pub fn holonet_cmd(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("holonet").expect("binary");
    cmd.current_dir(dir)
        .env("RUST_LOG", "error")
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir);
    cmd
}
