//! HTTP/1 front end for [`ForwardingProxy`].

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{debug, info, warn};
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::{
    DEBUG_HEADER, DebugMode, ForwardingProxy, HttpUpstream, ProxyError, ProxyResponse, Upstream,
};
use crate::HolonetError;

/// Largest POST body accepted unless [`ProxyServer::with_body_limit`] says
/// otherwise.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Serves one [`ForwardingProxy`] on a single route.
pub struct ProxyServer<U = HttpUpstream> {
    proxy: Arc<ForwardingProxy<U>>,
    route: Arc<str>,
    body_limit: usize,
}

impl<U> Clone for ProxyServer<U> {
    fn clone(&self) -> Self {
        Self {
            proxy: Arc::clone(&self.proxy),
            route: Arc::clone(&self.route),
            body_limit: self.body_limit,
        }
    }
}

/// A server running on a background task.
pub struct RunningServer {
    addr: SocketAddr,
    join: JoinHandle<Result<(), HolonetError>>,
    stop: oneshot::Sender<()>,
}

impl RunningServer {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for the accept loop to end.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the accept loop, if any.
    pub async fn shutdown(self) -> Result<(), HolonetError> {
        let _ = self.stop.send(());
        self.join.await.map_err(std::io::Error::from)?
    }
}

impl<U: Upstream> ProxyServer<U> {
    pub fn new(proxy: ForwardingProxy<U>, route: impl Into<Arc<str>>) -> Self {
        Self {
            proxy: Arc::new(proxy),
            route: route.into(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Answer `413` to POST bodies longer than `bytes`.
    #[must_use]
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Accept connections until `shutdown` completes.
    ///
    /// Connections already accepted are left to finish on their own tasks.
    ///
    /// # Errors
    ///
    /// Returns [`HolonetError::Io`] if the listener fails with anything other
    /// than a transient accept error.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! uses % internally"
    )]
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), HolonetError>
    where
        F: Future<Output = ()> + Send,
    {
        if let Ok(addr) = listener.local_addr() {
            info!("proxy listening on http://{addr}{}", self.route);
        }
        let builder = http1::Builder::new();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                res = listener.accept() => match res {
                    Ok((stream, peer)) => {
                        let server = self.clone();
                        let service = service_fn(move |req: Request<Incoming>| {
                            let server = server.clone();
                            async move { Ok::<_, Infallible>(server.dispatch(req).await) }
                        });
                        let conn = builder.serve_connection(TokioIo::new(stream), service);
                        tokio::spawn(async move {
                            if let Err(e) = conn.await {
                                debug!("connection from {peer} ended with error: {e}");
                            }
                        });
                    }
                    Err(e) => {
                        warn!("accept error: {e}");
                        match e.kind() {
                            ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                            | ErrorKind::Interrupted
                            | ErrorKind::WouldBlock => {}
                            _ => return Err(e.into()),
                        }
                    }
                },
                () = &mut shutdown => {
                    info!("proxy shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Run [`serve`](Self::serve) on a background task until
    /// [`RunningServer::shutdown`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`HolonetError::Io`] if the listener has no local address.
    pub fn spawn(self, listener: TcpListener) -> Result<RunningServer, HolonetError> {
        let addr = listener.local_addr()?;
        let (stop, stopped) = oneshot::channel::<()>();
        let join = tokio::spawn(self.serve(listener, async move {
            let _ = stopped.await;
        }));
        Ok(RunningServer { addr, join, stop })
    }

    async fn dispatch(&self, req: Request<Incoming>) -> Response<Full<Bytes>> {
        if req.uri().path() != &*self.route {
            debug!("no route for {} {}", req.method(), req.uri().path());
            return status_response(StatusCode::NOT_FOUND);
        }
        let method = req.method().clone();
        let response = match method {
            Method::GET => {
                let query = req.uri().query().map(str::to_owned);
                self.proxy.handle_get(query.as_deref()).await
            }
            Method::POST => {
                let debug = DebugMode::from_header(
                    req.headers()
                        .get(DEBUG_HEADER)
                        .and_then(|v| v.to_str().ok()),
                );
                match Limited::new(req.into_body(), self.body_limit).collect().await {
                    Ok(body) => self.proxy.handle_post(body.to_bytes(), debug).await,
                    Err(e) if e.is::<LengthLimitError>() => {
                        debug!("rejecting POST body over {} bytes", self.body_limit);
                        return status_response(StatusCode::PAYLOAD_TOO_LARGE);
                    }
                    Err(e) => ProxyResponse::failure(&ProxyError::ReadBody(e)),
                }
            }
            _ => {
                let mut response = status_response(StatusCode::METHOD_NOT_ALLOWED);
                response
                    .headers_mut()
                    .insert(ALLOW, HeaderValue::from_static("GET, POST"));
                return response;
            }
        };
        into_http(response)
    }
}

fn into_http(response: ProxyResponse) -> Response<Full<Bytes>> {
    let mut out = Response::new(Full::new(response.body));
    *out.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    match HeaderValue::from_str(&response.content_type) {
        Ok(value) => {
            out.headers_mut().insert(CONTENT_TYPE, value);
        }
        Err(e) => warn!("dropping unrepresentable content-type: {e}"),
    }
    out
}

fn status_response(status: StatusCode) -> Response<Full<Bytes>> {
    let reason = status.canonical_reason().unwrap_or("error");
    into_http(ProxyResponse::json(status.as_u16(), &json!({ "error": reason })))
}
