//! HTTP serving loop in front of a [`FilterHttpServerTransport`]

use crate::error::Result;
use crate::request::Request;
use crate::response::{Rejection, Response};
use crate::transport::FilterHttpServerTransport;
use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the default `tracing` subscriber unless one is already set.
///
/// `RUST_LOG` wins over the built-in `info,httpfilter=debug` directive.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,httpfilter=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Default request body limit: 1MB
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Accepts HTTP/1 connections and hands every request to the transport
pub struct Server {
    transport: Arc<FilterHttpServerTransport>,
    body_limit: Option<usize>,
}

impl Server {
    /// Create a server for the given transport, with the default body limit
    pub fn new(transport: Arc<FilterHttpServerTransport>) -> Self {
        init_tracing();
        Self {
            transport,
            body_limit: Some(DEFAULT_BODY_LIMIT),
        }
    }

    /// Answer bodies larger than `limit` bytes with `413 Payload Too Large`
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = Some(limit);
        self
    }

    /// Buffer request bodies of any size
    pub fn no_body_limit(mut self) -> Self {
        self.body_limit = None;
        self
    }

    /// Bind to `addr` and serve forever
    pub async fn run(self, addr: &str) -> Result<()> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Serve until `shutdown` resolves. Connections already accepted are left
    /// to finish on their own tasks.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            addr = %listener.local_addr()?,
            node = %self.transport.node_name(),
            "httpfilter server listening"
        );
        tokio::pin!(shutdown);

        loop {
            let (stream, remote_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = &mut shutdown => {
                    info!("httpfilter server shutting down");
                    return Ok(());
                }
            };

            let io = TokioIo::new(stream);
            let transport = Arc::clone(&self.transport);
            let body_limit = self.body_limit;

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<Incoming>| {
                    let transport = Arc::clone(&transport);
                    async move {
                        Ok::<_, Infallible>(handle_request(&transport, req, body_limit).await)
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!(remote = %remote_addr, "connection error: {}", err);
                }
            });
        }
    }
}

/// Buffer the body and dispatch through the chain. Unreadable or oversized
/// bodies still go through the filters, marked with a [`Rejection`].
async fn handle_request(
    transport: &FilterHttpServerTransport,
    req: hyper::Request<Incoming>,
    body_limit: Option<usize>,
) -> Response {
    let (parts, body) = req.into_parts();
    let req = match read_body(body, body_limit).await {
        Ok(body) => Request::new(parts, body),
        Err(rejection) => {
            debug!(
                status = %rejection.status(),
                reason = rejection.reason(),
                "request rejected before dispatch"
            );
            let mut req = Request::new(parts, Bytes::new());
            req.extensions_mut().insert(rejection);
            req
        }
    };

    transport.dispatch(req).await
}

async fn read_body<B>(body: B, limit: Option<usize>) -> std::result::Result<Bytes, Rejection>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let Some(limit) = limit else {
        return match body.collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) => Err(unreadable(e.into())),
        };
    };

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(Rejection::payload_too_large(limit)),
        Err(e) => Err(unreadable(e)),
    }
}

fn unreadable(error: Box<dyn std::error::Error + Send + Sync>) -> Rejection {
    Rejection::new(
        StatusCode::BAD_REQUEST,
        format!("failed to read request body: {error}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{handler_fn, FilterRegistry};
    use crate::response::IntoResponse;
    use crate::settings::ChainSettings;
    use http_body_util::Full;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn serves_requests_through_the_transport() {
        let handler = handler_fn(|req: Request| async move {
            format!("{} {} {}", req.node_name().unwrap_or("-"), req.method(), req.path()).into_response()
        });
        let transport = FilterHttpServerTransport::new(
            &ChainSettings::new("server1"),
            &FilterRegistry::new(),
            handler,
        )
        .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(Server::new(Arc::new(transport)).serve_with_shutdown(
            listener,
            async move {
                let _ = stop_rx.await;
            },
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /_cluster/health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"), "got: {raw}");
        assert!(raw.ends_with("server1 GET /_cluster/health"), "got: {raw}");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bodies_within_the_limit_are_buffered() {
        let body = Full::new(Bytes::from_static(b"{\"query\":{}}"));
        let read = read_body(body, Some(DEFAULT_BODY_LIMIT)).await.unwrap();
        assert_eq!(read, Bytes::from_static(b"{\"query\":{}}"));
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected_with_413() {
        let body = Full::new(Bytes::from(vec![b'x'; 2048]));
        let rejection = read_body(body, Some(1024)).await.unwrap_err();
        assert_eq!(rejection.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(rejection.reason(), "request body exceeds limit of 1024 bytes");

        let body = Full::new(Bytes::from(vec![b'x'; 2048]));
        assert_eq!(read_body(body, None).await.unwrap().len(), 2048);
    }
}
