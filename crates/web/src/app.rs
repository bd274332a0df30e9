//! Application builder: route/middleware registration and the listener.
//!
//! An [`App`] is configured with builder-style chaining, then either turned
//! into a bare [`DispatchEngine`] for embedding, or served directly with
//! [`App::listen`]. Registration necessarily finishes before serving
//! starts: the engine the listener shares across connections is immutable.

use std::fs::File;
use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::Method;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::dispatch::DispatchEngine;
use crate::handler::{Handler, IntoHandlerChain};
use crate::router::Router;

use lark_http::connection::HttpConnection;

#[derive(Default)]
pub struct App {
    middleware: Vec<Box<dyn Handler>>,
    router: Router,
}

macro_rules! method_route {
    ($method:ident, $upper_case_method:ident) => {
        pub fn $method(self, pattern: &str, handlers: impl IntoHandlerChain) -> Self {
            self.route(Method::$upper_case_method, pattern, handlers)
        }
    };
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a global middleware, run for every request before routing.
    pub fn middleware(mut self, handler: impl Handler + 'static) -> Self {
        self.middleware.push(Box::new(handler));
        self
    }

    /// Registers a route for an arbitrary method.
    pub fn route(mut self, method: Method, pattern: &str, handlers: impl IntoHandlerChain) -> Self {
        self.router.register(method, pattern, handlers.into_chain().into_vec());
        self
    }

    method_route!(get, GET);
    method_route!(post, POST);
    method_route!(put, PUT);
    method_route!(patch, PATCH);
    method_route!(delete, DELETE);

    /// Finishes registration and hands back the dispatch engine.
    pub fn into_engine(self) -> DispatchEngine {
        DispatchEngine::new(self.middleware, self.router)
    }

    /// Binds `port` and serves connections until the task is dropped.
    ///
    /// `on_ready` is invoked once, after a successful bind, with the local
    /// address actually bound (useful with port 0).
    pub async fn listen<F>(self, port: u16, on_ready: F) -> Result<(), ServeError>
    where
        F: FnOnce(SocketAddr),
    {
        self.listen_with(port, ListenOptions::default(), on_ready).await
    }

    /// Like [`listen`](App::listen), with transport options.
    pub async fn listen_with<F>(self, port: u16, options: ListenOptions, on_ready: F) -> Result<(), ServeError>
    where
        F: FnOnce(SocketAddr),
    {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        let _ = tracing::subscriber::set_global_default(subscriber);

        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|source| ServeError::Bind { port, source })?;
        let local_addr = listener.local_addr().map_err(|source| ServeError::Bind { port, source })?;

        let tls_acceptor = match &options.tls {
            Some(tls) => Some(tls_acceptor(tls)?),
            None => None,
        };

        info!(%local_addr, tls = tls_acceptor.is_some(), "start listening");
        on_ready(local_addr);

        let engine = Arc::new(self.into_engine());
        loop {
            let (tcp_stream, _remote_addr) = match listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let engine = engine.clone();
            match &tls_acceptor {
                Some(acceptor) => {
                    let acceptor = acceptor.clone();
                    tokio::spawn(async move {
                        match acceptor.accept(tcp_stream).await {
                            Ok(tls_stream) => {
                                let (reader, writer) = tokio::io::split(tls_stream);
                                serve_connection(reader, writer, engine).await;
                            }
                            Err(e) => warn!(cause = %e, "tls handshake failed"),
                        }
                    });
                }
                None => {
                    tokio::spawn(async move {
                        let (reader, writer) = tcp_stream.into_split();
                        serve_connection(reader, writer, engine).await;
                    });
                }
            }
        }
    }
}

async fn serve_connection<R, W>(reader: R, writer: W, engine: Arc<DispatchEngine>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match HttpConnection::new(reader, writer).process(engine).await {
        Ok(()) => {
            info!("finished process, connection shutdown");
        }
        Err(e) => {
            error!(cause = %e, "connection error, connection shutdown");
        }
    }
}

/// Transport options for [`App::listen_with`].
#[derive(Debug, Default)]
pub struct ListenOptions {
    tls: Option<TlsOptions>,
}

#[derive(Debug)]
struct TlsOptions {
    cert: PathBuf,
    key: PathBuf,
}

impl ListenOptions {
    /// Requests TLS with PEM-encoded certificate chain and private key files.
    pub fn tls(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.tls = Some(TlsOptions { cert: cert.into(), key: key.into() });
        self
    }
}

fn tls_acceptor(options: &TlsOptions) -> Result<TlsAcceptor, ServeError> {
    let certs = rustls_pemfile::certs(&mut pem_reader(&options.cert)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ServeError::TlsMaterial { path: options.cert.clone(), source })?;

    let key = rustls_pemfile::private_key(&mut pem_reader(&options.key)?)
        .map_err(|source| ServeError::TlsMaterial { path: options.key.clone(), source })?
        .ok_or_else(|| ServeError::MissingPrivateKey { path: options.key.clone() })?;

    let config = ServerConfig::builder().with_no_client_auth().with_single_cert(certs, key)?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn pem_reader(path: &Path) -> Result<BufReader<File>, ServeError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ServeError::TlsMaterial { path: path.to_path_buf(), source })
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("can't bind port {port}: {source}")]
    Bind { port: u16, source: io::Error },

    #[error("can't read tls material from {path:?}: {source}")]
    TlsMaterial { path: PathBuf, source: io::Error },

    #[error("no private key found in {path:?}")]
    MissingPrivateKey { path: PathBuf },

    #[error("invalid tls configuration: {source}")]
    TlsConfig {
        #[from]
        source: tokio_rustls::rustls::Error,
    },
}
