//! Transport establishment.

use super::{EngineError, TlsInfo};
use crate::tls;
use amqpsend_core::ConnectionParameters;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// A transport ready for the AMQP protocol header.
pub struct Connected<S> {
    pub stream: S,
    pub tls: Option<TlsInfo>,
}

/// Opens the byte stream the engine speaks AMQP over.
pub trait Connector {
    type Stream: AsyncRead + AsyncWrite + Unpin;

    fn connect(
        &self,
        params: &ConnectionParameters,
    ) -> impl Future<Output = Result<Connected<Self::Stream>, EngineError>>;
}

/// TCP followed by a rustls handshake configured from the parameters' TLS
/// identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTlsConnector;

impl Connector for TcpTlsConnector {
    type Stream = tokio_rustls::client::TlsStream<TcpStream>;

    async fn connect(
        &self,
        params: &ConnectionParameters,
    ) -> Result<Connected<Self::Stream>, EngineError> {
        // Configuration problems surface before any socket is opened.
        let config = tls::client_config(&params.tls_identity)?;
        let host = params.host().ok_or(EngineError::NoHost)?;
        let server_name = tls::server_name(host)?;
        let port = params.port();

        tracing::debug!("Connecting to {}:{}", host, port);
        let tcp = TcpStream::connect((host.trim_start_matches('[').trim_end_matches(']'), port))
            .await?;
        tcp.set_nodelay(true)?;

        let connector = tokio_rustls::TlsConnector::from(Arc::new(config));
        let stream = connector.connect(server_name, tcp).await?;

        let (_, session) = stream.get_ref();
        let tls = TlsInfo {
            protocol_version: session
                .protocol_version()
                .map_or_else(|| "unknown".to_string(), |v| format!("{v:?}")),
            cipher_suite: session
                .negotiated_cipher_suite()
                .map_or_else(|| "unknown".to_string(), |s| format!("{:?}", s.suite())),
        };
        Ok(Connected {
            stream,
            tls: Some(tls),
        })
    }
}
