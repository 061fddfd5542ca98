//! QUIC client transport implementation using Quinn

use crate::config::ClusterTlsConfig;
use crate::error::{ClusterError, Result};
use quinn::{ClientConfig, Endpoint};
use rustls::pki_types::CertificateDer;
use std::fs::File;
use std::io::{self, BufReader};
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::debug;

/// Create a QUIC client endpoint
pub fn make_client_endpoint(tls_config: &ClusterTlsConfig) -> Result<Endpoint> {
    // Bind to any available port for client
    let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));

    let client_config = build_client_config(tls_config)?;

    let mut endpoint = Endpoint::client(bind_addr)
        .map_err(|e| ClusterError::Transport(format!("Failed to create client endpoint: {}", e)))?;

    endpoint.set_default_client_config(client_config);

    debug!("Created cluster client endpoint");
    Ok(endpoint)
}

/// Build rustls ClientConfig for QUIC
fn build_client_config(tls_config: &ClusterTlsConfig) -> Result<ClientConfig> {
    let crypto = if tls_config.skip_verify {
        tracing::warn!("Cluster TLS verification disabled - INSECURE");

        rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
            .with_no_client_auth()
    } else {
        let mut roots = rustls::RootCertStore::empty();

        if let Some(ref ca_path) = tls_config.ca_cert_path {
            let ca_file = File::open(ca_path).map_err(|e| {
                ClusterError::Tls(format!("Failed to open CA cert file {:?}: {}", ca_path, e))
            })?;
            let mut ca_reader = BufReader::new(ca_file);
            let ca_certs = rustls_pemfile::certs(&mut ca_reader)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| ClusterError::Tls(format!("Failed to parse CA certs: {}", e)))?;

            for cert in ca_certs {
                roots
                    .add(cert)
                    .map_err(|e| ClusterError::Tls(format!("Failed to add CA cert: {}", e)))?;
            }
        } else {
            let native_certs = rustls_native_certs::load_native_certs();
            for cert in native_certs.certs {
                let _ = roots.add(cert);
            }
        }

        if roots.is_empty() {
            return Err(ClusterError::Tls(
                "No trusted root certificates available".to_string(),
            ));
        }

        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth()
    };

    let client_config = ClientConfig::new(Arc::new(
        quinn::crypto::rustls::QuicClientConfig::try_from(crypto)
            .map_err(|e| ClusterError::Tls(format!("Failed to create QUIC client config: {}", e)))?,
    ));

    Ok(client_config)
}

/// Wrapper around QUIC bidirectional streams for tokio I/O
pub struct QuicBiStream {
    pub send: quinn::SendStream,
    pub recv: quinn::RecvStream,
}

impl tokio::io::AsyncRead for QuicBiStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.recv).poll_read(cx, buf)
    }
}

impl tokio::io::AsyncWrite for QuicBiStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.send)
            .poll_write(cx, buf)
            .map_err(io::Error::other)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.send).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.send).poll_shutdown(cx)
    }
}

/// Certificate verifier that skips all verification (INSECURE)
#[derive(Debug)]
struct SkipServerVerification;

impl rustls::client::danger::ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
