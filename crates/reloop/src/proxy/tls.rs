//! TLS material for the front end and the loopback backend connection.

use std::path::PathBuf;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, ServerConfig, SignatureScheme};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::error::{EngineError, Result};

/// Certificate chain and private key, both PEM encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(ring::default_provider())
}

fn tls_error(context: impl std::fmt::Display, err: impl std::fmt::Display) -> EngineError {
    EngineError::Tls(format!("{context}: {err}"))
}

/// Build the acceptor used by the public listener.
pub fn acceptor(files: &TlsFiles) -> Result<TlsAcceptor> {
    let cert_path = files.cert.display();
    let certs = CertificateDer::pem_file_iter(&files.cert)
        .map_err(|e| tls_error(&cert_path, e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| tls_error(&cert_path, e))?;
    if certs.is_empty() {
        return Err(EngineError::Tls(format!("no certificates found in {cert_path}")));
    }

    let key = PrivateKeyDer::from_pem_file(&files.key)
        .map_err(|e| tls_error(files.key.display(), e))?;

    let mut config = ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error("protocol versions", e))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| tls_error("certificate", e))?;
    // Tunnels need HTTP/1.1 upgrade semantics
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Connector for the child's own TLS listener on loopback.
///
/// The child serves the same development certificate as the front end,
/// which is usually self-signed, so the chain is not verified. Handshake
/// signatures still are.
pub fn backend_connector() -> Result<TlsConnector> {
    let provider = provider();
    let mut config = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error("protocol versions", e))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(LoopbackVerifier(provider)))
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsConnector::from(Arc::new(config)))
}

#[derive(Debug)]
struct LoopbackVerifier(Arc<CryptoProvider>);

impl ServerCertVerifier for LoopbackVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_cert_is_reported() {
        let temp = TempDir::new().unwrap();
        let files = TlsFiles {
            cert: temp.path().join("missing.pem"),
            key: temp.path().join("missing-key.pem"),
        };
        let err = acceptor(&files).err().unwrap();
        assert!(matches!(err, EngineError::Tls(_)));
        assert!(err.to_string().contains("missing.pem"));
    }

    #[test]
    fn test_empty_cert_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let cert = temp.path().join("cert.pem");
        std::fs::write(&cert, "not a certificate\n").unwrap();
        let files = TlsFiles {
            cert,
            key: temp.path().join("key.pem"),
        };
        let err = acceptor(&files).err().unwrap();
        assert!(err.to_string().contains("no certificates"));
    }

    #[test]
    fn test_backend_connector_builds() {
        assert!(backend_connector().is_ok());
    }
}
