//! TLS certificate loading for the listener.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::{ServerConfig, crypto::ring};

use super::ServerError;

/// Builds a [`TlsAcceptor`] from a PEM file holding the certificate chain
/// followed by the private key.
///
/// # Errors
///
/// - [`ServerError::Certificate`] when the file cannot be read, holds no
///   certificate, or holds no private key.
/// - [`ServerError::Tls`] when rustls rejects the certificate/key pair.
pub fn load_acceptor(path: &Path) -> Result<TlsAcceptor, ServerError> {
    let certificate_error = |reason: String| ServerError::Certificate {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| certificate_error(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let chain = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| certificate_error(e.to_string()))?;
    if chain.is_empty() {
        return Err(certificate_error("no certificate found".to_owned()));
    }

    // `certs` consumed the whole file; read again for the key.
    let file = File::open(path).map_err(|e| certificate_error(e.to_string()))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| certificate_error(e.to_string()))?
        .ok_or_else(|| certificate_error("no private key found".to_owned()))?;

    let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(chain, key)?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_is_a_certificate_error() {
        let err = load_acceptor(Path::new("/nonexistent/webwire/server.pem")).err().expect("expected an error");
        match err {
            ServerError::Certificate { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/webwire/server.pem"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn file_without_pem_blocks_has_no_certificate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();
        let err = load_acceptor(file.path()).err().expect("expected an error");
        assert!(err.to_string().contains("no certificate found"));
    }

    #[test]
    fn certificate_without_key_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // Any base64 payload parses as a PEM block; rustls only inspects it
        // once the pair is assembled.
        writeln!(
            file,
            "-----BEGIN CERTIFICATE-----\nAAECAwQFBgcICQ==\n-----END CERTIFICATE-----"
        )
        .unwrap();
        let err = load_acceptor(file.path()).err().expect("expected an error");
        assert!(err.to_string().contains("no private key found"));
    }
}
