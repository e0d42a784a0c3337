//! HTTPS serving with rustls

use anyhow::{bail, Context, Result};
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::{debug, warn};

/// PEM files of the server certificate chain and its private key
#[derive(Debug, Clone)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

pub fn server_config(files: &TlsFiles) -> Result<Arc<rustls::ServerConfig>> {
    let certs = load_certs(&files.cert)?;
    let key = load_private_key(&files.key)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("Cannot select TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("TLS certificate and key do not match")?;
    Ok(Arc::new(config))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .with_context(|| format!("Cannot read TLS certificate {}", path.display()))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid PEM in {}", path.display()))?;
    if certs.is_empty() {
        bail!("No certificates found in {}", path.display());
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file =
        File::open(path).with_context(|| format!("Cannot read TLS key {}", path.display()))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .with_context(|| format!("Invalid PEM in {}", path.display()))?
        .with_context(|| format!("No private key found in {}", path.display()))
}

/// Accept connections forever, handing each TLS stream to `app`.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    config: Arc<rustls::ServerConfig>,
) -> Result<()> {
    let acceptor = TlsAcceptor::from(config);
    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(connection) => connection,
            Err(e) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };
        let acceptor = acceptor.clone();
        let app = app.clone();

        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    debug!(%remote, "TLS handshake failed: {}", e);
                    return;
                }
            };
            let service = hyper::service::service_fn(
                move |request: hyper::Request<hyper::body::Incoming>| app.clone().oneshot(request),
            );
            if let Err(e) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(%remote, "connection closed: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_certificate() {
        let files = TlsFiles {
            cert: PathBuf::from("/nonexistent/server.crt"),
            key: PathBuf::from("/nonexistent/server.key"),
        };
        let err = server_config(&files).unwrap_err();
        assert!(err.to_string().contains("Cannot read TLS certificate"), "{}", err);
    }

    #[test]
    fn test_files_without_pem_blocks() {
        let mut cert = tempfile::NamedTempFile::new().unwrap();
        writeln!(cert, "not a certificate").unwrap();
        let err = server_config(&TlsFiles {
            cert: cert.path().to_path_buf(),
            key: cert.path().to_path_buf(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("No certificates found"), "{}", err);

        let err = load_private_key(cert.path()).unwrap_err();
        assert!(err.to_string().contains("No private key found"), "{}", err);
    }
}
