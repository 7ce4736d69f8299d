use std::fs::File;
use std::io::{self, BufReader, ErrorKind};
use std::path::PathBuf;
use std::sync::Arc;

use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

/// Builds the TLS acceptor from PEM files. Unreadable or unparseable
/// certificates are a fatal startup condition, reported to the caller.
pub fn make_acceptor(cert_path: &PathBuf, key_path: &PathBuf) -> io::Result<TlsAcceptor> {
    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("invalid certificate/key pair: {}", e)))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &PathBuf) -> io::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("error opening certificate {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer> = rustls_pemfile::certs(&mut reader).collect::<Result<_, _>>()?;
    if certs.is_empty() {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("no certificates found in {}", path.display()),
        ));
    }
    Ok(certs)
}

fn load_key(path: &PathBuf) -> io::Result<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("error opening private key {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);

    match rustls_pemfile::private_key(&mut reader)? {
        Some(key) => Ok(key),
        None => Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("no private key found in {}", path.display()),
        )),
    }
}
