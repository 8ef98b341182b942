use crate::core::DnsqError;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::path::PathBuf;
use tokio::fs;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

/// TLS settings used for DNS-over-HTTPS connections.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Path to a custom certificate authority. If not supplied, default root certificates
    /// from the `webpki_roots` crate are used.
    pub ca_path: Option<PathBuf>,

    /// Path to a PEM format client certificate for mTLS. If not supplied, no client authentication
    /// is used when connecting to the server.
    pub cert_path: Option<PathBuf>,

    /// Path to a PEM format client key for mTLS. If not supplied, no client authentication is used
    /// when connecting to the server.
    pub key_path: Option<PathBuf>,
}

pub(crate) async fn tls_client_config(config: &TlsConfig) -> Result<ClientConfig, DnsqError> {
    let client_cert = if let Some(p) = &config.cert_path {
        Some(load_cert(p).await?)
    } else {
        None
    };

    let client_key = if let Some(p) = &config.key_path {
        Some(load_key(p).await?)
    } else {
        None
    };

    let root = if let Some(p) = &config.ca_path {
        custom_root_store(load_cert(p).await?)?
    } else {
        default_root_store()
    };

    let builder = ClientConfig::builder().with_root_certificates(root);
    let mut client_config = match (client_cert, client_key) {
        (Some(cert), Some(key)) => {
            tracing::debug!(message = "using key and cert for client authentication", key = ?config.key_path, cert = ?config.cert_path);
            builder
                .with_client_auth_cert(cert, key)
                .map_err(|e| DnsqError::configuration_cause("unable to use client cert or key", e))?
        }
        _ => {
            tracing::debug!(message = "not using any client authentication");
            builder.with_no_client_auth()
        }
    };

    // RFC 8484 recommends HTTP/2 as the minimum version
    client_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(client_config)
}

async fn load_cert(path: &PathBuf) -> Result<Vec<CertificateDer<'static>>, DnsqError> {
    let contents = fs::read(path)
        .await
        .map_err(|e| DnsqError::configuration_cause(format!("unable to load cert {:?}", path), e))?;
    let iter = CertificateDer::pem_slice_iter(&contents);

    let mut out = Vec::new();
    for res in iter {
        out.push(res.map_err(|e| DnsqError::configuration_cause(format!("unable to parse cert {:?}", path), e))?);
    }

    Ok(out)
}

async fn load_key(path: &PathBuf) -> Result<PrivateKeyDer<'static>, DnsqError> {
    let contents = fs::read(path)
        .await
        .map_err(|e| DnsqError::configuration_cause(format!("unable to load key {:?}", path), e))?;

    PrivateKeyDer::from_pem_slice(&contents)
        .map_err(|e| DnsqError::configuration_cause(format!("unable to parse key {:?}", path), e))
}

fn custom_root_store(ca: Vec<CertificateDer<'static>>) -> Result<RootCertStore, DnsqError> {
    let mut store = RootCertStore::empty();
    for cert in ca {
        store
            .add(cert)
            .map_err(|e| DnsqError::configuration_cause("unable to parse CA cert", e))?;
    }

    Ok(store)
}

fn default_root_store() -> RootCertStore {
    let mut store = RootCertStore::empty();
    store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().map(|c| c.to_owned()));
    store
}

#[cfg(test)]
mod test {
    use super::{tls_client_config, TlsConfig};
    use crate::core::ErrorKind;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_tls_client_config_default_roots() {
        let cfg = tls_client_config(&TlsConfig::default()).await.unwrap();
        assert_eq!(vec![b"h2".to_vec(), b"http/1.1".to_vec()], cfg.alpn_protocols);
    }

    #[tokio::test]
    async fn test_tls_client_config_missing_ca() {
        let cfg = TlsConfig {
            ca_path: Some(PathBuf::from("/does/not/exist/ca.pem")),
            ..Default::default()
        };

        let err = tls_client_config(&cfg).await.unwrap_err();
        assert_eq!(ErrorKind::Configuration, err.kind());
    }
}
