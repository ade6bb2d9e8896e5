//! TLS configuration for the PC Book server.

use std::path::{Path, PathBuf};

use tonic::transport::{Certificate, Identity, ServerTlsConfig};
use tracing::info;

use crate::config::ServerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Plaintext HTTP/2.
    Disabled,
    /// PEM certificate and key, optionally requiring client certificates.
    Custom {
        cert_path: PathBuf,
        key_path: PathBuf,
        /// CA bundle used to verify client certificates (mutual TLS).
        client_ca_path: Option<PathBuf>,
    },
}

impl TlsMode {
    /// Pick the mode implied by the cert/key/CA paths in `config`.
    pub fn from_config(config: &ServerConfig) -> Self {
        match (&config.tls_cert, &config.tls_key) {
            (Some(cert), Some(key)) => TlsMode::Custom {
                cert_path: cert.clone(),
                key_path: key.clone(),
                client_ca_path: config.tls_client_ca.clone(),
            },
            _ => TlsMode::Disabled,
        }
    }

    /// Build a tonic `ServerTlsConfig`, or `None` when TLS is disabled.
    pub fn to_server_tls_config(&self) -> Result<Option<ServerTlsConfig>, TlsConfigError> {
        let TlsMode::Custom {
            cert_path,
            key_path,
            client_ca_path,
        } = self
        else {
            return Ok(None);
        };

        let identity = Identity::from_pem(read_pem(cert_path)?, read_pem(key_path)?);
        let mut tls_config = ServerTlsConfig::new().identity(identity);

        if let Some(ca_path) = client_ca_path {
            tls_config = tls_config.client_ca_root(Certificate::from_pem(read_pem(ca_path)?));
            info!(
                cert = %cert_path.display(),
                client_ca = %ca_path.display(),
                "Mutual TLS enabled"
            );
        } else {
            info!(cert = %cert_path.display(), key = %key_path.display(), "TLS enabled");
        }
        Ok(Some(tls_config))
    }
}

fn read_pem(path: &Path) -> Result<String, TlsConfigError> {
    std::fs::read_to_string(path).map_err(|e| TlsConfigError::FileRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum TlsConfigError {
    #[error("Failed to read {path}: {reason}")]
    FileRead { path: PathBuf, reason: String },
}
