//! Channel setup.

use std::path::PathBuf;
use std::time::Duration;

use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::info;

use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server URI, e.g. `http://127.0.0.1:8080`.
    pub addr: String,
    pub connect_timeout: Duration,
    /// Deadline applied to every RPC made through the typed clients.
    pub request_timeout: Duration,
    /// CA certificate for verifying the server; enables TLS when set.
    pub tls_ca: Option<PathBuf>,
}

impl ConnectionConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            addr: "http://127.0.0.1:8080".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            tls_ca: None,
        }
    }
}

/// Open a channel to the server described by `config`.
pub async fn connect(config: &ConnectionConfig) -> Result<Channel, ClientError> {
    let mut endpoint = Endpoint::from_shared(config.addr.clone())
        .map_err(|e| ClientError::InvalidAddress(e.to_string()))?
        .connect_timeout(config.connect_timeout)
        .http2_keep_alive_interval(Duration::from_secs(30))
        .keep_alive_timeout(Duration::from_secs(10));

    if let Some(ca_path) = &config.tls_ca {
        let pem = std::fs::read_to_string(ca_path).map_err(|e| ClientError::TlsFile {
            path: ca_path.display().to_string(),
            reason: e.to_string(),
        })?;
        endpoint = endpoint
            .tls_config(ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem)))
            .map_err(|e| ClientError::ConnectFailed(e.to_string()))?;
    }

    let channel = endpoint
        .connect()
        .await
        .map_err(|e| ClientError::ConnectFailed(e.to_string()))?;
    info!(addr = %config.addr, tls = config.tls_ca.is_some(), "Connected");
    Ok(channel)
}
