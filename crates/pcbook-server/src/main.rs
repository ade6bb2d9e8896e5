//! PC Book server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tonic::transport::Server;
use tracing::{info, warn};

use pcbook_proto::v1::auth_service_server::AuthServiceServer;
use pcbook_proto::v1::laptop_service_server::LaptopServiceServer;
use pcbook_server::config::ServerConfig;
use pcbook_server::server::{AuthServiceImpl, LaptopServiceImpl, PcbookServer};
use pcbook_server::tls::TlsMode;
use pcbook_server::tracing_init::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "pcbook-server")]
#[command(version, about = "PC Book server - laptop catalog over gRPC")]
struct Args {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    addr: Option<SocketAddr>,

    #[arg(long, env = "PCBOOK_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Access token lifetime in seconds.
    #[arg(long)]
    token_ttl: Option<u64>,

    #[arg(long)]
    image_dir: Option<PathBuf>,

    #[arg(long)]
    max_image_bytes: Option<usize>,

    #[arg(long, requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    #[arg(long, requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Require client certificates signed by this CA.
    #[arg(long, requires = "tls_cert")]
    tls_client_ca: Option<PathBuf>,

    /// Output logs as JSON, one object per line.
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn resolve_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(addr) = self.addr {
            config.addr = addr;
        }
        if let Some(secret) = &self.jwt_secret {
            config.jwt_secret.clone_from(secret);
        }
        if let Some(ttl) = self.token_ttl {
            config.token_ttl_secs = ttl;
        }
        if let Some(dir) = &self.image_dir {
            config.image_dir.clone_from(dir);
        }
        if let Some(max) = self.max_image_bytes {
            config.max_image_bytes = max;
        }
        if self.tls_cert.is_some() {
            config.tls_cert.clone_from(&self.tls_cert);
            config.tls_key.clone_from(&self.tls_key);
        }
        if self.tls_client_ca.is_some() {
            config.tls_client_ca.clone_from(&self.tls_client_ca);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("pcbook_server=info", args.log_json)?;

    let config = args.resolve_config()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.addr,
        "Starting pcbook-server"
    );
    if config.uses_dev_secret() {
        warn!("Using the development JWT secret; set PCBOOK_JWT_SECRET in production");
    }

    let pcbook = PcbookServer::from_config(&config)?;

    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<LaptopServiceServer<LaptopServiceImpl>>()
        .await;
    health_reporter
        .set_serving::<AuthServiceServer<AuthServiceImpl>>()
        .await;

    let mut builder = Server::builder()
        .http2_keepalive_interval(Some(Duration::from_secs(30)))
        .http2_keepalive_timeout(Some(Duration::from_secs(10)));
    if let Some(tls) = TlsMode::from_config(&config).to_server_tls_config()? {
        builder = builder.tls_config(tls)?;
        info!(addr = %config.addr, "Server starting with TLS");
    } else {
        info!(addr = %config.addr, "Server starting (plaintext)");
    }

    let router = pcbook
        .into_router(&mut builder)
        .add_service(health_service);

    tokio::select! {
        result = router.serve(config.addr) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Server stopped");
    Ok(())
}
