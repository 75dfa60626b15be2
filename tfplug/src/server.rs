//! Server module for running Terraform providers
//!
//! Binds a loopback listener, prints the go-plugin handshake line on stdout
//! and serves the provider over gRPC, with TLS when a certificate is
//! configured.

use crate::error::{Result, TfplugError};
use crate::grpc::ProviderService;
use crate::proto::ProviderServer;
use crate::provider::ProviderV2;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::info;

pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

const PROTOCOL_VERSION: u32 = 6;

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PEM certificate and key; plaintext when unset
    pub tls: Option<(PathBuf, PathBuf)>,
    /// Maximum gRPC message size in bytes
    pub max_message_size: usize,
    /// Refuse to start unless launched by Terraform
    pub require_magic_cookie: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tls: None,
            max_message_size: 256 << 20,
            require_magic_cookie: true,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tls(mut self, cert_path: PathBuf, key_path: PathBuf) -> Self {
        self.tls = Some((cert_path, key_path));
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn without_magic_cookie(mut self) -> Self {
        self.require_magic_cookie = false;
        self
    }
}

/// The stdout line go-plugin reads to find the server
pub fn handshake_line(addr: std::net::SocketAddr) -> String {
    format!("1|{}|tcp|{}|grpc", PROTOCOL_VERSION, addr)
}

fn check_magic_cookie(value: Option<String>) -> Result<()> {
    match value.as_deref() {
        Some(MAGIC_COOKIE_VALUE) => Ok(()),
        _ => Err(TfplugError::Custom(
            "This binary is a plugin. These are not meant to be executed directly. \
             Please execute the program that consumes these plugins, which will \
             load any plugins automatically"
                .to_string(),
        )),
    }
}

async fn load_identity(cert_path: &Path, key_path: &Path) -> Result<Identity> {
    let cert = tokio::fs::read(cert_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
    let key = tokio::fs::read(key_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;
    Ok(Identity::from_pem(cert, key))
}

/// Main entry point for running a provider
pub async fn serve<P: ProviderV2 + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    if config.require_magic_cookie {
        check_magic_cookie(std::env::var(MAGIC_COOKIE_KEY).ok())?;
    }

    let service = ProviderServer::new(ProviderService::new(provider))
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let mut builder = Server::builder();
    if let Some((cert_path, key_path)) = &config.tls {
        // a second install fails harmlessly when a provider is already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let identity = load_identity(cert_path, key_path).await?;
        builder = builder.tls_config(ServerTlsConfig::new().identity(identity))?;
    }

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    println!("{}", handshake_line(addr));
    info!(%addr, tls = config.tls.is_some(), "provider server started");

    builder
        .add_service(service)
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;

    Ok(())
}
