use std::path::PathBuf;
use tfplug::ServerConfig;
use tracing_subscriber::EnvFilter;
use vapi::VapiProvider;

const ENV_TLS_CERT: &str = "VAPI_PROVIDER_TLS_CERT";
const ENV_TLS_KEY: &str = "VAPI_PROVIDER_TLS_KEY";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the plugin handshake
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = ServerConfig::new();
    match tls_paths() {
        Some((cert_path, key_path)) => {
            tracing::info!(cert = %cert_path.display(), "serving with TLS");
            config = config.with_tls(cert_path, key_path);
        }
        None => tracing::info!("no TLS certificate configured; serving plaintext"),
    }

    tfplug::serve(VapiProvider::new(), config).await?;

    Ok(())
}

fn tls_paths() -> Option<(PathBuf, PathBuf)> {
    let cert_path = PathBuf::from(std::env::var_os(ENV_TLS_CERT)?);
    let key_path = PathBuf::from(std::env::var_os(ENV_TLS_KEY)?);
    (cert_path.is_file() && key_path.is_file()).then_some((cert_path, key_path))
}
