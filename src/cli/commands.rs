//! CLI command implementations

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::auth::PepperedHasher;
use crate::bootstrap::build_gateway;
use crate::config::GatewayConfig;
use crate::http_server::HttpServer;

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Run a parsed command
pub fn run_command(command: Command, config_path: &Path) -> CliResult<()> {
    match command {
        Command::Serve => serve(config_path),
        Command::CheckConfig => check_config(config_path, &mut io::stdout()),
        Command::HashPassword { password } => {
            hash_password(config_path, &password, &mut io::stdout())
        }
    }
}

/// Boot the gateway and serve until interrupted
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = GatewayConfig::load(config_path)?;
    info!(path = %config_path.display(), "Configuration loaded");

    let handler = Arc::new(build_gateway(&config)?);
    let server = HttpServer::new(config.server.clone(), handler);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Validate configuration and every database it names
pub fn check_config(config_path: &Path, out: &mut impl Write) -> CliResult<()> {
    let config = GatewayConfig::load(config_path)?;
    build_gateway(&config)?;

    writeln!(
        out,
        "Configuration OK: {} database(s), main database {}",
        config.databases.len(),
        config.main_database
    )?;
    Ok(())
}

/// Print the stored form of `password`
pub fn hash_password(config_path: &Path, password: &str, out: &mut impl Write) -> CliResult<()> {
    let config = GatewayConfig::load(config_path)?;
    let hasher = PepperedHasher::new(config.password_pepper.as_bytes());
    let hash = hasher
        .hash(password)
        .map_err(|e| CliError::boot_failed(e.to_string()))?;

    writeln!(out, "{}", hash)?;
    Ok(())
}
