use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use hkrag_cli::{init_tracing, load_settings, print_startup_error};

#[derive(Parser, Debug)]
#[command(name = "hkrag-server", about = "HTTP API answering Hong Kong healthcare questions")]
struct ServerCli {
    /// Directory holding config.toml (defaults to the working directory).
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Interface to bind (overrides server.host).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides server.port).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");
    let cli = ServerCli::parse();
    let result = async {
        let mut settings = load_settings(cli.config_dir.as_deref())?;
        if let Some(host) = cli.host { settings.server.host = host; }
        if let Some(port) = cli.port { settings.server.port = port; }
        hkrag_server::run_server(&settings).await
    }
    .await;
    if let Err(e) = &result {
        print_startup_error(e);
    }
    result
}
