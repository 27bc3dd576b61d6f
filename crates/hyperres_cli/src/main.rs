/* 📖 # Why is the CLI minimal and hardcoded?

The CLI only exists to serve the demo bookstore, so it takes no arguments:
it reads `hyperres.toml` from the current directory if there is one, and
falls back to the defaults otherwise. Argument parsing can come later when
there is more than one thing to run.

Exit codes:
- 0: never, the server runs until the process is killed
- 1: Error (invalid config, invalid resource declarations, port in use)
*/

mod demo;

use std::path::Path;
use std::process;
use std::sync::Arc;

use tracing::info;

use hyperres_base::HyperresResult;
use hyperres_base::http::HttpServerConfig;
use hyperres_base::server::start_http_server;
use hyperres_base::tracing::init_tracing;
use hyperres_engine::{HostHeaderServerUrl, HypermediaService, ServerConfig, load_config};

const CONFIG_FILE: &str = "hyperres.toml";

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        process::exit(1);
    }
}

fn run() -> HyperresResult<()> {
    let config_path = Path::new(CONFIG_FILE);
    let config = if config_path.exists() {
        load_config(config_path)?
    } else {
        info!("no {} found, using defaults", CONFIG_FILE);
        ServerConfig::default()
    };

    let registry = demo::registry(Arc::new(demo::Bookstore::with_sample_data()))?;
    let host = format!("{}:{}", config.host, config.port);
    let service = HypermediaService::builder(registry)
        .with_server_url_provider(Arc::new(HostHeaderServerUrl::new("http", host)))
        .with_config(&config)
        .build()?;

    let server_config = HttpServerConfig::new(config.host.clone()).with_port(config.port);
    let handle = start_http_server(Arc::new(service), &server_config)?;
    println!(
        "Serving the demo bookstore on http://{}/",
        handle.address(&config.host)
    );

    loop {
        std::thread::park();
    }
}
