use sheetview::{Config, app};

/// Main entry point for the web application
///
/// Reads the configuration from the environment and serves the dashboard
/// until the process is stopped.
///
/// # Environment
/// * `API_KEY` - AI service credential; summaries are disabled without it
/// * `BIND_ADDR` - Listen address, `127.0.0.1:3000` by default
/// * `DATA_DIR` - Record directory, `database` by default
/// * `RUST_LOG` - Log filter, `info` by default
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    app::run(config).await
}
