use std::env;
use toko::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Optional single argument: path to a JSON config file. A broken config
    // file is reported and the defaults are used instead.
    let config = match env::args().nth(1) {
        Some(path) => match Config::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("failed to load config {path}: {e}; using defaults");
                Config::default()
            }
        },
        None => Config::default(),
    };

    toko::app::run(config).await?;

    Ok(())
}
