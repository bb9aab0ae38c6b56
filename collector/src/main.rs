use std::{env, io, process, sync::Arc};

use log::info;
use tokio::net::TcpListener;

use collector::{CollectorConfig, Registry, SinkManager, server};

const USAGE: &str = "usage: collector [-c <config.json>]";

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config = parse_args().unwrap_or_else(|msg| {
        eprintln!("{msg}");
        process::exit(2);
    });

    let config = config.with_env_overrides().map_err(io::Error::from)?;
    let addr = config.bind_addr();

    let registry = Arc::new(Registry::new(
        config.idle_timeout(),
        SinkManager::new(config.output_dir.clone()),
    ));

    let listener = TcpListener::bind(&addr).await?;
    info!("listening at {addr}");

    server::run(listener, registry).await
}

/// Parses `-c/--config <path>`; without the flag the defaults apply.
fn parse_args() -> Result<CollectorConfig, String> {
    let mut args = env::args().skip(1);
    let mut config = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| format!("missing config path\n{USAGE}"))?;
                config = Some(CollectorConfig::load(&path).map_err(|e| e.to_string())?);
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                process::exit(0);
            }
            other => return Err(format!("unknown argument '{other}'\n{USAGE}")),
        }
    }

    Ok(config.unwrap_or_default())
}
