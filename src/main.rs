use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod image_search;
mod preview;
mod scrape;
#[cfg(test)]
mod tests;
mod web;

use config::Config;
use preview::{request::encode_target_url, Envelope, Previewer, TargetUrl};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("linkpeek=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Encode { url } => {
            println!("{}", encode_target_url(&url));
            Ok(())
        }

        cli::Command::Daemon { listen } => {
            let mut config = Config::load(args.config.as_deref())?;
            if let Some(listen) = listen {
                config.listen = listen;
            }
            let addr = config.listen_addr()?;

            // built outside the runtime: the blocking http clients must not
            // be created or dropped inside async code
            let previewer = Arc::new(Previewer::from_config(&config)?);
            web::start_daemon(previewer.clone(), addr)?;
            drop(previewer);

            Ok(())
        }

        cli::Command::Preview { url, no_headless } => {
            let mut config = Config::load(args.config.as_deref())?;
            if no_headless {
                config.scrape.headless = false;
            }

            let previewer = Previewer::from_config(&config)?;
            let envelope = match TargetUrl::parse(&url).and_then(|t| previewer.preview(&t)) {
                Ok(preview) => Envelope::from(preview),
                Err(err) => Envelope::from(&err),
            };

            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(())
        }
    }
}
